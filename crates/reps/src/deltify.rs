use checksums::Md5;
use store::{RepKey, StringKey, Trail};
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::rep::{read_rep, store_rep, DeltaChunk, RepKind, Representation};
use crate::stream::RepReadStream;

/// Tuning for deltification.
#[derive(Clone, Copy, Debug)]
pub struct DeltifyOptions {
    /// Bytes of target text covered by one window, and so by one chunk of
    /// the resulting chain.
    pub window_len: usize,
}

impl Default for DeltifyOptions {
    fn default() -> Self {
        Self {
            window_len: 100 * 1024,
        }
    }
}

/// Replaces `target`'s representation in place with a delta against
/// `source`, using the default window length.
pub fn rep_deltify(trail: &mut Trail<'_>, target: RepKey, source: RepKey) -> Result<()> {
    rep_deltify_with(trail, target, source, DeltifyOptions::default())
}

/// Replaces `target`'s representation in place with a delta against
/// `source`.
///
/// The reconstructed content and the record checksum are preserved. When
/// the target was a fulltext and the serialised diff would not be strictly
/// smaller than it, the deltification quietly does nothing; a target that
/// is already a delta is re-deltified unconditionally.
pub fn rep_deltify_with(
    trail: &mut Trail<'_>,
    target: RepKey,
    source: RepKey,
    options: DeltifyOptions,
) -> Result<()> {
    if target == source {
        return Err(Error::Corrupt(format!(
            "representation {target} cannot be deltified against itself"
        )));
    }
    if options.window_len == 0 {
        return Err(Error::General(
            "deltify window length must be non-zero".into(),
        ));
    }

    let mut target_stream = RepReadStream::open(trail, Some(target))?;
    let mut source_stream = RepReadStream::open(trail, Some(source))?;

    let mut writer = WindowWriter::default();
    let mut target_chunk = vec![0u8; options.window_len];
    let mut source_chunk = vec![0u8; options.window_len];
    let mut offset = 0u64;
    let mut hasher = Some(Md5::new());

    loop {
        let target_len = read_full(&mut target_stream, trail, &mut target_chunk)?;
        if target_len == 0 {
            break;
        }
        let source_len = read_full(&mut source_stream, trail, &mut source_chunk)?;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&target_chunk[..target_len]);
        }
        let window = svndiff::delta_window(
            &source_chunk[..source_len],
            &target_chunk[..target_len],
            offset,
        );
        writer.append(trail, &window, offset)?;
        offset += target_len as u64;
    }

    // Reaching end-of-stream above also verified the target's stored
    // checksum against the bytes the generator consumed.
    let Some(digest) = hasher.take().map(Md5::finalize) else {
        writer.discard(trail)?;
        return Err(Error::ChecksumAbsent);
    };

    let old = read_rep(trail, target)?;

    if writer.is_empty() {
        // An empty target produces no windows and stays as it is.
        writer.discard(trail)?;
        return Ok(());
    }

    if let RepKind::Fulltext { string_key } = &old.kind {
        let fulltext_len = trail.string_size(*string_key)?;
        if writer.total_len() >= fulltext_len {
            debug!(
                rep = %target,
                diff = writer.total_len(),
                fulltext = fulltext_len,
                "deltified form is no smaller; keeping the fulltext"
            );
            writer.discard(trail)?;
            return Ok(());
        }
    }

    let windows = writer.windows.len();
    let chunks = writer.into_chunks(source, Checksum::from(digest));
    let new_rep = Representation {
        txn_id: old.txn_id,
        checksum: old.checksum,
        kind: RepKind::Delta { chunks },
    };
    store_rep(trail, target, &new_rep)?;
    for string_key in old.string_keys() {
        trail.string_delete(string_key)?;
    }
    debug!(rep = %target, source = %source, windows, "deltified representation");
    Ok(())
}

/// Fills `buf` from the stream, looping until it is full or the stream
/// ends.
fn read_full(stream: &mut RepReadStream, trail: &Trail<'_>, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let got = stream.read(trail, &mut buf[filled..])?;
        if got == 0 {
            break;
        }
        filled += got;
    }
    Ok(filled)
}

/// Persists serialised windows, one backing string per window.
///
/// The stream header is written once, stripped off, and only its version
/// byte kept: chunk strings store post-header diff bytes, and readers
/// re-synthesise the header from the recorded version.
#[derive(Default)]
struct WindowWriter {
    version: Option<u8>,
    windows: Vec<WrittenWindow>,
    total_len: u64,
}

struct WrittenWindow {
    string_key: StringKey,
    tview_offset: u64,
    tview_len: u64,
}

impl WindowWriter {
    fn append(
        &mut self,
        trail: &mut Trail<'_>,
        window: &svndiff::Window,
        tview_offset: u64,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        let strip = if self.version.is_none() {
            svndiff::write_header(&mut bytes, svndiff::FORMAT_VERSION);
            self.version = Some(bytes[svndiff::HEADER_LEN - 1]);
            svndiff::HEADER_LEN
        } else {
            0
        };
        svndiff::write_window(&mut bytes, window);

        let payload = &bytes[strip..];
        let string_key = trail.string_append(None, payload)?;
        self.total_len += payload.len() as u64;
        self.windows.push(WrittenWindow {
            string_key,
            tview_offset,
            tview_len: window.tview_len,
        });
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Deletes every string written so far; used when the deltification
    /// is abandoned.
    fn discard(self, trail: &mut Trail<'_>) -> Result<()> {
        for window in self.windows {
            trail.string_delete(window.string_key)?;
        }
        Ok(())
    }

    fn into_chunks(self, source: RepKey, digest: Checksum) -> Vec<DeltaChunk> {
        let version = self.version.unwrap_or(svndiff::FORMAT_VERSION);
        self.windows
            .into_iter()
            .map(|window| DeltaChunk {
                offset: window.tview_offset,
                size: window.tview_len,
                version,
                string_key: window.string_key,
                rep_key: source,
                checksum: digest,
            })
            .collect()
    }
}

use checksums::Md5;
use store::{RepKey, StringKey, Trail};
use svndiff::Window;

use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::fold::WindowFold;
use crate::rep::{read_rep, DeltaChunk, RepKind, Representation};

/// Copies up to `buf.len()` bytes of reconstructed content starting at
/// `offset`, returning the number copied; 0 means end of content.
///
/// The record is re-fetched for every chunk produced, so a concurrent
/// deltification that swaps the representation's shape under the same key
/// is picked up mid-read; reconstruction is unaffected because shape
/// changes preserve content.
pub fn rep_read_range(
    trail: &Trail<'_>,
    key: RepKey,
    offset: u64,
    buf: &mut [u8],
) -> Result<usize> {
    let mut written = 0usize;
    while written < buf.len() {
        let rep = read_rep(trail, key)?;
        let absolute = offset + written as u64;
        let produced = match &rep.kind {
            RepKind::Fulltext { string_key } => {
                trail.string_read(*string_key, absolute, &mut buf[written..])?
            }
            RepKind::Delta { chunks } => {
                read_chunk_at(trail, key, chunks, absolute, &mut buf[written..])?
            }
        };
        if produced == 0 {
            break;
        }
        written += produced;
    }
    Ok(written)
}

/// Reconstructed content length, without reading the content itself.
pub fn rep_contents_size(trail: &Trail<'_>, key: RepKey) -> Result<u64> {
    let rep = read_rep(trail, key)?;
    rep_size(trail, &rep)
}

pub(crate) fn rep_size(trail: &Trail<'_>, rep: &Representation) -> Result<u64> {
    match &rep.kind {
        RepKind::Fulltext { string_key } => Ok(trail.string_size(*string_key)?),
        RepKind::Delta { chunks } => Ok(chunks
            .last()
            .map_or(0, |chunk| chunk.offset + chunk.size)),
    }
}

/// Reads the whole content into one buffer and verifies its checksum.
pub fn rep_contents(trail: &Trail<'_>, key: RepKey) -> Result<Vec<u8>> {
    let rep = read_rep(trail, key)?;
    let size = rep_size(trail, &rep)?;
    let Ok(size) = usize::try_from(size) else {
        return Err(Error::General(format!(
            "representation {key} is too large to read as one buffer"
        )));
    };
    let mut contents = vec![0u8; size];
    let got = rep_read_range(trail, key, 0, &mut contents)?;
    contents.truncate(got);

    let digest = Md5::digest(&contents);
    if !rep.checksum.accepts(digest) {
        return Err(Error::Corrupt(format!(
            "checksum mismatch on representation {key}: record says {}, contents hash to {}",
            rep.checksum,
            Checksum::from(digest)
        )));
    }
    Ok(contents)
}

/// First chunk whose span contains `offset`; the chunks are ordered and
/// contiguous, so a binary search suffices.
fn chunk_index(chunks: &[DeltaChunk], offset: u64) -> Option<usize> {
    let index = chunks.partition_point(|chunk| chunk.offset + chunk.size <= offset);
    (index < chunks.len()).then_some(index)
}

/// Produces (at most) one chunk's worth of fulltext at `absolute` into `out`.
fn read_chunk_at(
    trail: &Trail<'_>,
    key: RepKey,
    chunks: &[DeltaChunk],
    absolute: u64,
    out: &mut [u8],
) -> Result<usize> {
    let Some(cur) = chunk_index(chunks, absolute) else {
        return Ok(0);
    };
    let chunk = &chunks[cur];
    let skip = absolute - chunk.offset;

    if chunk.version != chunks[0].version {
        return Err(version_mismatch(key));
    }

    // Walk the chain, collecting the cur'th chunk of every delta link. A
    // link whose chain is shorter than cur+1 predates this span of the
    // content and contributes no source; the walk stops there.
    let mut links: Vec<DeltaChunk> = vec![chunk.clone()];
    let mut fulltext: Option<StringKey> = None;
    let mut next = chunk.rep_key;
    loop {
        let rep = read_rep(trail, next)?;
        match rep.kind {
            RepKind::Fulltext { string_key } => {
                fulltext = Some(string_key);
                break;
            }
            RepKind::Delta { chunks } => {
                let Some(link) = chunks.get(cur) else {
                    break;
                };
                if link.version != chunks[0].version {
                    return Err(version_mismatch(next));
                }
                links.push(link.clone());
                next = link.rep_key;
            }
        }
    }

    // Fold the windows, outermost first, stopping as soon as the result
    // can no longer change.
    let mut fold = WindowFold::new();
    for link in &links {
        if fold.is_done() {
            break;
        }
        let window = read_chunk_window(trail, link)?;
        fold.feed(window, link.offset)?;
    }
    fold.finish();
    let Some(window) = fold.combined() else {
        return Ok(0);
    };

    let source = read_source_slice(trail, fulltext, window)?;

    if skip == 0 {
        Ok(svndiff::apply(window, &source, out)?)
    } else {
        // An unaligned start materialises the skipped prefix into a
        // scratch buffer sized skip + needed, then copies the tail out.
        let skip = skip as usize;
        let want = out.len().min((chunk.size - skip as u64) as usize);
        let mut scratch = vec![0u8; skip + want];
        let produced = svndiff::apply(window, &source, &mut scratch)?;
        let available = produced.saturating_sub(skip);
        out[..available].copy_from_slice(&scratch[skip..skip + available]);
        Ok(available)
    }
}

/// Reads the composed window's source view out of the terminating
/// fulltext, or returns an empty buffer when no source is referenced.
fn read_source_slice(
    trail: &Trail<'_>,
    fulltext: Option<StringKey>,
    window: &Window,
) -> Result<Vec<u8>> {
    let Some(string_key) = fulltext else {
        return Ok(Vec::new());
    };
    if window.sview_len == 0 || window.src_ops() == 0 {
        return Ok(Vec::new());
    }
    let total = trail.string_size(string_key)?;
    let available = total.saturating_sub(window.sview_offset).min(window.sview_len);
    let mut source = vec![0u8; available as usize];
    let got = trail.string_read(string_key, window.sview_offset, &mut source)?;
    source.truncate(got);
    Ok(source)
}

/// Loads one chunk's stored diff bytes, re-synthesising the stripped
/// header in front of them, and parses exactly one window.
fn read_chunk_window(trail: &Trail<'_>, link: &DeltaChunk) -> Result<Window> {
    let size = trail.string_size(link.string_key)? as usize;
    let mut bytes = Vec::with_capacity(svndiff::HEADER_LEN + size);
    bytes.extend_from_slice(b"SVN");
    bytes.push(link.version);
    bytes.resize(svndiff::HEADER_LEN + size, 0);
    let got = trail.string_read(link.string_key, 0, &mut bytes[svndiff::HEADER_LEN..])?;
    bytes.truncate(svndiff::HEADER_LEN + got);

    let (_, rest) = svndiff::read_header(&bytes)?;
    let Some((window, rest)) = svndiff::read_window(rest)? else {
        return Err(Error::Corrupt(format!(
            "delta chunk string {} holds no window",
            link.string_key
        )));
    };
    if !rest.is_empty() {
        return Err(Error::Corrupt(format!(
            "delta chunk string {} holds bytes after its window",
            link.string_key
        )));
    }
    Ok(window)
}

fn version_mismatch(key: RepKey) -> Error {
    Error::Corrupt(format!(
        "representation {key}: delta chunks disagree on the diff version"
    ))
}

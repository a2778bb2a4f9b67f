use checksums::Md5;
use store::{RepKey, StringKey, Trail};
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::rep::{read_rep, store_rep, RepKind, Representation};
use crate::stream::RepReadStream;

const COPY_BUF_LEN: usize = 64 * 1024;

/// Materialises a delta representation back into a fulltext, in place.
///
/// A representation that already is a fulltext is left untouched. The
/// reconstructed bytes are verified against the record checksum before the
/// record is swapped; the old chunk strings are deleted afterwards.
pub fn rep_undeltify(trail: &mut Trail<'_>, key: RepKey) -> Result<()> {
    let rep = read_rep(trail, key)?;
    let RepKind::Delta { chunks } = &rep.kind else {
        return Ok(());
    };
    let old_strings: Vec<StringKey> = chunks.iter().map(|chunk| chunk.string_key).collect();

    let mut stream = RepReadStream::open(trail, Some(key))?;
    let mut buf = vec![0u8; COPY_BUF_LEN];
    let mut new_key: Option<StringKey> = None;
    let mut hasher = Md5::new();
    loop {
        let got = stream.read(trail, &mut buf)?;
        if got == 0 {
            break;
        }
        hasher.update(&buf[..got]);
        new_key = Some(trail.string_append(new_key, &buf[..got])?);
    }
    let new_key = match new_key {
        Some(key) => key,
        None => trail.string_append(None, b"")?,
    };

    let digest = hasher.finalize();
    if !rep.checksum.accepts(digest) {
        trail.string_delete(new_key)?;
        return Err(Error::Corrupt(format!(
            "checksum mismatch while undeltifying representation {key}: record says {}, contents hash to {}",
            rep.checksum,
            Checksum::from(digest)
        )));
    }

    let new_rep = Representation {
        txn_id: rep.txn_id,
        checksum: rep.checksum,
        kind: RepKind::Fulltext {
            string_key: new_key,
        },
    };
    store_rep(trail, key, &new_rep)?;
    for string_key in old_strings {
        trail.string_delete(string_key)?;
    }
    debug!(rep = %key, "undeltified representation");
    Ok(())
}

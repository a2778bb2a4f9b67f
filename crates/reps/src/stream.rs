use checksums::Md5;
use store::{RepKey, StringKey, Trail, TxnId};
use tracing::{debug, trace};

use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::read::{rep_contents_size, rep_read_range};
use crate::rep::{read_rep, write_rep, RepKind};

/// A chunked read stream over a representation's reconstructed content.
///
/// The content size is snapshotted at open; when the cumulative offset
/// first reaches it, the running MD5 is finalised and checked against the
/// record's checksum (re-read at that moment, so a seal that landed after
/// open is honoured). Later reads return 0 without re-verifying.
pub struct RepReadStream {
    rep_key: Option<RepKey>,
    offset: u64,
    size: u64,
    hasher: Option<Md5>,
}

impl RepReadStream {
    /// Opens a stream over `rep_key`; `None` reads as empty content.
    pub fn open(trail: &mut Trail<'_>, rep_key: Option<RepKey>) -> Result<Self> {
        let size = match rep_key {
            Some(key) => {
                let size = rep_contents_size(trail, key)?;
                trail.note_read_open(key)?;
                size
            }
            None => 0,
        };
        Ok(Self {
            rep_key,
            offset: 0,
            size,
            hasher: Some(Md5::new()),
        })
    }

    /// Reads the next run of bytes; 0 means end of stream.
    pub fn read(&mut self, trail: &Trail<'_>, buf: &mut [u8]) -> Result<usize> {
        let Some(key) = self.rep_key else {
            if self.offset > 0 {
                return Err(Error::RepChanged);
            }
            return Ok(0);
        };

        let got = rep_read_range(trail, key, self.offset, buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..got]);
        }
        self.offset += got as u64;

        if self.offset >= self.size {
            if let Some(hasher) = self.hasher.take() {
                let digest = hasher.finalize();
                let rep = read_rep(trail, key)?;
                if !rep.checksum.accepts(digest) {
                    return Err(Error::Corrupt(format!(
                        "checksum mismatch on representation {key}: record says {}, stream hashed to {}",
                        rep.checksum,
                        Checksum::from(digest)
                    )));
                }
                trace!(rep = %key, "read stream checksum verified");
            }
        }
        Ok(got)
    }
}

/// A write stream appending content to a mutable representation.
///
/// Opening the stream clears the backing string, so every write stream
/// rebuilds the content from scratch; closing seals the accumulated MD5
/// into the record. The trail refuses a writer on a representation that
/// already has an open reader (or writer) in the same trail.
pub struct RepWriteStream {
    rep_key: RepKey,
    txn_id: TxnId,
    string_key: StringKey,
    hasher: Md5,
    digest: Option<[u8; 16]>,
    closed: bool,
}

impl RepWriteStream {
    /// Opens a writer on `rep_key`, which must be mutable under `txn_id`.
    pub fn open(trail: &mut Trail<'_>, rep_key: RepKey, txn_id: TxnId) -> Result<Self> {
        let rep = read_rep(trail, rep_key)?;
        if !rep.is_mutable(txn_id) {
            return Err(Error::RepNotMutable(rep_key, txn_id));
        }
        let RepKind::Fulltext { string_key } = rep.kind else {
            return Err(Error::Corrupt(format!(
                "mutable representation {rep_key} is a delta"
            )));
        };
        trail.lock_for_write(rep_key)?;
        trail.string_clear(string_key)?;
        Ok(Self {
            rep_key,
            txn_id,
            string_key,
            hasher: Md5::new(),
            digest: None,
            closed: false,
        })
    }

    /// Appends `buf` to the content; echoes the caller's length back.
    pub fn write(&mut self, trail: &mut Trail<'_>, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::General(format!(
                "write stream for representation {} is closed",
                self.rep_key
            )));
        }
        trail.string_append(Some(self.string_key), buf)?;
        self.hasher.update(buf);
        Ok(buf.len())
    }

    /// Seals the accumulated MD5 into the record. Idempotent.
    pub fn close(&mut self, trail: &mut Trail<'_>) -> Result<()> {
        let digest = match self.digest {
            Some(digest) => digest,
            None => {
                let digest = self.hasher.clone().finalize();
                self.digest = Some(digest);
                digest
            }
        };
        if self.closed {
            return Ok(());
        }

        let mut rep = read_rep(trail, self.rep_key)?;
        rep.checksum = Checksum::from(digest);
        write_rep(trail, self.rep_key, &rep, self.txn_id)?;
        trail.unlock_write(self.rep_key);
        self.closed = true;
        debug!(rep = %self.rep_key, checksum = %rep.checksum, "sealed representation");
        Ok(())
    }
}

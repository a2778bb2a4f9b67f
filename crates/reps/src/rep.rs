use store::{RepKey, StringKey, Trail, TxnId};
use svndiff::varint;

use crate::checksum::Checksum;
use crate::error::{Error, Result};

const FULLTEXT_TAG: u8 = 1;
const DELTA_TAG: u8 = 2;
const TXN_PRESENT: u8 = 0b0000_0001;

/// One link of a delta representation's chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeltaChunk {
    /// Fulltext offset at which this chunk's target view begins.
    pub offset: u64,
    /// Number of fulltext bytes the chunk reconstructs.
    pub size: u64,
    /// Wire format version of the stored diff.
    pub version: u8,
    /// Key of the string holding the diff bytes (without the magic header).
    pub string_key: StringKey,
    /// The source representation this chunk deltas against.
    pub rep_key: RepKey,
    /// Digest recorded when the chunk was produced; informational.
    pub checksum: Checksum,
}

/// How a representation's content is stored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RepKind {
    /// The content is one backing string.
    Fulltext {
        /// Key of the backing string.
        string_key: StringKey,
    },
    /// The content is a chain of diffs against another representation.
    Delta {
        /// The chunks, ordered and contiguous by `offset`.
        chunks: Vec<DeltaChunk>,
    },
}

/// A decoded representation record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Representation {
    /// Owning transaction while the representation is mutable.
    pub txn_id: Option<TxnId>,
    /// MD5 of the reconstructed content, or the unset sentinel.
    pub checksum: Checksum,
    /// Fulltext or delta storage.
    pub kind: RepKind,
}

impl Representation {
    /// Whether this representation may be mutated under `txn`.
    #[must_use]
    pub fn is_mutable(&self, txn: TxnId) -> bool {
        self.txn_id == Some(txn)
    }

    /// Keys of every backing string the representation owns.
    #[must_use]
    pub fn string_keys(&self) -> Vec<StringKey> {
        match &self.kind {
            RepKind::Fulltext { string_key } => vec![*string_key],
            RepKind::Delta { chunks } => chunks.iter().map(|chunk| chunk.string_key).collect(),
        }
    }

    /// Encodes the record for the `reps` table.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.push(match &self.kind {
            RepKind::Fulltext { .. } => FULLTEXT_TAG,
            RepKind::Delta { .. } => DELTA_TAG,
        });
        match self.txn_id {
            Some(txn) => {
                out.push(TXN_PRESENT);
                varint::encode_to_vec(txn.raw(), &mut out);
            }
            None => out.push(0),
        }
        out.extend_from_slice(self.checksum.as_bytes());
        match &self.kind {
            RepKind::Fulltext { string_key } => {
                varint::encode_to_vec(string_key.raw(), &mut out);
            }
            RepKind::Delta { chunks } => {
                varint::encode_to_vec(chunks.len() as u64, &mut out);
                for chunk in chunks {
                    varint::encode_to_vec(chunk.offset, &mut out);
                    varint::encode_to_vec(chunk.size, &mut out);
                    out.push(chunk.version);
                    varint::encode_to_vec(chunk.string_key.raw(), &mut out);
                    varint::encode_to_vec(chunk.rep_key.raw(), &mut out);
                    out.extend_from_slice(chunk.checksum.as_bytes());
                }
            }
        }
        out
    }

    /// Decodes and validates the record stored under `key`.
    pub fn decode(bytes: &[u8], key: RepKey) -> Result<Self> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| corrupt(key, "empty record"))?;
        let (&flags, rest) = rest
            .split_first()
            .ok_or_else(|| corrupt(key, "record ends inside the header"))?;
        let (txn_id, rest) = if flags & TXN_PRESENT == 0 {
            (None, rest)
        } else {
            let (raw, rest) = read_u64(rest, key)?;
            (Some(TxnId::from_raw(raw)), rest)
        };
        let (checksum, rest) = read_checksum(rest, key)?;

        let (kind, rest) = match tag {
            FULLTEXT_TAG => {
                let (raw, rest) = read_u64(rest, key)?;
                (
                    RepKind::Fulltext {
                        string_key: StringKey::from_raw(raw),
                    },
                    rest,
                )
            }
            DELTA_TAG => {
                let (count, mut rest) = read_u64(rest, key)?;
                let mut chunks = Vec::new();
                for _ in 0..count {
                    let (offset, tail) = read_u64(rest, key)?;
                    let (size, tail) = read_u64(tail, key)?;
                    let (&version, tail) = tail
                        .split_first()
                        .ok_or_else(|| corrupt(key, "record ends inside a chunk"))?;
                    let (string_raw, tail) = read_u64(tail, key)?;
                    let (rep_raw, tail) = read_u64(tail, key)?;
                    let (chunk_checksum, tail) = read_checksum(tail, key)?;
                    chunks.push(DeltaChunk {
                        offset,
                        size,
                        version,
                        string_key: StringKey::from_raw(string_raw),
                        rep_key: RepKey::from_raw(rep_raw),
                        checksum: chunk_checksum,
                    });
                    rest = tail;
                }
                (RepKind::Delta { chunks }, rest)
            }
            other => {
                return Err(Error::Corrupt(format!(
                    "representation {key}: unknown kind tag {other}"
                )))
            }
        };
        if !rest.is_empty() {
            return Err(corrupt(key, "trailing bytes after the record"));
        }

        let rep = Self {
            txn_id,
            checksum,
            kind,
        };
        rep.validate(key)?;
        Ok(rep)
    }

    fn validate(&self, key: RepKey) -> Result<()> {
        let RepKind::Delta { chunks } = &self.kind else {
            return Ok(());
        };
        if chunks.is_empty() {
            return Err(corrupt(key, "delta chain has no chunks"));
        }
        let source = chunks[0].rep_key;
        let version = chunks[0].version;
        let mut expected_offset = 0u64;
        for chunk in chunks {
            if chunk.size == 0 {
                return Err(corrupt(key, "delta chunk reconstructs zero bytes"));
            }
            if chunk.offset != expected_offset {
                return Err(corrupt(key, "delta chunks are not contiguous"));
            }
            if chunk.rep_key == key {
                return Err(corrupt(key, "delta chunk references its own representation"));
            }
            if chunk.rep_key != source {
                return Err(corrupt(
                    key,
                    "delta chunks disagree on their source representation",
                ));
            }
            if chunk.version != version {
                return Err(corrupt(key, "delta chunks disagree on the diff version"));
            }
            expected_offset = chunk
                .offset
                .checked_add(chunk.size)
                .ok_or_else(|| corrupt(key, "delta chunk offsets overflow"))?;
        }
        Ok(())
    }
}

fn corrupt(key: RepKey, what: &str) -> Error {
    Error::Corrupt(format!("representation {key}: {what}"))
}

fn read_u64(input: &[u8], key: RepKey) -> Result<(u64, &[u8])> {
    varint::decode(input).map_err(|_| corrupt(key, "record ends inside an integer"))
}

fn read_checksum(input: &[u8], key: RepKey) -> Result<(Checksum, &[u8])> {
    if input.len() < 16 {
        return Err(corrupt(key, "record ends inside a checksum"));
    }
    let (digest, rest) = input.split_at(16);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(digest);
    Ok((Checksum::from_bytes(bytes), rest))
}

/// Reads and decodes the record stored under `key`.
pub fn read_rep(trail: &Trail<'_>, key: RepKey) -> Result<Representation> {
    let bytes = trail.rep_get(key)?;
    Representation::decode(&bytes, key)
}

/// Overwrites the record under `key`, requiring the stored record to be
/// mutable under `txn`.
pub fn write_rep(
    trail: &mut Trail<'_>,
    key: RepKey,
    rep: &Representation,
    txn: TxnId,
) -> Result<()> {
    let current = read_rep(trail, key)?;
    if !current.is_mutable(txn) {
        return Err(Error::RepNotMutable(key, txn));
    }
    trail.rep_put(key, rep.encode())?;
    Ok(())
}

/// Writes `rep` under a freshly allocated key.
pub fn write_new_rep(trail: &mut Trail<'_>, rep: &Representation) -> Result<RepKey> {
    Ok(trail.rep_put_new(rep.encode())?)
}

/// Replaces the record under `key` without a mutability check; used when
/// deltification swaps an immutable representation's shape in place.
pub(crate) fn store_rep(trail: &mut Trail<'_>, key: RepKey, rep: &Representation) -> Result<()> {
    trail.rep_put(key, rep.encode())?;
    Ok(())
}

/// Returns `base` when it is mutable under `txn`; otherwise creates a
/// fresh, empty, mutable fulltext representation owned by `txn`.
pub fn get_mutable_rep(
    trail: &mut Trail<'_>,
    base: Option<RepKey>,
    txn: TxnId,
) -> Result<RepKey> {
    if let Some(key) = base {
        let rep = read_rep(trail, key)?;
        if rep.is_mutable(txn) {
            if matches!(rep.kind, RepKind::Delta { .. }) {
                return Err(corrupt(key, "mutable representation is a delta"));
            }
            return Ok(key);
        }
    }
    let string_key = trail.string_append(None, b"")?;
    let rep = Representation {
        txn_id: Some(txn),
        checksum: Checksum::UNSET,
        kind: RepKind::Fulltext { string_key },
    };
    write_new_rep(trail, &rep)
}

/// Deletes the record and its owned strings iff it is mutable under `txn`.
///
/// This is transaction-abort cleanup: anything the transaction created is
/// reclaimed, anything already immutable is left alone.
pub fn delete_rep_if_mutable(trail: &mut Trail<'_>, key: RepKey, txn: TxnId) -> Result<()> {
    let rep = read_rep(trail, key)?;
    if !rep.is_mutable(txn) {
        return Err(Error::RepNotMutable(key, txn));
    }
    for string_key in rep.string_keys() {
        trail.string_delete(string_key)?;
    }
    trail.rep_delete(key)?;
    Ok(())
}

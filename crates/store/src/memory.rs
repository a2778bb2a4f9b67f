use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::StoreError;
use crate::keys::{RepKey, StringKey, TxnId};

#[derive(Debug, Default)]
struct Tables {
    strings: FxHashMap<StringKey, Vec<u8>>,
    reps: FxHashMap<RepKey, Vec<u8>>,
    next_string: u64,
    next_rep: u64,
    next_txn: u64,
}

/// The in-memory backing store: a `strings` table, a `reps` table and the
/// key allocators behind them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts one attempt of a transactional operation.
    ///
    /// The trail holds the store's lock until it is committed or dropped,
    /// so attempts are serialised; a contended backend would return
    /// [`StoreError::Transient`] conflicts instead.
    pub fn begin(&self) -> Trail<'_> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let counters = (tables.next_string, tables.next_rep, tables.next_txn);
        Trail {
            tables,
            undo_strings: FxHashMap::default(),
            undo_reps: FxHashMap::default(),
            counters,
            committed: false,
            open_reads: FxHashSet::default(),
            write_locks: FxHashSet::default(),
        }
    }
}

/// One attempt of a transactional operation against the store.
///
/// Every mutation is journalled; [`commit`](Self::commit) publishes the
/// attempt, dropping the trail without committing rolls the tables back to
/// their state at [`MemoryStore::begin`].
pub struct Trail<'store> {
    tables: MutexGuard<'store, Tables>,
    undo_strings: FxHashMap<StringKey, Option<Vec<u8>>>,
    undo_reps: FxHashMap<RepKey, Option<Vec<u8>>>,
    counters: (u64, u64, u64),
    committed: bool,
    open_reads: FxHashSet<RepKey>,
    write_locks: FxHashSet<RepKey>,
}

impl Trail<'_> {
    fn snapshot_string(&mut self, key: StringKey) {
        if !self.undo_strings.contains_key(&key) {
            let prior = self.tables.strings.get(&key).cloned();
            self.undo_strings.insert(key, prior);
        }
    }

    fn snapshot_rep(&mut self, key: RepKey) {
        if !self.undo_reps.contains_key(&key) {
            let prior = self.tables.reps.get(&key).cloned();
            self.undo_reps.insert(key, prior);
        }
    }

    /// Appends `bytes` to the string under `key`, allocating a fresh string
    /// (even for zero bytes) when `key` is `None`. Returns the key the
    /// bytes now live under.
    pub fn string_append(
        &mut self,
        key: Option<StringKey>,
        bytes: &[u8],
    ) -> Result<StringKey, StoreError> {
        let key = match key {
            Some(key) => {
                if !self.tables.strings.contains_key(&key) {
                    return Err(StoreError::StringNotFound(key));
                }
                key
            }
            None => {
                let key = StringKey::from_raw(self.tables.next_string);
                self.tables.next_string += 1;
                self.snapshot_string(key);
                self.tables.strings.insert(key, Vec::new());
                key
            }
        };
        self.snapshot_string(key);
        if let Some(content) = self.tables.strings.get_mut(&key) {
            content.extend_from_slice(bytes);
        }
        Ok(key)
    }

    /// Copies up to `buf.len()` bytes of the string starting at `offset`.
    /// Returns 0 at or past the end of the string.
    pub fn string_read(
        &self,
        key: StringKey,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<usize, StoreError> {
        let content = self
            .tables
            .strings
            .get(&key)
            .ok_or(StoreError::StringNotFound(key))?;
        if offset >= content.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let take = buf.len().min(content.len() - start);
        buf[..take].copy_from_slice(&content[start..start + take]);
        Ok(take)
    }

    /// Returns the string's length in bytes.
    pub fn string_size(&self, key: StringKey) -> Result<u64, StoreError> {
        self.tables
            .strings
            .get(&key)
            .map(|content| content.len() as u64)
            .ok_or(StoreError::StringNotFound(key))
    }

    /// Truncates the string to zero bytes, keeping the key alive.
    pub fn string_clear(&mut self, key: StringKey) -> Result<(), StoreError> {
        self.snapshot_string(key);
        self.tables
            .strings
            .get_mut(&key)
            .map(Vec::clear)
            .ok_or(StoreError::StringNotFound(key))
    }

    /// Removes the string and its key.
    pub fn string_delete(&mut self, key: StringKey) -> Result<(), StoreError> {
        self.snapshot_string(key);
        self.tables
            .strings
            .remove(&key)
            .map(|_| ())
            .ok_or(StoreError::StringNotFound(key))
    }

    /// Reads the encoded representation record under `key`.
    pub fn rep_get(&self, key: RepKey) -> Result<Vec<u8>, StoreError> {
        self.tables
            .reps
            .get(&key)
            .cloned()
            .ok_or(StoreError::RepNotFound(key))
    }

    /// Writes (or overwrites) the encoded record under `key`.
    pub fn rep_put(&mut self, key: RepKey, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.snapshot_rep(key);
        self.tables.reps.insert(key, bytes);
        Ok(())
    }

    /// Writes an encoded record under a freshly allocated key.
    pub fn rep_put_new(&mut self, bytes: Vec<u8>) -> Result<RepKey, StoreError> {
        let key = RepKey::from_raw(self.tables.next_rep);
        self.tables.next_rep += 1;
        self.snapshot_rep(key);
        self.tables.reps.insert(key, bytes);
        Ok(key)
    }

    /// Removes the record and its key.
    pub fn rep_delete(&mut self, key: RepKey) -> Result<(), StoreError> {
        self.snapshot_rep(key);
        self.tables
            .reps
            .remove(&key)
            .map(|_| ())
            .ok_or(StoreError::RepNotFound(key))
    }

    /// Mints a transaction identifier for the layer above.
    pub fn new_txn_id(&mut self) -> TxnId {
        let id = TxnId::from_raw(self.tables.next_txn);
        self.tables.next_txn += 1;
        id
    }

    /// Records that a read stream opened on `key` in this trail. Refused
    /// while a write stream holds the key.
    pub fn note_read_open(&mut self, key: RepKey) -> Result<(), StoreError> {
        if self.write_locks.contains(&key) {
            return Err(StoreError::WriteLocked(key));
        }
        self.open_reads.insert(key);
        Ok(())
    }

    /// Takes the single write-stream slot for `key` in this trail.
    pub fn lock_for_write(&mut self, key: RepKey) -> Result<(), StoreError> {
        if self.open_reads.contains(&key) {
            return Err(StoreError::ReadLocked(key));
        }
        if !self.write_locks.insert(key) {
            return Err(StoreError::WriteLocked(key));
        }
        Ok(())
    }

    /// Releases the write-stream slot for `key`.
    pub fn unlock_write(&mut self, key: RepKey) {
        self.write_locks.remove(&key);
    }

    /// Publishes every write performed through this trail.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Trail<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (key, prior) in self.undo_strings.drain() {
            match prior {
                Some(bytes) => {
                    self.tables.strings.insert(key, bytes);
                }
                None => {
                    self.tables.strings.remove(&key);
                }
            }
        }
        for (key, prior) in self.undo_reps.drain() {
            match prior {
                Some(bytes) => {
                    self.tables.reps.insert(key, bytes);
                }
                None => {
                    self.tables.reps.remove(&key);
                }
            }
        }
        (
            self.tables.next_string,
            self.tables.next_rep,
            self.tables.next_txn,
        ) = self.counters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appending_without_a_key_allocates_one() {
        let store = MemoryStore::new();
        let mut trail = store.begin();
        let key = trail.string_append(None, b"abc").expect("append succeeds");
        let again = trail
            .string_append(Some(key), b"def")
            .expect("append succeeds");
        assert_eq!(key, again);
        assert_eq!(trail.string_size(key), Ok(6));
    }

    #[test]
    fn zero_byte_append_still_allocates_an_empty_string() {
        let store = MemoryStore::new();
        let mut trail = store.begin();
        let key = trail.string_append(None, b"").expect("append succeeds");
        assert_eq!(trail.string_size(key), Ok(0));
    }

    #[test]
    fn reads_window_into_the_string() {
        let store = MemoryStore::new();
        let mut trail = store.begin();
        let key = trail
            .string_append(None, b"0123456789")
            .expect("append succeeds");

        let mut buf = [0u8; 4];
        assert_eq!(trail.string_read(key, 3, &mut buf), Ok(4));
        assert_eq!(&buf, b"3456");
        assert_eq!(trail.string_read(key, 8, &mut buf), Ok(2));
        assert_eq!(trail.string_read(key, 10, &mut buf), Ok(0));
        assert_eq!(trail.string_read(key, 99, &mut buf), Ok(0));
    }

    #[test]
    fn clear_keeps_the_key_delete_does_not() {
        let store = MemoryStore::new();
        let mut trail = store.begin();
        let key = trail.string_append(None, b"abc").expect("append succeeds");

        trail.string_clear(key).expect("clear succeeds");
        assert_eq!(trail.string_size(key), Ok(0));

        trail.string_delete(key).expect("delete succeeds");
        assert_eq!(
            trail.string_size(key),
            Err(StoreError::StringNotFound(key))
        );
    }

    #[test]
    fn dropping_an_uncommitted_trail_rolls_everything_back() {
        let store = MemoryStore::new();

        let survivor = {
            let mut trail = store.begin();
            let key = trail.string_append(None, b"keep").expect("append succeeds");
            trail.commit();
            key
        };

        {
            let mut trail = store.begin();
            let doomed = trail.string_append(None, b"drop").expect("append succeeds");
            trail
                .string_append(Some(survivor), b" me")
                .expect("append succeeds");
            trail.rep_put_new(b"record".to_vec()).expect("put succeeds");
            assert_ne!(doomed, survivor);
            // No commit: the trail aborts here.
        }

        let trail = store.begin();
        assert_eq!(trail.string_size(survivor), Ok(4));
        assert_eq!(trail.rep_get(RepKey::from_raw(0)).ok(), None);
        drop(trail);

        // Aborted key allocations are reused by the next trail.
        let mut trail = store.begin();
        let reused = trail.string_append(None, b"x").expect("append succeeds");
        assert_eq!(reused.raw(), survivor.raw() + 1);
    }

    #[test]
    fn committed_writes_survive_the_trail() {
        let store = MemoryStore::new();
        let (skey, rkey) = {
            let mut trail = store.begin();
            let skey = trail.string_append(None, b"persisted").expect("append");
            let rkey = trail.rep_put_new(b"record".to_vec()).expect("put");
            trail.commit();
            (skey, rkey)
        };

        let trail = store.begin();
        assert_eq!(trail.string_size(skey), Ok(9));
        assert_eq!(trail.rep_get(rkey), Ok(b"record".to_vec()));
    }

    #[test]
    fn stream_interlock_refuses_interleaving() {
        let store = MemoryStore::new();
        let mut trail = store.begin();
        let read_side = RepKey::from_raw(1);
        let write_side = RepKey::from_raw(2);

        trail.note_read_open(read_side).expect("first reader");
        assert_eq!(
            trail.lock_for_write(read_side),
            Err(StoreError::ReadLocked(read_side))
        );

        trail.lock_for_write(write_side).expect("first writer");
        assert_eq!(
            trail.lock_for_write(write_side),
            Err(StoreError::WriteLocked(write_side))
        );
        assert_eq!(
            trail.note_read_open(write_side),
            Err(StoreError::WriteLocked(write_side))
        );

        trail.unlock_write(write_side);
        trail.lock_for_write(write_side).expect("slot was released");
    }
}

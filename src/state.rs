//! Account-keyed byte storage the registry reads and writes through.
//!
//! A [`Snapshot`] is a view of every account's metadata as of one state root,
//! plus the writes buffered on top of it. Writes only become visible to other
//! readers once the snapshot is committed, which yields the new root.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use revm::primitives::{keccak256, Address, B256, KECCAK_EMPTY};
use tracing::debug;

use crate::error::StateError;

/// Root of a state holding no entries.
pub const EMPTY_ROOT: B256 = KECCAK_EMPTY;

/// Read/write access to per-account metadata within one snapshot.
pub trait Snapshot {
    /// Reads `key` from `account`'s record. `Ok(None)` means nothing is stored.
    fn get_data(&self, account: Address, key: B256) -> Result<Option<Vec<u8>>, StateError>;

    /// Buffers a write. It is not durable until the snapshot is committed.
    fn set_data(&mut self, account: Address, key: B256, value: Vec<u8>) -> Result<(), StateError>;
}

/// Hands out snapshots by state root.
pub trait StateProvider {
    type Snapshot: Snapshot;

    fn snapshot_at(&self, root: B256) -> Result<Self::Snapshot, StateError>;

    /// Root of the most recent commit, the current head state.
    fn latest_root(&self) -> Result<B256, StateError>;
}

type Entries = BTreeMap<(Address, B256), Vec<u8>>;

/// Writes buffered on a snapshot, applied atomically at commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateBatch {
    writes: Entries,
}

impl StateBatch {
    pub fn put(&mut self, account: Address, key: B256, value: Vec<u8>) {
        self.writes.insert((account, key), value);
    }

    pub fn get(&self, account: Address, key: B256) -> Option<&[u8]> {
        self.writes.get(&(account, key)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// In-memory, content-addressed state.
///
/// Every committed state is kept and addressed by its root, so a snapshot can
/// be opened at any root this store has produced.
#[derive(Clone, Debug)]
pub struct MemoryStateDb {
    states: HashMap<B256, Arc<Entries>>,
    head: B256,
}

impl Default for MemoryStateDb {
    fn default() -> Self {
        let mut states = HashMap::new();
        states.insert(EMPTY_ROOT, Arc::new(Entries::new()));
        Self { states, head: EMPTY_ROOT }
    }
}

impl MemoryStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> B256 {
        self.head
    }

    /// Snapshot of the head state.
    pub fn latest(&self) -> MemorySnapshot {
        // The head is always registered in `states`.
        self.open(self.head).unwrap_or_else(|| MemorySnapshot::empty(EMPTY_ROOT))
    }

    /// Applies the snapshot's pending writes on top of its base state and
    /// returns the root of the result, which also becomes the head.
    ///
    /// Roots depend only on content, so committing the same entries twice
    /// yields the same root.
    pub fn commit(&mut self, snapshot: MemorySnapshot) -> Result<B256, StateError> {
        if !self.states.contains_key(&snapshot.root) {
            return Err(StateError::UnknownRoot(snapshot.root));
        }
        let pending = snapshot.batch.len();
        let mut entries = Arc::unwrap_or_clone(snapshot.base);
        entries.extend(snapshot.batch.writes);
        let root = state_root(&entries);
        self.states.entry(root).or_insert_with(|| Arc::new(entries));
        debug!(parent = %snapshot.root, %root, pending, "committed state");
        self.head = root;
        Ok(root)
    }

    fn open(&self, root: B256) -> Option<MemorySnapshot> {
        self.states.get(&root).map(|base| MemorySnapshot {
            root,
            base: Arc::clone(base),
            batch: StateBatch::default(),
        })
    }
}

impl StateProvider for MemoryStateDb {
    type Snapshot = MemorySnapshot;

    fn snapshot_at(&self, root: B256) -> Result<MemorySnapshot, StateError> {
        self.open(root).ok_or(StateError::UnknownRoot(root))
    }

    fn latest_root(&self) -> Result<B256, StateError> {
        Ok(self.head)
    }
}

/// A committed state plus pending writes.
#[derive(Clone, Debug)]
pub struct MemorySnapshot {
    root: B256,
    base: Arc<Entries>,
    batch: StateBatch,
}

impl MemorySnapshot {
    fn empty(root: B256) -> Self {
        Self { root, base: Arc::new(Entries::new()), batch: StateBatch::default() }
    }

    /// Root of the state this snapshot was opened at.
    pub fn root(&self) -> B256 {
        self.root
    }

    pub fn pending(&self) -> &StateBatch {
        &self.batch
    }
}

impl Snapshot for MemorySnapshot {
    fn get_data(&self, account: Address, key: B256) -> Result<Option<Vec<u8>>, StateError> {
        let value = match self.batch.get(account, key) {
            Some(pending) => Some(pending.to_vec()),
            None => self.base.get(&(account, key)).cloned(),
        };
        Ok(value)
    }

    fn set_data(&mut self, account: Address, key: B256, value: Vec<u8>) -> Result<(), StateError> {
        self.batch.put(account, key, value);
        Ok(())
    }
}

/// Keccak-256 over the entries in key order, each as
/// `account ‖ key ‖ len(value) as u64 BE ‖ value`.
fn state_root(entries: &Entries) -> B256 {
    let mut buf = Vec::new();
    for ((account, key), value) in entries {
        buf.extend_from_slice(account.as_slice());
        buf.extend_from_slice(key.as_slice());
        buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
        buf.extend_from_slice(value);
    }
    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(n: u8) -> Address {
        Address::from([n; 20])
    }

    #[test]
    fn empty_state_root() {
        let db = MemoryStateDb::new();
        assert_eq!(db.head(), EMPTY_ROOT);
        assert_eq!(state_root(&Entries::new()), EMPTY_ROOT);
    }

    #[test]
    fn writes_are_pending_until_commit() {
        let mut db = MemoryStateDb::new();
        let mut snap = db.latest();
        snap.set_data(account(1), B256::ZERO, b"v1".to_vec()).unwrap();
        assert_eq!(snap.get_data(account(1), B256::ZERO).unwrap(), Some(b"v1".to_vec()));
        assert_eq!(snap.pending().len(), 1);

        // A fresh snapshot of the same root does not see the write.
        let other = db.snapshot_at(EMPTY_ROOT).unwrap();
        assert_eq!(other.get_data(account(1), B256::ZERO).unwrap(), None);

        let root = db.commit(snap).unwrap();
        assert_ne!(root, EMPTY_ROOT);
        assert_eq!(db.head(), root);
        let after = db.snapshot_at(root).unwrap();
        assert_eq!(after.get_data(account(1), B256::ZERO).unwrap(), Some(b"v1".to_vec()));

        // Old roots stay readable.
        let before = db.snapshot_at(EMPTY_ROOT).unwrap();
        assert_eq!(before.get_data(account(1), B256::ZERO).unwrap(), None);
    }

    #[test]
    fn roots_are_content_addressed() {
        let mut a = MemoryStateDb::new();
        let mut b = MemoryStateDb::new();

        let mut snap = a.latest();
        snap.set_data(account(1), B256::ZERO, vec![1]).unwrap();
        snap.set_data(account(2), B256::ZERO, vec![2]).unwrap();
        let root_a = a.commit(snap).unwrap();

        let mut snap = b.latest();
        snap.set_data(account(2), B256::ZERO, vec![2]).unwrap();
        let mid = b.commit(snap).unwrap();
        let mut snap = b.snapshot_at(mid).unwrap();
        snap.set_data(account(1), B256::ZERO, vec![1]).unwrap();
        let root_b = b.commit(snap).unwrap();

        assert_eq!(root_a, root_b);

        let mut snap = a.snapshot_at(root_a).unwrap();
        snap.set_data(account(1), B256::ZERO, vec![3]).unwrap();
        assert_ne!(a.commit(snap).unwrap(), root_a);
    }

    #[test]
    fn unknown_roots_are_reported() {
        let db = MemoryStateDb::new();
        let root = B256::from([9u8; 32]);
        assert_eq!(db.snapshot_at(root).unwrap_err(), StateError::UnknownRoot(root));

        let mut other = MemoryStateDb::new();
        let mut snap = db.latest();
        snap.set_data(account(1), B256::ZERO, vec![1]).unwrap();
        let foreign_root = other.commit(snap).unwrap();
        let foreign = other.snapshot_at(foreign_root).unwrap();
        let mut db = db;
        assert_eq!(db.commit(foreign).unwrap_err(), StateError::UnknownRoot(foreign_root));
    }
}

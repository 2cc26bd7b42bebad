//! Performance counters of a storage backend.

use std::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub get_atoms: AtomicU64,
    pub got_nodes: AtomicU64,
    pub got_links: AtomicU64,
    pub get_insets: AtomicU64,
    pub get_inlinks: AtomicU64,
    pub node_inserts: AtomicU64,
    pub link_inserts: AtomicU64,
    pub atom_removes: AtomicU64,
    pub load_count: AtomicU64,
    pub store_count: AtomicU64,
    pub value_stores: AtomicU64,
    pub value_fetches: AtomicU64,
    pub value_deletes: AtomicU64,
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    fn all(&self) -> [&AtomicU64; 13] {
        [
            &self.get_atoms,
            &self.got_nodes,
            &self.got_links,
            &self.get_insets,
            &self.get_inlinks,
            &self.node_inserts,
            &self.link_inserts,
            &self.atom_removes,
            &self.load_count,
            &self.store_count,
            &self.value_stores,
            &self.value_fetches,
            &self.value_deletes,
        ]
    }

    pub fn snapshot(&self, pending_writes: usize) -> Stats {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        Stats {
            get_atoms: get(&self.get_atoms),
            got_nodes: get(&self.got_nodes),
            got_links: get(&self.got_links),
            get_insets: get(&self.get_insets),
            get_inlinks: get(&self.get_inlinks),
            node_inserts: get(&self.node_inserts),
            link_inserts: get(&self.link_inserts),
            atom_removes: get(&self.atom_removes),
            load_count: get(&self.load_count),
            store_count: get(&self.store_count),
            value_stores: get(&self.value_stores),
            value_fetches: get(&self.value_fetches),
            value_deletes: get(&self.value_deletes),
            pending_writes,
        }
    }

    pub fn clear(&self) {
        for counter in self.all().iter() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Snapshot of the counters of an [crate::AtomStorage].
pub struct Stats {
    /// Calls to `get_node` and `get_link`.
    pub get_atoms: u64,
    /// Nodes found by `get_node`.
    pub got_nodes: u64,
    /// Links found by `get_link`.
    pub got_links: u64,
    /// Calls to `get_incoming_set`.
    pub get_insets: u64,
    /// Parents returned by `get_incoming_set`.
    pub get_inlinks: u64,
    /// Node records written.
    pub node_inserts: u64,
    /// Link records written.
    pub link_inserts: u64,
    pub atom_removes: u64,
    /// Atoms loaded by `load_all` and `load_type`.
    pub load_count: u64,
    /// Calls to `store`.
    pub store_count: u64,
    /// Association lists written, tombstones included.
    pub value_stores: u64,
    pub value_fetches: u64,
    /// Tombstones written.
    pub value_deletes: u64,
    /// Queued writes not yet applied at the time of the snapshot.
    pub pending_writes: usize,
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "get_atoms={} got_nodes={} got_links={}",
            self.get_atoms, self.got_nodes, self.got_links
        )?;
        writeln!(
            f,
            "get_insets={} get_inlinks={}",
            self.get_insets, self.get_inlinks
        )?;
        writeln!(
            f,
            "node_inserts={} link_inserts={} atom_removes={}",
            self.node_inserts, self.link_inserts, self.atom_removes
        )?;
        writeln!(
            f,
            "load_count={} store_count={}",
            self.load_count, self.store_count
        )?;
        write!(
            f,
            "value_stores={} value_fetches={} value_deletes={} pending_writes={}",
            self.value_stores, self.value_fetches, self.value_deletes, self.pending_writes
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snapshot_and_clear() {
        let counters = Counters::default();

        bump(&counters.store_count);
        bump(&counters.store_count);
        bump(&counters.value_deletes);

        let stats = counters.snapshot(3);
        assert_eq!(stats.store_count, 2);
        assert_eq!(stats.value_deletes, 1);
        assert_eq!(stats.pending_writes, 3);

        counters.clear();
        assert_eq!(counters.snapshot(0), Stats::default());
    }
}

//! Writing atoms, their outgoing sets and their values.

use bytes::Bytes;
use tracing::{debug, trace};

use super::{stats::bump, AtomStorage};
use crate::{
    codec::encode_alist,
    common::{Handle, RecordKind},
    Result,
};

impl AtomStorage {
    /// Store `handle`, everything it points at, and its current values.
    ///
    /// A `synchronous` store waits for each write to be acknowledged and
    /// returns its own failure. Otherwise writes are queued, and the next
    /// [Self::barrier] reports their failure.
    pub fn store(&self, handle: &Handle, synchronous: bool) -> Result<()> {
        self.check_writable()?;

        self.store_recursive(handle, synchronous)?;
        self.store_atom_values(handle, synchronous)?;

        bump(&self.0.counters.store_count);

        Ok(())
    }

    /// Write the atom record and the space record of `handle`, after those of
    /// its outgoing set. Also writes the back pointer from each child.
    ///
    /// Atoms already published by this backend are skipped.
    pub(crate) fn store_recursive(&self, handle: &Handle, synchronous: bool) -> Result<()> {
        if self.is_published(handle) {
            return Ok(());
        }

        let guid = self.identity_key(handle);

        for child in handle.outgoing() {
            self.store_recursive(child, synchronous)?;
            self.store_incoming_of(child, guid, synchronous)?;
        }

        let encoding = Bytes::from(handle.to_short_string());

        self.put(
            guid,
            self.record(RecordKind::Atom, guid, 0, encoding.clone()),
            synchronous,
        )?;
        self.publish_to_space(handle, encoding, synchronous)?;

        if handle.is_node() {
            bump(&self.0.counters.node_inserts);
        } else {
            bump(&self.0.counters.link_inserts);
        }

        trace!(?guid, %handle, synchronous, "Stored atom");

        Ok(())
    }

    /// Announce `handle` in the namespace and remember it was published.
    fn publish_to_space(&self, handle: &Handle, encoding: Bytes, synchronous: bool) -> Result<()> {
        let guid = self.identity_key(handle);

        self.put(
            self.0.space_key,
            self.record(RecordKind::Space, guid, 0, encoding),
            synchronous,
        )?;

        self.0
            .published
            .lock()
            .expect("mutex")
            .insert(handle.clone());

        Ok(())
    }

    /// Write the association list of `handle` as currently held in memory.
    ///
    /// An atom without values only gets a tombstone, and only if a live
    /// association list is stored for it.
    pub(crate) fn store_atom_values(&self, handle: &Handle, synchronous: bool) -> Result<()> {
        let keys = self.0.space.get_keys(handle);

        if keys.is_empty() {
            return self.delete_atom_values(handle, synchronous);
        }

        let mut pairs = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(value) = self.0.space.get_value(handle, &key) {
                self.store_recursive(&key, synchronous)?;
                pairs.push((key, value));
            }
        }

        let blob = encode_alist(pairs.iter().map(|(key, value)| (key, value)));

        self.write_values(self.membership_key(handle), Bytes::from(blob), synchronous)
    }

    /// Tombstone the association list of `handle`, if a live one is stored.
    pub(crate) fn delete_atom_values(&self, handle: &Handle, synchronous: bool) -> Result<()> {
        let key = self.membership_key(handle);

        match self.latest_values(key)? {
            Some(record) if !record.is_tombstone() => {
                debug!(?key, %handle, "Deleting stale values");
                bump(&self.0.counters.value_deletes);

                self.write_values(key, Bytes::new(), synchronous)
            }
            _ => Ok(()),
        }
    }
}

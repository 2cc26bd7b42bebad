//! Back pointers from atoms to the links that contain them.

use bytes::Bytes;
use tracing::{debug, warn};

use super::{stats::bump, AtomStorage};
use crate::{
    common::{AtomType, Handle, Id, RecordKind},
    Error, Result,
};

impl AtomStorage {
    /// Record the link with identity `parent` as pointing at `child`.
    pub(crate) fn store_incoming_of(
        &self,
        child: &Handle,
        parent: Id,
        synchronous: bool,
    ) -> Result<()> {
        let guid = self.identity_key(child);

        self.put(
            guid,
            self.record(
                RecordKind::Incoming,
                parent,
                0,
                Bytes::copy_from_slice(parent.as_bytes()),
            ),
            synchronous,
        )
    }

    /// Withdraw the back pointer from `child` to `parent`, if any.
    pub(crate) fn remove_incoming_of(&self, child: &Handle, parent: Id) -> Result<()> {
        let guid = self.identity_key(child);

        if !self.0.runner.remove(guid, RecordKind::Incoming, parent)? {
            debug!(?guid, ?parent, "No incoming entry to remove");
        }

        Ok(())
    }

    /// Every stored link pointing at `target`, loaded into the atomspace
    /// together with its values.
    ///
    /// Links whose atom record is gone, and links whose atom or values do not
    /// decode, are skipped.
    pub fn get_incoming_set(&self, target: &Handle) -> Result<Vec<Handle>> {
        bump(&self.0.counters.get_insets);

        let guid = self.identity_key(target);
        let mut parents = Vec::new();

        for record in self.fetch_records(guid, RecordKind::Incoming)? {
            if record.is_tombstone() {
                continue;
            }

            let parent = match self.fetch_atom(record.id()) {
                Ok(parent) => parent,
                Err(Error::NotFound(parent)) => {
                    debug!(?guid, ?parent, "Skipping stale incoming entry");
                    continue;
                }
                Err(Error::Decode { key, source }) => {
                    warn!(?guid, ?key, ?source, "Skipping undecodable incoming link");
                    continue;
                }
                Err(error) => return Err(error),
            };

            match self.fetch_values(&parent) {
                Ok(()) => {}
                Err(Error::Decode { key, source }) => {
                    warn!(
                        ?guid,
                        %parent,
                        ?key,
                        ?source,
                        "Skipping incoming link with undecodable values"
                    );
                    continue;
                }
                Err(error) => return Err(error),
            }

            let parent = self.0.space.add(parent);

            bump(&self.0.counters.get_inlinks);
            parents.push(parent);
        }

        parents.sort();
        parents.dedup();

        Ok(parents)
    }

    /// Same as [Self::get_incoming_set], keeping only links of `kind`.
    pub fn get_incoming_by_type(&self, target: &Handle, kind: &AtomType) -> Result<Vec<Handle>> {
        Ok(self
            .get_incoming_set(target)?
            .into_iter()
            .filter(|parent| parent.kind() == kind)
            .collect())
    }
}

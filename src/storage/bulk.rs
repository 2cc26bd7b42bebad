//! Whole namespace operations.

use tracing::{debug, info, warn};

use super::{stats::bump, AtomStorage};
use crate::{
    common::{AtomType, RecordKind},
    Error, Result,
};

#[derive(Debug, Default)]
/// Outcome of a bulk operation, which carries on past individual failures.
pub struct BulkReport {
    /// Number of atoms processed successfully.
    pub succeeded: usize,
    /// Each failed atom (or key, if it could not be decoded) and why.
    pub failed: Vec<(String, Error)>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl AtomStorage {
    /// Load every atom published in the namespace, with its values.
    pub fn load_all(&self) -> Result<BulkReport> {
        self.load(None)
    }

    /// Load every atom of `kind` published in the namespace, with its values.
    pub fn load_type(&self, kind: &AtomType) -> Result<BulkReport> {
        self.load(Some(kind))
    }

    fn load(&self, kind: Option<&AtomType>) -> Result<BulkReport> {
        let mut report = BulkReport::default();

        for record in self.fetch_records(self.0.space_key, RecordKind::Space)? {
            let guid = record.id();

            let loaded = self.fetch_atom(guid).and_then(|handle| {
                if kind.map_or(false, |kind| handle.kind() != kind) {
                    return Ok(None);
                }

                self.fetch_values(&handle)?;
                Ok(Some(self.0.space.add(handle)))
            });

            match loaded {
                Ok(Some(handle)) => {
                    bump(&self.0.counters.load_count);
                    self.0
                        .published
                        .lock()
                        .expect("mutex")
                        .insert(handle);
                    report.succeeded += 1;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(?guid, ?error, "Failed to load atom");
                    report.failed.push((guid.to_string(), error));
                }
            }
        }

        info!(
            namespace = %self.0.namespace,
            loaded = report.succeeded,
            failed = report.failed.len(),
            "Loaded atoms"
        );

        Ok(report)
    }

    /// Store every atom of the atomspace, then wait for the writes to be
    /// applied.
    pub fn store_all(&self) -> Result<BulkReport> {
        self.check_writable()?;

        let mut report = BulkReport::default();

        for handle in self.0.space.atoms() {
            match self.store(&handle, false) {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    warn!(%handle, ?error, "Failed to store atom");
                    report.failed.push((handle.to_string(), error));
                }
            }
        }

        self.barrier()?;

        info!(
            namespace = %self.0.namespace,
            stored = report.succeeded,
            failed = report.failed.len(),
            "Stored atoms"
        );

        Ok(report)
    }

    /// Remove every atom published in the namespace, and forget everything
    /// cached about them. Returns the number of atoms wiped.
    pub fn wipe_all_data(&self) -> Result<usize> {
        self.check_writable()?;

        let mut wiped = 0;

        for record in self.fetch_records(self.0.space_key, RecordKind::Space)? {
            let guid = record.id();

            match self.fetch_atom(guid) {
                Ok(handle) => {
                    self.remove(&handle, false)?;
                }
                Err(error) => {
                    debug!(?guid, ?error, "Wiping undecodable atom");
                    self.0.runner.remove(guid, RecordKind::Atom, guid)?;
                    self.0
                        .runner
                        .remove(self.0.space_key, RecordKind::Space, guid)?;
                }
            }

            wiped += 1;
        }

        self.barrier()?;

        self.0.published.lock().expect("mutex").clear();
        self.0.decoded.lock().expect("mutex").clear();
        self.0.resolver.clear();

        info!(namespace = %self.0.namespace, wiped, "Wiped namespace");

        Ok(wiped)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        common::{AtomType, Handle},
        space::AtomSpace,
        transport::MemoryDht,
        AtomStorage,
    };

    fn populated() -> (MemoryDht, Arc<AtomSpace>) {
        let space = Arc::new(AtomSpace::new());
        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let b = space.add_node(AtomType::PREDICATE_NODE, "b");
        space.add_link(AtomType::EVALUATION_LINK, vec![b, a]);

        (MemoryDht::new(), space)
    }

    #[test]
    fn store_all_then_load_type() {
        let (dht, space) = populated();
        let writer = AtomStorage::builder().build(space, dht.clone());

        let report = writer.store_all().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.succeeded, 3);

        let loaded = Arc::new(AtomSpace::new());
        let reader = AtomStorage::builder().build(loaded.clone(), dht);

        let report = reader.load_type(&AtomType::PREDICATE_NODE).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            loaded.atoms(),
            vec![Handle::node(AtomType::PREDICATE_NODE, "b")]
        );

        let report = reader.load_all().unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn other_namespaces_are_not_loaded() {
        let (dht, space) = populated();
        AtomStorage::builder()
            .namespace("one")
            .build(space, dht.clone())
            .store_all()
            .unwrap();

        let loaded = Arc::new(AtomSpace::new());
        let report = AtomStorage::builder()
            .namespace("two")
            .build(loaded.clone(), dht)
            .load_all()
            .unwrap();

        assert_eq!(report.succeeded, 0);
        assert!(loaded.is_empty());
    }

    #[test]
    fn wipe() {
        let (dht, space) = populated();
        let storage = AtomStorage::builder().build(space, dht.clone());

        storage.store_all().unwrap();
        assert_eq!(storage.wipe_all_data().unwrap(), 3);

        assert!(dht.is_empty());
        assert_eq!(storage.load_all().unwrap().succeeded, 0);
    }
}

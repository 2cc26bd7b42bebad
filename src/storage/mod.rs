//! Persistence of an [AtomSpace] onto a DHT.
//!
//! Layout of the data on the DHT:
//!
//! - identity key, the content address of the canonical encoding of an atom:
//!   one [RecordKind::Atom] record holding that encoding, and one
//!   [RecordKind::Incoming] record per link pointing at the atom.
//! - membership key, derived from the namespace key and the identity key:
//!   [RecordKind::Values] records, one per writer, holding the association
//!   list of the atom. The most recent one wins.
//! - namespace key: one [RecordKind::Space] record per atom published in the
//!   namespace.

mod atoms;
mod bulk;
mod config;
mod incoming;
mod resolver;
mod stats;
mod store;
mod values;

use std::{
    cmp,
    collections::HashSet,
    fmt::{self, Debug, Formatter},
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, Weak,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use lru::LruCache;
use tracing::{debug, info, warn};

use crate::{
    common::{Handle, Id, Record, RecordKind},
    runner::DhtRunner,
    space::AtomSpace,
    transport::Transport,
    Error, Result,
};

pub use bulk::BulkReport;
pub use config::{Config, StorageBuilder, DEFAULT_DECODE_CACHE_SIZE, DEFAULT_NAMESPACE};
pub use stats::Stats;

use resolver::Resolver;
use stats::Counters;

#[derive(Clone)]
/// DHT backed storage of one atomspace namespace.
///
/// Cheap to clone; clones share caches, counters and the runner thread, and
/// can be used from many threads at once.
pub struct AtomStorage(Arc<Shared>);

struct Shared {
    namespace: String,
    space_key: Id,
    read_only: bool,
    signer: SigningKey,
    /// Record id of the [RecordKind::Values] records written by this backend.
    writer: Id,
    runner: DhtRunner,
    space: Arc<AtomSpace>,
    resolver: Resolver,
    /// Atoms whose atom and space records were written by this backend.
    ///
    /// Asynchronously stored atoms are added once their writes are queued,
    /// and taken out again by the barrier that sees one of them fail.
    published: Mutex<HashSet<Handle>>,
    decoded: Mutex<LruCache<Id, Handle>>,
    clock: AtomicI64,
    counters: Counters,
}

impl AtomStorage {
    /// Returns a builder to configure an [AtomStorage].
    pub fn builder() -> StorageBuilder {
        StorageBuilder::default()
    }

    pub fn new<T: Transport>(config: Config, space: Arc<AtomSpace>, transport: T) -> Self {
        let signer = config
            .signing_key
            .unwrap_or_else(|| SigningKey::from_bytes(&rand::random()));
        let writer = Id::digest(&[&signer.verifying_key().to_bytes()[..]]);
        let space_key = Id::digest(&[config.namespace.as_bytes()]);

        let cache_size = NonZeroUsize::new(config.decode_cache_size).unwrap_or(NonZeroUsize::MIN);

        info!(
            namespace = %config.namespace,
            ?space_key,
            ?writer,
            read_only = config.read_only,
            "Opened DHT atom storage"
        );

        AtomStorage(Arc::new(Shared {
            namespace: config.namespace,
            space_key,
            read_only: config.read_only,
            signer,
            writer,
            runner: DhtRunner::new(transport),
            space,
            resolver: Resolver::new(space_key),
            published: Mutex::new(HashSet::new()),
            decoded: Mutex::new(LruCache::new(cache_size)),
            clock: AtomicI64::new(0),
            counters: Counters::default(),
        }))
    }

    // === Getters ===

    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    /// Key of the namespace, holding one [RecordKind::Space] record per
    /// published atom.
    pub fn space_key(&self) -> Id {
        self.0.space_key
    }

    pub fn is_read_only(&self) -> bool {
        self.0.read_only
    }

    /// The in-memory atomspace this backend loads into and stores from.
    pub fn atomspace(&self) -> &Arc<AtomSpace> {
        &self.0.space
    }

    /// Key of the atom record of `handle`.
    pub fn identity_key(&self, handle: &Handle) -> Id {
        self.0.resolver.identity_key(handle)
    }

    /// Key of the values of `handle` in this namespace.
    pub fn membership_key(&self, handle: &Handle) -> Id {
        self.0.resolver.membership_key(handle)
    }

    /// Whether the underlying transport can reach the network.
    pub fn connected(&self) -> bool {
        self.0.runner.is_connected()
    }

    pub fn stats(&self) -> Stats {
        self.0.counters.snapshot(self.0.runner.pending())
    }

    pub fn clear_stats(&self) {
        self.0.counters.clear();
    }

    // === Public Methods ===

    /// Block until every write issued so far was applied.
    ///
    /// Returns the first failure among queued writes since the last barrier.
    /// Atoms with a failed write are unpublished, so the next [Self::store]
    /// writes them again.
    pub fn barrier(&self) -> Result<()> {
        let failed = self.0.runner.barrier()?;

        if failed.is_empty() {
            return Ok(());
        }

        // Atom and space records carry the identity of their atom, and
        // incoming records that of the link pointing at the child.
        let unpublish: HashSet<Id> = failed
            .iter()
            .filter(|write| write.kind != RecordKind::Values)
            .map(|write| write.id)
            .collect();

        self.0
            .published
            .lock()
            .expect("mutex")
            .retain(|handle| !unpublish.contains(&self.0.resolver.identity_key(handle)));

        warn!(
            failed = failed.len(),
            unpublished = unpublish.len(),
            "Queued DHT writes failed"
        );

        match failed.into_iter().next() {
            Some(write) => Err(write.error.into()),
            None => Ok(()),
        }
    }

    /// Same as [Self::barrier], returning the number of writes that were
    /// still queued when called.
    pub fn flush_pending(&self) -> Result<usize> {
        let pending = self.0.runner.pending();
        self.barrier()?;

        debug!(pending, "Flushed pending writes");

        Ok(pending)
    }

    /// Human readable dump of every record stored under `key`, valid or not.
    pub fn examine(&self, key: Id) -> Result<String> {
        let records = self.0.runner.get(key, None)?;
        if records.is_empty() {
            return Err(Error::NotFound(key));
        }

        let mut out = format!("{} record(s) at {}:\n", records.len(), key);

        for record in records {
            let valid = match record.kind() {
                RecordKind::Atom => record.verify().is_ok() && key.validates_immutable(record.value()),
                _ => record.verify().is_ok(),
            };

            let payload = if record.is_tombstone() {
                "<tombstone>".to_string()
            } else {
                String::from_utf8_lossy(record.value()).into_owned()
            };

            out.push_str(&format!(
                "  {:?} id={} seq={} writer={} valid={} {}\n",
                record.kind(),
                record.id(),
                record.seq(),
                Id::digest(&[&record.key()[..]]),
                valid,
                payload
            ));
        }

        Ok(out)
    }

    /// Subscribe to atoms being extracted from `space`, removing them from
    /// the DHT too.
    ///
    /// The subscription only holds a weak reference, and stops acting once
    /// every clone of this backend was dropped.
    pub fn register_with(&self, space: &AtomSpace) {
        let shared: Weak<Shared> = Arc::downgrade(&self.0);

        space.on_extract(move |handle| {
            let storage = match shared.upgrade() {
                Some(shared) => AtomStorage(shared),
                None => return,
            };

            storage.forget(handle);

            if storage.is_read_only() {
                return;
            }

            if let Err(error) = storage.remove(handle, false) {
                warn!(%handle, ?error, "Failed to remove extracted atom");
            }
        });
    }

    // === Private Methods ===

    fn check_writable(&self) -> Result<()> {
        if self.0.read_only {
            return Err(Error::ReadOnlyViolation);
        }

        Ok(())
    }

    /// Strictly increasing timestamp in microseconds.
    fn next_timestamp(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);

        let next = |last: i64| cmp::max(now, last + 1);

        let last = self
            .0
            .clock
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(next(last)))
            .unwrap_or_else(|last| last);

        next(last)
    }

    fn record(&self, kind: RecordKind, id: Id, seq: i64, value: Bytes) -> Record {
        Record::new(&self.0.signer, kind, id, seq, value)
    }

    /// Write `record`, waiting for the transport to acknowledge it if
    /// `synchronous`, otherwise only queueing it.
    fn put(&self, key: Id, record: Record, synchronous: bool) -> Result<()> {
        if synchronous {
            self.0.runner.put(key, record)?;
        } else {
            self.0.runner.put_async(key, record)?;
        }

        Ok(())
    }

    /// Records of `kind` under `key`, minus those with an invalid signature.
    fn fetch_records(&self, key: Id, kind: RecordKind) -> Result<Vec<Record>> {
        let records = self.0.runner.get(key, Some(kind))?;

        Ok(records
            .into_iter()
            .filter(|record| match record.verify() {
                Ok(()) => true,
                Err(error) => {
                    debug!(?key, ?kind, ?error, "Ignoring unverifiable record");
                    false
                }
            })
            .collect())
    }

    /// Drop every in-process trace of `handle`.
    fn forget(&self, handle: &Handle) {
        let guid = self.0.resolver.identity_key(handle);

        self.0.decoded.lock().expect("mutex").pop(&guid);
        self.0.published.lock().expect("mutex").remove(handle);
        self.0.resolver.forget(handle);
    }

    fn is_published(&self, handle: &Handle) -> bool {
        self.0.published.lock().expect("mutex").contains(handle)
    }
}

impl Debug for AtomStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomStorage")
            .field("namespace", &self.0.namespace)
            .field("space_key", &self.0.space_key)
            .field("writer", &self.0.writer)
            .field("read_only", &self.0.read_only)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{common::AtomType, transport::MemoryDht};

    #[test]
    fn timestamps_are_strictly_increasing() {
        let storage = AtomStorage::builder().build(Arc::new(AtomSpace::new()), MemoryDht::new());

        let mut last = storage.next_timestamp();
        for _ in 0..1000 {
            let next = storage.next_timestamp();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn namespaces_have_distinct_keys() {
        let dht = MemoryDht::new();
        let space = Arc::new(AtomSpace::new());

        let a = AtomStorage::builder()
            .namespace("a")
            .build(space.clone(), dht.clone());
        let b = AtomStorage::builder().namespace("b").build(space, dht);

        let node = Handle::node(AtomType::CONCEPT_NODE, "x");

        assert_ne!(a.space_key(), b.space_key());
        assert_eq!(a.identity_key(&node), b.identity_key(&node));
        assert_ne!(a.membership_key(&node), b.membership_key(&node));
    }

    #[test]
    fn examine() {
        let dht = MemoryDht::new();
        let storage = AtomStorage::builder().build(Arc::new(AtomSpace::new()), dht);
        let node = Handle::node(AtomType::CONCEPT_NODE, "a");

        assert!(matches!(
            storage.examine(storage.identity_key(&node)),
            Err(Error::NotFound(_))
        ));

        storage.store(&node, true).unwrap();

        let dump = storage.examine(storage.identity_key(&node)).unwrap();
        assert!(dump.starts_with("1 record(s)"));
        assert!(dump.contains("Atom"));
        assert!(dump.contains("valid=true"));
        assert!(dump.contains(r#"(ConceptNode "a")"#));
    }

    #[test]
    fn read_only_rejects_writes() {
        let dht = MemoryDht::new();
        let space = Arc::new(AtomSpace::new());
        let storage = AtomStorage::builder()
            .read_only()
            .build(space.clone(), dht.clone());

        let node = space.add_node(AtomType::CONCEPT_NODE, "a");

        assert!(matches!(
            storage.store(&node, true),
            Err(Error::ReadOnlyViolation)
        ));
        assert!(matches!(
            storage.remove(&node, false),
            Err(Error::ReadOnlyViolation)
        ));
        assert!(matches!(
            storage.wipe_all_data(),
            Err(Error::ReadOnlyViolation)
        ));
        assert!(dht.is_empty());
    }
}

//! The DHT underneath the storage backend.
//!
//! Routing, replication and peer discovery all live behind [Transport]; the
//! backend only needs to put, get and remove records by key.

mod memory;

pub use memory::MemoryDht;

use crate::common::{Id, Record, RecordKind};

/// A DHT client, owned and driven by a [crate::DhtRunner] thread.
pub trait Transport: Send + 'static {
    /// Store `record` under `key`, replacing the record with the same kind and
    /// id, unless the stored one has a more recent `seq`.
    fn put(&mut self, key: Id, record: Record) -> Result<(), TransportError>;

    /// Every record under `key`, optionally only those of `kind`.
    fn get(&mut self, key: Id, kind: Option<RecordKind>) -> Result<Vec<Record>, TransportError>;

    /// Remove the record with `kind` and `id` under `key`.
    ///
    /// Returns `false` if there was no such record.
    fn remove(&mut self, key: Id, kind: RecordKind, id: Id) -> Result<bool, TransportError>;

    /// Whether the transport can currently reach the network.
    fn is_connected(&self) -> bool {
        true
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Failures reported by a [Transport] or by the runner in front of it.
pub enum TransportError {
    #[error("DHT transport is offline")]
    Offline,

    #[error("DHT runner was shutdown")]
    Shutdown,

    /// A record with the same kind and id and a more recent seq exists.
    #[error("Put to {key} rejected, a more recent record exists")]
    NotMostRecent { key: Id },

    #[error("DHT transport failure: {0}")]
    Other(String),
}

//! In process DHT, shared by every clone.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use tracing::debug;

use super::{Transport, TransportError};
use crate::common::{Id, Record, RecordKind};

#[derive(Debug, Clone, Default)]
/// A [Transport] keeping records in memory.
///
/// Records are kept in their bencoded wire form and decoded on every `get`,
/// the way a remote peer would hand them over, so garbage injected with
/// [MemoryDht::inject_raw] is skipped like a bad peer response.
///
/// Clones share the same storage, which makes several backends built on
/// clones of one `MemoryDht` behave like peers of one network.
pub struct MemoryDht {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<Id, Vec<Bytes>>,
    puts: HashMap<Id, usize>,
    offline: bool,
}

impl MemoryDht {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the network.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().expect("mutex").offline = offline;
    }

    /// Store raw bytes under `key`, bypassing any validation.
    pub fn inject_raw(&self, key: Id, bytes: impl Into<Bytes>) {
        self.state
            .lock()
            .expect("mutex")
            .entries
            .entry(key)
            .or_default()
            .push(bytes.into());
    }

    /// Number of accepted puts to `key` so far.
    pub fn puts_to(&self, key: &Id) -> usize {
        let state = self.state.lock().expect("mutex");
        state.puts.get(key).copied().unwrap_or(0)
    }

    /// Number of entries stored under `key`, decodable or not.
    pub fn len_at(&self, key: &Id) -> usize {
        let state = self.state.lock().expect("mutex");
        state.entries.get(key).map(|e| e.len()).unwrap_or(0)
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("mutex");
        state.entries.values().map(|e| e.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl State {
    fn check_online(&self) -> Result<(), TransportError> {
        if self.offline {
            Err(TransportError::Offline)
        } else {
            Ok(())
        }
    }
}

fn same_slot(bytes: &[u8], kind: RecordKind, id: &Id) -> Option<Record> {
    Record::from_bytes(bytes)
        .ok()
        .filter(|existing| existing.kind() == kind && existing.id() == *id)
}

impl Transport for MemoryDht {
    fn put(&mut self, key: Id, record: Record) -> Result<(), TransportError> {
        let mut state = self.state.lock().expect("mutex");
        state.check_online()?;

        let bytes: Bytes = record
            .to_bytes()
            .map_err(|error| TransportError::Other(error.to_string()))?
            .into();

        let entries = state.entries.entry(key).or_default();

        match entries
            .iter()
            .position(|e| same_slot(e, record.kind(), &record.id()).is_some())
        {
            Some(index) => {
                let current = same_slot(&entries[index], record.kind(), &record.id());
                if current.map_or(false, |current| current.seq() > record.seq()) {
                    return Err(TransportError::NotMostRecent { key });
                }
                entries[index] = bytes;
            }
            None => entries.push(bytes),
        }

        *state.puts.entry(key).or_default() += 1;

        Ok(())
    }

    fn get(&mut self, key: Id, kind: Option<RecordKind>) -> Result<Vec<Record>, TransportError> {
        let state = self.state.lock().expect("mutex");
        state.check_online()?;

        let entries = match state.entries.get(&key) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        Ok(entries
            .iter()
            .filter_map(|bytes| match Record::from_bytes(bytes) {
                Ok(record) => Some(record),
                Err(error) => {
                    debug!(?key, ?error, "Skipping undecodable record");
                    None
                }
            })
            .filter(|record| kind.map_or(true, |kind| record.kind() == kind))
            .collect())
    }

    fn remove(&mut self, key: Id, kind: RecordKind, id: Id) -> Result<bool, TransportError> {
        let mut state = self.state.lock().expect("mutex");
        state.check_online()?;

        let entries = match state.entries.get_mut(&key) {
            Some(entries) => entries,
            None => return Ok(false),
        };

        let before = entries.len();
        entries.retain(|e| same_slot(e, kind, &id).is_none());
        let removed = entries.len() != before;

        if entries.is_empty() {
            state.entries.remove(&key);
        }

        Ok(removed)
    }

    fn is_connected(&self) -> bool {
        !self.state.lock().expect("mutex").offline
    }
}

//! Synchronous front end to a [Transport] running on its own thread.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use flume::{Receiver, Sender};
use tracing::{debug, warn};

use crate::common::{Id, Record, RecordKind};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone)]
/// Handle to the runner thread that owns a [Transport].
///
/// Requests are served in the order they were sent, so a `get` always
/// observes every write queued before it by the same caller.
///
/// The thread stops once every clone of the runner is dropped, or on
/// [DhtRunner::shutdown].
pub struct DhtRunner {
    sender: Sender<ActorMessage>,
    pending: Arc<AtomicUsize>,
}

impl DhtRunner {
    pub fn new<T: Transport>(transport: T) -> Self {
        let (sender, receiver) = flume::unbounded();
        let pending = Arc::new(AtomicUsize::new(0));

        let actor = Actor {
            transport: Box::new(transport),
            receiver,
            pending: pending.clone(),
            failures: Vec::new(),
        };

        thread::spawn(move || actor.run());

        DhtRunner { sender, pending }
    }

    // === Getters ===

    /// Number of queued writes not yet applied.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the transport reports a live connection.
    pub fn is_connected(&self) -> bool {
        let (sender, receiver) = flume::bounded::<bool>(1);

        if self.sender.send(ActorMessage::Check(sender)).is_err() {
            return false;
        }

        receiver.recv().unwrap_or(false)
    }

    // === Public Methods ===

    /// Queue a write without waiting for it to be applied.
    ///
    /// A failure of the write itself is returned by the next [Self::barrier].
    pub fn put_async(&self, key: Id, record: Record) -> Result<(), TransportError> {
        self.pending.fetch_add(1, Ordering::AcqRel);

        self.sender
            .send(ActorMessage::Put(key, record, None))
            .map_err(|_| {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                TransportError::Shutdown
            })
    }

    /// Write and wait for the transport to acknowledge it.
    pub fn put(&self, key: Id, record: Record) -> Result<(), TransportError> {
        let (sender, receiver) = flume::bounded::<Result<(), TransportError>>(1);

        self.sender
            .send(ActorMessage::Put(key, record, Some(sender)))
            .map_err(|_| TransportError::Shutdown)?;

        receiver.recv().map_err(|_| TransportError::Shutdown)?
    }

    pub fn get(&self, key: Id, kind: Option<RecordKind>) -> Result<Vec<Record>, TransportError> {
        let (sender, receiver) = flume::bounded::<Result<Vec<Record>, TransportError>>(1);

        self.sender
            .send(ActorMessage::Get(key, kind, sender))
            .map_err(|_| TransportError::Shutdown)?;

        receiver.recv().map_err(|_| TransportError::Shutdown)?
    }

    /// Returns `false` if no such record existed.
    pub fn remove(&self, key: Id, kind: RecordKind, id: Id) -> Result<bool, TransportError> {
        let (sender, receiver) = flume::bounded::<Result<bool, TransportError>>(1);

        self.sender
            .send(ActorMessage::Remove(key, kind, id, sender))
            .map_err(|_| TransportError::Shutdown)?;

        receiver.recv().map_err(|_| TransportError::Shutdown)?
    }

    /// Block until every write queued so far was applied.
    ///
    /// Returns the queued writes that failed since the previous barrier, from
    /// any caller. Each failure is returned once.
    pub fn barrier(&self) -> Result<Vec<FailedWrite>, TransportError> {
        let (sender, receiver) = flume::bounded::<Vec<FailedWrite>>(1);

        self.sender
            .send(ActorMessage::Barrier(sender))
            .map_err(|_| TransportError::Shutdown)?;

        receiver.recv().map_err(|_| TransportError::Shutdown)
    }

    /// Stop the runner thread after it drained the requests sent before.
    pub fn shutdown(&self) {
        let (sender, receiver) = flume::bounded::<()>(1);

        let _ = self.sender.send(ActorMessage::Shutdown(sender));
        let _ = receiver.recv();
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A queued write the transport rejected.
pub struct FailedWrite {
    pub key: Id,
    pub kind: RecordKind,
    /// Record id of the rejected record.
    pub id: Id,
    pub error: TransportError,
}

#[derive(Debug)]
enum ActorMessage {
    Put(Id, Record, Option<Sender<Result<(), TransportError>>>),
    Get(
        Id,
        Option<RecordKind>,
        Sender<Result<Vec<Record>, TransportError>>,
    ),
    Remove(Id, RecordKind, Id, Sender<Result<bool, TransportError>>),
    Barrier(Sender<Vec<FailedWrite>>),
    Check(Sender<bool>),
    Shutdown(Sender<()>),
}

struct Actor {
    transport: Box<dyn Transport>,
    receiver: Receiver<ActorMessage>,
    pending: Arc<AtomicUsize>,
    /// Failed queued writes since the last barrier.
    failures: Vec<FailedWrite>,
}

impl Actor {
    fn run(mut self) {
        while let Ok(message) = self.receiver.recv() {
            match message {
                ActorMessage::Put(key, record, Some(sender)) => {
                    let _ = sender.send(self.transport.put(key, record));
                }
                ActorMessage::Put(key, record, None) => {
                    let (kind, id) = (record.kind(), record.id());

                    if let Err(error) = self.transport.put(key, record) {
                        warn!(?key, ?kind, ?error, "Queued DHT write failed");
                        self.failures.push(FailedWrite {
                            key,
                            kind,
                            id,
                            error,
                        });
                    }
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                }
                ActorMessage::Get(key, kind, sender) => {
                    let _ = sender.send(self.transport.get(key, kind));
                }
                ActorMessage::Remove(key, kind, id, sender) => {
                    let _ = sender.send(self.transport.remove(key, kind, id));
                }
                ActorMessage::Barrier(sender) => {
                    let _ = sender.send(std::mem::take(&mut self.failures));
                }
                ActorMessage::Check(sender) => {
                    let _ = sender.send(self.transport.is_connected());
                }
                ActorMessage::Shutdown(sender) => {
                    let _ = sender.send(());
                    break;
                }
            }
        }

        debug!("atomdht::DhtRunner's thread was shutdown.");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::MemoryDht;
    use bytes::Bytes;
    use ed25519_dalek::SigningKey;

    fn record(id: Id, seq: i64) -> Record {
        Record::new(
            &SigningKey::from_bytes(&[9; 32]),
            RecordKind::Values,
            id,
            seq,
            Bytes::from_static(b"v"),
        )
    }

    #[test]
    fn queued_writes_are_visible_to_later_reads() {
        let runner = DhtRunner::new(MemoryDht::new());
        let key = Id::random();

        for seq in 0..10 {
            runner.put_async(key, record(Id::random(), seq)).unwrap();
        }

        assert_eq!(runner.get(key, None).unwrap().len(), 10);
        assert!(runner.barrier().unwrap().is_empty());
        assert_eq!(runner.pending(), 0);
    }

    #[test]
    fn barrier_reports_failed_queued_write() {
        let dht = MemoryDht::new();
        let runner = DhtRunner::new(dht.clone());

        let (key, id) = (Id::random(), Id::random());

        dht.set_offline(true);
        runner.put_async(key, record(id, 1)).unwrap();

        assert_eq!(
            runner.barrier(),
            Ok(vec![FailedWrite {
                key,
                kind: RecordKind::Values,
                id,
                error: TransportError::Offline,
            }])
        );

        // Failures are reported once.
        dht.set_offline(false);
        assert_eq!(runner.barrier(), Ok(vec![]));
    }

    #[test]
    fn synchronous_put_reports_its_own_failure() {
        let dht = MemoryDht::new();
        let runner = DhtRunner::new(dht.clone());
        let key = Id::random();

        dht.set_offline(true);
        assert_eq!(
            runner.put(key, record(Id::random(), 1)),
            Err(TransportError::Offline)
        );

        dht.set_offline(false);
        runner.put(key, record(Id::random(), 1)).unwrap();

        assert_eq!(runner.get(key, None).unwrap().len(), 1);
        // Synchronous failures are not left for the barrier.
        assert_eq!(runner.barrier(), Ok(vec![]));
    }

    #[test]
    fn shutdown() {
        let runner = DhtRunner::new(MemoryDht::new());
        let clone = runner.clone();

        clone.shutdown();

        assert_eq!(runner.get(Id::random(), None), Err(TransportError::Shutdown));
        assert!(!runner.is_connected());
    }
}

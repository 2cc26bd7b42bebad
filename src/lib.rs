#![doc = include_str!("../README.md")]

// Public modules
mod common;
mod error;
mod runner;

pub mod codec;
pub mod space;
pub mod storage;
pub mod transport;

pub use crate::common::{Atom, AtomType, Handle, Id, Record, RecordError, RecordKind, Value};
pub use bytes::Bytes;
pub use error::{DecodeError, Error, Result};
pub use runner::{DhtRunner, FailedWrite};
pub use space::AtomSpace;
pub use storage::{AtomStorage, BulkReport, Config, Stats, StorageBuilder};
pub use transport::{MemoryDht, Transport, TransportError};

pub use ed25519_dalek::SigningKey;

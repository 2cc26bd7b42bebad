//! Signed entries as they are stored on, and fetched from, the DHT.

use bytes::Bytes;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use super::{Id, ID_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
/// The logical family a record belongs to. Several families may share one key.
pub enum RecordKind {
    /// Canonical encoding of an atom, at its identity key.
    Atom = 4097,
    /// Announcement of an atom in a namespace, at the namespace key.
    Space = 4098,
    /// Association list of an atom, at its membership key.
    Values = 4099,
    /// Back pointer from a child to a parent, at the child's identity key.
    Incoming = 4100,
}

impl TryFrom<u16> for RecordKind {
    type Error = RecordError;

    fn try_from(value: u16) -> Result<Self, RecordError> {
        match value {
            4097 => Ok(RecordKind::Atom),
            4098 => Ok(RecordKind::Space),
            4099 => Ok(RecordKind::Values),
            4100 => Ok(RecordKind::Incoming),
            other => Err(RecordError::UnknownKind(other)),
        }
    }
}

impl From<RecordKind> for u16 {
    fn from(kind: RecordKind) -> u16 {
        kind as u16
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A single DHT entry.
///
/// A put replaces the record with the same `kind` and `id` under the same
/// key, unless the stored one has a greater `seq`.
pub struct Record {
    #[serde(rename = "y")]
    kind: RecordKind,
    #[serde(rename = "i", with = "serde_bytes")]
    id: [u8; ID_SIZE],
    /// Logical timestamp
    seq: i64,
    #[serde(rename = "v")]
    value: Bytes,
    /// ed25519 public key of the writer
    #[serde(rename = "k", with = "serde_bytes")]
    key: [u8; 32],
    #[serde(rename = "sig", with = "serde_bytes")]
    signature: [u8; 64],
}

impl Record {
    /// Create and sign a new record.
    pub fn new(signer: &SigningKey, kind: RecordKind, id: Id, seq: i64, value: Bytes) -> Self {
        let signable = encode_signable(kind, &id, seq, &value);
        let signature = signer.sign(&signable);

        Self {
            kind,
            id: id.0,
            seq,
            value,
            key: signer.verifying_key().to_bytes(),
            signature: signature.to_bytes(),
        }
    }

    /// Check the signature against the embedded public key.
    pub fn verify(&self) -> Result<(), RecordError> {
        let key = VerifyingKey::from_bytes(&self.key).map_err(|_| RecordError::InvalidPublicKey)?;
        let signature = Signature::from_bytes(&self.signature);

        key.verify(
            &encode_signable(self.kind, &self.id(), self.seq, &self.value),
            &signature,
        )
        .map_err(|_| RecordError::InvalidSignature)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Record, RecordError> {
        Ok(serde_bencode::from_bytes(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_bencode::to_bytes(self)?)
    }

    // === Getters ===

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn id(&self) -> Id {
        Id(self.id)
    }

    pub fn seq(&self) -> i64 {
        self.seq
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// A record with an empty payload marks deleted content.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }
}

pub fn encode_signable(kind: RecordKind, id: &Id, seq: i64, value: &[u8]) -> Box<[u8]> {
    let mut signable = vec![];

    signable.extend(format!("1:ii{}e2:id20:", u16::from(kind)).into_bytes());
    signable.extend(id.as_bytes());
    signable.extend(format!("3:seqi{}e1:v{}:", seq, value.len()).into_bytes());
    signable.extend(value);

    signable.into()
}

#[derive(thiserror::Error, Debug)]
/// Failures to decode or authenticate a record.
pub enum RecordError {
    #[error("Invalid record signature")]
    InvalidSignature,

    #[error("Invalid record public key")]
    InvalidPublicKey,

    #[error("Unknown record kind: {0}")]
    UnknownKind(u16),

    #[error("Failed to parse record bytes: {0}")]
    Bencode(#[from] serde_bencode::Error),
}

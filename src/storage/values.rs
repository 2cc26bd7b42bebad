//! Latest-wins association lists at the membership key.

use bytes::Bytes;
use tracing::debug;

use super::{stats::bump, AtomStorage};
use crate::{
    codec::decode_alist,
    common::{Handle, Id, Record, RecordKind},
    error::DecodeError,
    Error, Result,
};

impl AtomStorage {
    /// Write `blob` as this backend's association list at `key`, with a
    /// fresh timestamp. An empty blob is a tombstone.
    pub(crate) fn write_values(&self, key: Id, blob: Bytes, synchronous: bool) -> Result<()> {
        let seq = self.next_timestamp();

        self.put(
            key,
            self.record(RecordKind::Values, self.0.writer, seq, blob),
            synchronous,
        )?;

        bump(&self.0.counters.value_stores);

        Ok(())
    }

    /// The most recent association list at `key`, from any writer.
    pub(crate) fn latest_values(&self, key: Id) -> Result<Option<Record>> {
        Ok(self
            .fetch_records(key, RecordKind::Values)?
            .into_iter()
            .max_by_key(|record| (record.seq(), record.id())))
    }

    /// Replace the in-memory values of `handle` with the stored ones.
    ///
    /// Leaves memory untouched if nothing is stored or the stored list does
    /// not decode; clears it if the list was tombstoned.
    pub(crate) fn fetch_values(&self, handle: &Handle) -> Result<()> {
        let key = self.membership_key(handle);

        bump(&self.0.counters.value_fetches);

        let record = match self.latest_values(key)? {
            Some(record) => record,
            None => return Ok(()),
        };

        if record.is_tombstone() {
            self.0.space.set_values(handle, Vec::new());
            return Ok(());
        }

        let text = std::str::from_utf8(record.value()).map_err(|_| Error::Decode {
            key,
            source: DecodeError::MalformedValue {
                kind: "association list",
                text: String::from_utf8_lossy(record.value()).into_owned(),
            },
        })?;

        let pairs = decode_alist(text).map_err(|source| Error::Decode { key, source })?;

        debug!(?key, %handle, count = pairs.len(), "Fetched values");

        self.0.space.set_values(handle, pairs);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use bytes::Bytes;
    use ed25519_dalek::SigningKey;

    use crate::{
        common::{AtomType, Handle, Record, RecordKind, Value},
        space::AtomSpace,
        transport::{MemoryDht, Transport},
        AtomStorage, Error,
    };

    #[test]
    fn most_recent_writer_wins() {
        let mut dht = MemoryDht::new();
        let space = Arc::new(AtomSpace::new());
        let storage = AtomStorage::builder().build(space.clone(), dht.clone());

        let a = Handle::node(AtomType::CONCEPT_NODE, "a");
        let key = storage.membership_key(&a);

        for (seed, seq, blob) in [
            (1, 10, r#"(((PredicateNode "k") . (FloatValue 1)))"#),
            (2, 30, r#"(((PredicateNode "k") . (FloatValue 3)))"#),
            (3, 20, r#"(((PredicateNode "k") . (FloatValue 2)))"#),
        ]
        .iter()
        {
            let signer = SigningKey::from_bytes(&[*seed; 32]);
            let writer = crate::Id::digest(&[&signer.verifying_key().to_bytes()[..]]);
            let record = Record::new(
                &signer,
                RecordKind::Values,
                writer,
                *seq,
                Bytes::copy_from_slice(blob.as_bytes()),
            );
            dht.put(key, record).unwrap();
        }

        storage.fetch_values(&a).unwrap();

        assert_eq!(
            space.get_value(&a, &Handle::node(AtomType::PREDICATE_NODE, "k")),
            Some(Value::Float(vec![3.0]))
        );
    }

    #[test]
    fn malformed_values_leave_memory_untouched() {
        let mut dht = MemoryDht::new();
        let space = Arc::new(AtomSpace::new());
        let storage = AtomStorage::builder().build(space.clone(), dht.clone());

        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let k = Handle::node(AtomType::PREDICATE_NODE, "k");
        space.set_value(&a, k.clone(), Value::Float(vec![1.0]));

        let record = Record::new(
            &SigningKey::from_bytes(&[1; 32]),
            RecordKind::Values,
            crate::Id::random(),
            1,
            Bytes::from_static(br#"(((PredicateNode "k") . (FloatValue 1 x)))"#),
        );
        dht.put(storage.membership_key(&a), record).unwrap();

        assert!(matches!(
            storage.fetch_values(&a),
            Err(Error::Decode { .. })
        ));
        assert_eq!(space.get_value(&a, &k), Some(Value::Float(vec![1.0])));
    }
}

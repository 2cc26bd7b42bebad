//! Fetching and removing single atoms.

use tracing::{debug, trace};

use super::{stats::bump, AtomStorage};
use crate::{
    codec::{decode_atom, Cursor},
    common::{AtomType, Handle, Id, RecordKind},
    error::DecodeError,
    Error, Result,
};

impl AtomStorage {
    /// Fetch the node of `kind` named `name` and its values into the
    /// atomspace. Returns `None` if it was never stored.
    pub fn get_node(&self, kind: AtomType, name: &str) -> Result<Option<Handle>> {
        self.get_atom(Handle::node(kind, name))
    }

    /// Fetch the link of `kind` over `outgoing` and its values into the
    /// atomspace. Returns `None` if it was never stored.
    pub fn get_link(&self, kind: AtomType, outgoing: Vec<Handle>) -> Result<Option<Handle>> {
        self.get_atom(Handle::link(kind, outgoing))
    }

    fn get_atom(&self, handle: Handle) -> Result<Option<Handle>> {
        bump(&self.0.counters.get_atoms);

        let guid = self.identity_key(&handle);

        let exists = self
            .fetch_records(guid, RecordKind::Atom)?
            .iter()
            .any(|record| guid.validates_immutable(record.value()));

        if !exists {
            trace!(?guid, %handle, "Atom not found");
            return Ok(None);
        }

        if handle.is_node() {
            bump(&self.0.counters.got_nodes);
        } else {
            bump(&self.0.counters.got_links);
        }

        self.fetch_values(&handle)?;

        Ok(Some(self.0.space.add(handle)))
    }

    /// Decode the atom stored at `guid`, going through the decode cache.
    pub(crate) fn fetch_atom(&self, guid: Id) -> Result<Handle> {
        if let Some(handle) = self.0.decoded.lock().expect("mutex").get(&guid) {
            return Ok(handle.clone());
        }

        let record = self
            .fetch_records(guid, RecordKind::Atom)?
            .into_iter()
            .find(|record| {
                let valid = guid.validates_immutable(record.value());
                if !valid {
                    debug!(?guid, "Ignoring atom record not matching its key");
                }
                valid
            })
            .ok_or(Error::NotFound(guid))?;

        let text = std::str::from_utf8(record.value()).map_err(|_| Error::Decode {
            key: guid,
            source: DecodeError::MalformedAtom(
                String::from_utf8_lossy(record.value()).into_owned(),
            ),
        })?;

        let handle = decode_atom(&mut Cursor::new(text)).map_err(|source| Error::Decode {
            key: guid,
            source,
        })?;

        self.0
            .decoded
            .lock()
            .expect("mutex")
            .put(guid, handle.clone());

        Ok(handle)
    }

    /// Withdraw `handle` from the DHT: its atom record, its entry in the
    /// namespace, its values and the back pointers from its outgoing set.
    ///
    /// With `recursive`, children left without any incoming link are removed
    /// too. Returns `false` if there was no atom record to remove.
    pub fn remove(&self, handle: &Handle, recursive: bool) -> Result<bool> {
        self.check_writable()?;

        let guid = self.identity_key(handle);

        let removed = self.0.runner.remove(guid, RecordKind::Atom, guid)?;
        self.0
            .runner
            .remove(self.0.space_key, RecordKind::Space, guid)?;
        self.delete_atom_values(handle, true)?;

        for child in handle.outgoing() {
            self.remove_incoming_of(child, guid)?;

            if recursive {
                let orphan = self
                    .fetch_records(self.identity_key(child), RecordKind::Incoming)?
                    .is_empty();

                if orphan {
                    self.remove(child, true)?;
                }
            }
        }

        self.0.decoded.lock().expect("mutex").pop(&guid);
        self.0.published.lock().expect("mutex").remove(handle);

        if removed {
            bump(&self.0.counters.atom_removes);
            debug!(?guid, %handle, "Removed atom");
        }

        Ok(removed)
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
    fn get_missing_node() {
        let storage = AtomStorage::builder().build(Arc::new(AtomSpace::new()), MemoryDht::new());

        assert_eq!(
            storage.get_node(AtomType::CONCEPT_NODE, "nope").unwrap(),
            None
        );
        assert_eq!(storage.stats().get_atoms, 1);
        assert_eq!(storage.stats().got_nodes, 0);
    }

    #[test]
    fn get_link_with_values() {
        let dht = MemoryDht::new();
        let source = Arc::new(AtomSpace::new());
        let writer = AtomStorage::builder().build(source.clone(), dht.clone());

        let a = source.add_node(AtomType::CONCEPT_NODE, "a");
        let list = source.add_link(AtomType::LIST_LINK, vec![a.clone()]);
        let key = Handle::node(AtomType::PREDICATE_NODE, "k");
        source.set_value(&list, key.clone(), Value::String(vec!["v".into()]));
        writer.store(&list, true).unwrap();

        let space = Arc::new(AtomSpace::new());
        let reader = AtomStorage::builder().build(space.clone(), dht);

        let fetched = reader
            .get_link(AtomType::LIST_LINK, vec![a.clone()])
            .unwrap()
            .unwrap();

        assert_eq!(fetched, list);
        assert!(space.contains(&a));
        assert_eq!(
            space.get_value(&list, &key),
            Some(Value::String(vec!["v".into()]))
        );
        assert_eq!(reader.stats().got_links, 1);
    }

    #[test]
    fn atom_record_not_matching_its_key_is_ignored() {
        let mut dht = MemoryDht::new();
        let storage = AtomStorage::builder().build(Arc::new(AtomSpace::new()), dht.clone());

        let a = Handle::node(AtomType::CONCEPT_NODE, "a");
        let guid = storage.identity_key(&a);

        let forged = Record::new(
            &SigningKey::from_bytes(&[7; 32]),
            RecordKind::Atom,
            guid,
            0,
            Bytes::from_static(br#"(ConceptNode "b")"#),
        );
        dht.put(guid, forged).unwrap();

        assert_eq!(storage.get_node(AtomType::CONCEPT_NODE, "a").unwrap(), None);
        assert!(matches!(storage.fetch_atom(guid), Err(Error::NotFound(_))));
    }

    #[test]
    fn recursive_remove_only_removes_orphans() {
        let dht = MemoryDht::new();
        let space = Arc::new(AtomSpace::new());
        let storage = AtomStorage::builder().build(space.clone(), dht);

        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let b = space.add_node(AtomType::CONCEPT_NODE, "b");
        let ab = space.add_link(AtomType::LIST_LINK, vec![a.clone(), b.clone()]);
        let b_only = space.add_link(AtomType::LIST_LINK, vec![b.clone()]);

        storage.store(&ab, false).unwrap();
        storage.store(&b_only, true).unwrap();

        assert!(storage.remove(&ab, true).unwrap());

        assert_eq!(storage.get_node(AtomType::CONCEPT_NODE, "a").unwrap(), None);
        assert!(storage
            .get_node(AtomType::CONCEPT_NODE, "b")
            .unwrap()
            .is_some());
        assert_eq!(
            storage.get_link(AtomType::LIST_LINK, vec![a, b]).unwrap(),
            None
        );
        assert_eq!(storage.stats().atom_removes, 2);

        assert!(!storage.remove(&ab, false).unwrap());
    }
}

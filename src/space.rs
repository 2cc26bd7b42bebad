//! Minimal in-memory graph engine the storage backend loads into and stores
//! from.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    sync::RwLock,
};

use crate::common::{AtomType, Handle, Value};

type ExtractListener = Box<dyn Fn(&Handle) + Send + Sync>;

/// A thread safe set of atoms, their values and their incoming sets.
#[derive(Default)]
pub struct AtomSpace {
    atoms: RwLock<HashMap<Handle, Entry>>,
    listeners: RwLock<Vec<ExtractListener>>,
}

#[derive(Debug, Default)]
struct Entry {
    values: BTreeMap<Handle, Value>,
    incoming: HashSet<Handle>,
}

impl AtomSpace {
    pub fn new() -> Self {
        Self::default()
    }

    // === Atoms ===

    pub fn add_node(&self, kind: AtomType, name: impl Into<String>) -> Handle {
        self.add(Handle::node(kind, name))
    }

    pub fn add_link(&self, kind: AtomType, outgoing: Vec<Handle>) -> Handle {
        self.add(Handle::link(kind, outgoing))
    }

    /// Insert `handle` and, recursively, its outgoing set. Registers `handle`
    /// in the incoming set of each of its children.
    ///
    /// Returns the resident handle, which compares equal to `handle`.
    pub fn add(&self, handle: Handle) -> Handle {
        let mut atoms = self.atoms.write().expect("atomspace lock");
        insert(&mut atoms, handle)
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.atoms
            .read()
            .expect("atomspace lock")
            .contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.atoms.read().expect("atomspace lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every atom.
    pub fn atoms(&self) -> Vec<Handle> {
        let mut atoms: Vec<Handle> = self
            .atoms
            .read()
            .expect("atomspace lock")
            .keys()
            .cloned()
            .collect();
        atoms.sort();
        atoms
    }

    /// Remove `handle` from memory. Fails if it still has an incoming set,
    /// unless `recursive`, in which case its incoming set goes first.
    ///
    /// Extract listeners are called for every atom removed.
    pub fn extract(&self, handle: &Handle, recursive: bool) -> bool {
        let mut extracted = Vec::new();

        {
            let mut atoms = self.atoms.write().expect("atomspace lock");
            if !remove(&mut atoms, handle, recursive, &mut extracted) {
                return false;
            }
        }

        let listeners = self.listeners.read().expect("atomspace lock");
        for handle in &extracted {
            for listener in listeners.iter() {
                listener(handle);
            }
        }

        true
    }

    /// Register a callback invoked after an atom was extracted.
    pub fn on_extract<F>(&self, listener: F)
    where
        F: Fn(&Handle) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .expect("atomspace lock")
            .push(Box::new(listener));
    }

    // === Values ===

    /// Keys of the values attached to `handle`, in key order.
    pub fn get_keys(&self, handle: &Handle) -> Vec<Handle> {
        self.atoms
            .read()
            .expect("atomspace lock")
            .get(handle)
            .map(|e| e.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_value(&self, handle: &Handle, key: &Handle) -> Option<Value> {
        self.atoms
            .read()
            .expect("atomspace lock")
            .get(handle)
            .and_then(|e| e.values.get(key).cloned())
    }

    /// Every (key, value) pair of `handle`, in key order.
    pub fn values(&self, handle: &Handle) -> Vec<(Handle, Value)> {
        self.atoms
            .read()
            .expect("atomspace lock")
            .get(handle)
            .map(|e| {
                e.values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attach `value` under `key`, adding both atoms if needed.
    pub fn set_value(&self, handle: &Handle, key: Handle, value: Value) {
        let mut atoms = self.atoms.write().expect("atomspace lock");
        let key = insert(&mut atoms, key);
        let handle = insert(&mut atoms, handle.clone());

        if let Some(entry) = atoms.get_mut(&handle) {
            entry.values.insert(key, value);
        }
    }

    /// Replace every value of `handle` with `pairs`.
    pub fn set_values(&self, handle: &Handle, pairs: Vec<(Handle, Value)>) {
        let mut atoms = self.atoms.write().expect("atomspace lock");
        let handle = insert(&mut atoms, handle.clone());

        let mut values = BTreeMap::new();
        for (key, value) in pairs {
            values.insert(insert(&mut atoms, key), value);
        }

        if let Some(entry) = atoms.get_mut(&handle) {
            entry.values = values;
        }
    }

    pub fn remove_value(&self, handle: &Handle, key: &Handle) -> Option<Value> {
        self.atoms
            .write()
            .expect("atomspace lock")
            .get_mut(handle)
            .and_then(|e| e.values.remove(key))
    }

    // === Incoming sets ===

    pub fn incoming_set(&self, handle: &Handle) -> Vec<Handle> {
        let mut incoming: Vec<Handle> = self
            .atoms
            .read()
            .expect("atomspace lock")
            .get(handle)
            .map(|e| e.incoming.iter().cloned().collect())
            .unwrap_or_default();
        incoming.sort();
        incoming
    }
}

fn insert(atoms: &mut HashMap<Handle, Entry>, handle: Handle) -> Handle {
    if let Some((resident, _)) = atoms.get_key_value(&handle) {
        return resident.clone();
    }

    let outgoing: Vec<Handle> = handle
        .outgoing()
        .iter()
        .map(|child| insert(atoms, child.clone()))
        .collect();

    for child in &outgoing {
        if let Some(entry) = atoms.get_mut(child) {
            entry.incoming.insert(handle.clone());
        }
    }

    atoms.insert(handle.clone(), Entry::default());
    handle
}

fn remove(
    atoms: &mut HashMap<Handle, Entry>,
    handle: &Handle,
    recursive: bool,
    extracted: &mut Vec<Handle>,
) -> bool {
    let incoming: Vec<Handle> = match atoms.get(handle) {
        Some(entry) => entry.incoming.iter().cloned().collect(),
        None => return false,
    };

    if !incoming.is_empty() {
        if !recursive {
            return false;
        }
        for parent in &incoming {
            remove(atoms, parent, true, extracted);
        }
    }

    for child in handle.outgoing() {
        if let Some(entry) = atoms.get_mut(child) {
            entry.incoming.remove(handle);
        }
    }

    if atoms.remove(handle).is_some() {
        extracted.push(handle.clone());
    }

    true
}

impl Debug for AtomSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomSpace")
            .field("atoms", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn links_register_incoming() {
        let space = AtomSpace::new();
        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let b = Handle::node(AtomType::CONCEPT_NODE, "b");
        let list = space.add_link(AtomType::LIST_LINK, vec![a.clone(), b.clone()]);

        assert!(space.contains(&b));
        assert_eq!(space.len(), 3);
        assert_eq!(space.incoming_set(&a), vec![list.clone()]);
        assert_eq!(space.incoming_set(&b), vec![list]);
    }

    #[test]
    fn values() {
        let space = AtomSpace::new();
        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let key = Handle::node(AtomType::PREDICATE_NODE, "k");

        space.set_value(&a, key.clone(), Value::Float(vec![1.0]));
        assert!(space.contains(&key));
        assert_eq!(space.get_keys(&a), vec![key.clone()]);
        assert_eq!(space.get_value(&a, &key), Some(Value::Float(vec![1.0])));

        space.set_values(&a, vec![]);
        assert!(space.get_keys(&a).is_empty());

        space.set_value(&a, key.clone(), Value::String(vec!["s".into()]));
        assert_eq!(
            space.remove_value(&a, &key),
            Some(Value::String(vec!["s".into()]))
        );
    }

    #[test]
    fn extract() {
        let space = AtomSpace::new();
        let a = space.add_node(AtomType::CONCEPT_NODE, "a");
        let list = space.add_link(AtomType::LIST_LINK, vec![a.clone()]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let clone = seen.clone();
        space.on_extract(move |h| clone.lock().unwrap().push(h.clone()));

        assert!(!space.extract(&a, false));
        assert!(space.extract(&a, true));

        assert!(space.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec![list, a]);
    }
}

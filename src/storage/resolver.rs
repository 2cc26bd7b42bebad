//! Maps atoms to the DHT keys they are stored under.

use std::{collections::HashMap, sync::Mutex};

use crate::common::{Handle, Id};

#[derive(Debug)]
/// Memoizes the identity key (content address of the canonical encoding)
/// and the membership key (identity within one namespace) of every atom.
///
/// Keys are computed under the lock, so each is computed once and every
/// caller observes the same value. Lock order is memberships, identities.
pub(crate) struct Resolver {
    space_key: Id,
    identities: Mutex<HashMap<Handle, Id>>,
    memberships: Mutex<HashMap<Handle, Id>>,
}

impl Resolver {
    pub fn new(space_key: Id) -> Self {
        Self {
            space_key,
            identities: Mutex::new(HashMap::new()),
            memberships: Mutex::new(HashMap::new()),
        }
    }

    /// Key of the atom record, the same for every namespace.
    pub fn identity_key(&self, handle: &Handle) -> Id {
        let mut identities = self.identities.lock().expect("mutex");

        *identities
            .entry(handle.clone())
            .or_insert_with(|| Id::for_immutable(handle.to_short_string().as_bytes()))
    }

    /// Key of the values of the atom within this namespace.
    pub fn membership_key(&self, handle: &Handle) -> Id {
        let mut memberships = self.memberships.lock().expect("mutex");

        if let Some(key) = memberships.get(handle) {
            return *key;
        }

        let guid = self.identity_key(handle);
        let key = Id::digest(&[&self.space_key.as_bytes()[..], &guid.as_bytes()[..]]);
        memberships.insert(handle.clone(), key);

        key
    }

    pub fn forget(&self, handle: &Handle) {
        self.memberships.lock().expect("mutex").remove(handle);
        self.identities.lock().expect("mutex").remove(handle);
    }

    pub fn clear(&self) {
        self.memberships.lock().expect("mutex").clear();
        self.identities.lock().expect("mutex").clear();
    }
}

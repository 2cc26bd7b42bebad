use std::sync::Arc;

use ed25519_dalek::SigningKey;

use super::AtomStorage;
use crate::{space::AtomSpace, transport::Transport};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default number of decoded atoms kept per backend.
pub const DEFAULT_DECODE_CACHE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
/// Storage backend configurations
pub struct Config {
    /// Name of the atomspace this backend publishes into and loads from.
    ///
    /// Backends sharing a namespace see each other's atoms in
    /// [AtomStorage::load_all]. Values are scoped to the namespace too.
    ///
    /// Defaults to [DEFAULT_NAMESPACE]
    pub namespace: String,
    /// Observe only: every write side operation fails with
    /// [crate::Error::ReadOnlyViolation] before touching the network.
    ///
    /// Defaults to false
    pub read_only: bool,
    /// Key used to sign every written record.
    ///
    /// Defaults to None, where a random key is generated.
    pub signing_key: Option<SigningKey>,
    /// Capacity of the cache of decoded atom records.
    ///
    /// Defaults to [DEFAULT_DECODE_CACHE_SIZE]
    pub decode_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            read_only: false,
            signing_key: None,
            decode_cache_size: DEFAULT_DECODE_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct StorageBuilder(Config);

impl StorageBuilder {
    /// Set [Config::namespace]
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        self.0.namespace = namespace.to_string();

        self
    }

    /// Set [Config::read_only]
    pub fn read_only(&mut self) -> &mut Self {
        self.0.read_only = true;

        self
    }

    /// Set [Config::signing_key]
    pub fn signing_key(&mut self, signing_key: SigningKey) -> &mut Self {
        self.0.signing_key = Some(signing_key);

        self
    }

    /// Set [Config::decode_cache_size]
    pub fn decode_cache_size(&mut self, size: usize) -> &mut Self {
        self.0.decode_cache_size = size;

        self
    }

    /// Create an [AtomStorage] loading into and storing from `space`, on top
    /// of `transport`.
    pub fn build<T: Transport>(&self, space: Arc<AtomSpace>, transport: T) -> AtomStorage {
        AtomStorage::new(self.0.clone(), space, transport)
    }
}

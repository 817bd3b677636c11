//! In-memory storage adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] on a namespaced
//! `HashMap`.  Used by the host binary and the tests; a flash or database
//! backend implements the same two traits.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Namespace isolation: each subsystem uses its own namespace prefix.
//! - Atomic writes: a value is replaced as a whole under one borrow.

use std::cell::RefCell;
use std::collections::HashMap;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::SystemConfig;

const CONFIG_NAMESPACE: &str = "trafficpilot";
const CONFIG_KEY: &str = "syscfg";

/// Largest blob accepted by [`StoragePort::write`].
const MAX_BLOB_SIZE: usize = 4000;

#[derive(Debug, Default)]
pub struct MemoryStore {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("MemoryStore: in-memory backend");
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Number of stored keys across all namespaces.
    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        match self.store.borrow().get(&key) {
            Some(bytes) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                cfg.validate()?;
                info!("MemoryStore: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("MemoryStore: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.store.borrow_mut().insert(key, bytes);
        info!("MemoryStore: config saved");
        Ok(())
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.store.borrow();
        let value = store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        if value.len() > buf.len() {
            warn!("MemoryStore: {namespace}::{key} larger than read buffer");
            return Err(StorageError::Full);
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}

//! In-memory [`FieldStore`].
//!
//! Stands in for the hosted key-value database.  Counts writes so tests
//! can check that status publishing is idempotent.

use std::collections::BTreeMap;

use crate::app::ports::{FieldError, FieldStore};
use crate::fields::FieldValue;

#[derive(Debug, Default)]
pub struct MemoryFieldStore {
    fields: BTreeMap<String, FieldValue>,
    writes: usize,
    /// Simulates a transport outage.
    offline: bool,
}

impl MemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a field without counting it as a controller write.
    pub fn set(&mut self, path: &str, value: FieldValue) {
        self.fields.insert(path.to_owned(), value);
    }

    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.fields.get(path)
    }

    /// Writes accepted through [`FieldStore::write`].
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }
}

impl FieldStore for MemoryFieldStore {
    fn read(&self, path: &str) -> Result<FieldValue, FieldError> {
        if self.offline {
            return Err(FieldError::Unavailable);
        }
        self.fields.get(path).cloned().ok_or(FieldError::NotFound)
    }

    fn write(&mut self, path: &str, value: FieldValue) -> Result<(), FieldError> {
        if self.offline {
            return Err(FieldError::Unavailable);
        }
        self.fields.insert(path.to_owned(), value);
        self.writes += 1;
        Ok(())
    }
}

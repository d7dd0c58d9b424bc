#![allow(dead_code)]
//! Record store seam consumed by the bulk importer.
//!
//! The real site persists through its own data layer; the importer only
//! needs `create` (and `find` for verification), so that is the whole
//! contract. [`MemoryStore`] backs tests and local runs.

use crate::property::PropertyRecord;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// External record store. Each `create` is an independent record creation;
/// import runs are pure appends, never updates.
#[async_trait::async_trait]
pub trait PropertyStore: Send + Sync {
    /// Persist a new record, returning its generated identifier.
    async fn create(&self, record: PropertyRecord) -> Result<String>;

    /// Look up a previously created record by identifier.
    async fn find(&self, id: &str) -> Result<Option<PropertyRecord>>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, PropertyRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl PropertyStore for MemoryStore {
    async fn create(&self, record: PropertyRecord) -> Result<String> {
        let id = format!("prop_{}", Uuid::new_v4().simple());
        self.inner.write().unwrap().insert(id.clone(), record);
        Ok(id)
    }

    async fn find(&self, id: &str) -> Result<Option<PropertyRecord>> {
        Ok(self.inner.read().unwrap().get(id).cloned())
    }
}

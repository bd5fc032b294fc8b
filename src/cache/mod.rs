//! Container handle caching.
//!
//! This module provides the `ContainerCache`, a name-keyed map of resolved
//! container handles. Entries are populated lazily on first successful
//! lookup, with at most one in-flight resolution per key; concurrent
//! requesters for the same key share the result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::api::SwiftError;

/// A resolved handle to a named collection of stored objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub bytes_used: u64,
    pub object_count: u64,
}

/// Name-keyed cache of container handles, one instance per account.
///
/// The cache itself has no enable flag; the account decides whether to
/// consult it at all, so a disabled period can never serve entries left
/// over from an enabled one.
#[derive(Debug, Default)]
pub struct ContainerCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Container>>>>,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, name: &str) -> Arc<OnceCell<Container>> {
        let mut entries = self.entries.lock();
        entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Return the cached handle for `name`, resolving it at most once. A
    /// failed resolution leaves the slot empty so a later lookup retries.
    pub async fn get_or_resolve<F, Fut>(&self, name: &str, resolve: F) -> Result<Container, SwiftError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Container, SwiftError>>,
    {
        let cell = self.cell(name);
        cell.get_or_try_init(resolve).await.cloned()
    }

    /// Drop every entry unconditionally.
    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

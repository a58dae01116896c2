//! Mock registry implementation for testing.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::ResolveError;
use crate::registry::{DocumentIdentity, Registry};

/// In-memory registry serving canned records.
///
/// Every lookup is recorded, including misses.
#[derive(Debug, Default)]
pub struct MockRegistry {
    records: RwLock<HashMap<String, DocumentIdentity>>,
    lookups: RwLock<Vec<String>>,
}

impl MockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `identity` for lookups of `name`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_record(self, name: &str, identity: DocumentIdentity) -> Self {
        self.records
            .write()
            .unwrap()
            .insert(name.to_owned(), identity);
        self
    }

    /// Serve a revision record: `name-rev` with its content URL and predecessor.
    #[must_use]
    pub fn with_revision(self, lookup: &str, name: &str, rev: &str, previous: Option<&str>) -> Self {
        let identity = DocumentIdentity {
            name: Some(name.to_owned()),
            rev: Some(rev.to_owned()),
            content_url: Some(content_url(name, rev)),
            previous: previous.map(str::to_owned),
            previous_url: previous.map(|p| format!("https://www.ietf.org/archive/id/{p}.txt")),
        };
        self.with_record(lookup, identity)
    }

    /// Names looked up so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.read().unwrap().clone()
    }
}

impl Registry for MockRegistry {
    fn lookup(&self, name: &str) -> Result<Option<DocumentIdentity>, ResolveError> {
        self.lookups.write().unwrap().push(name.to_owned());
        Ok(self.records.read().unwrap().get(name).cloned())
    }
}

/// Content URL [`MockRegistry::with_revision`] assigns to `name-rev`.
#[must_use]
pub fn content_url(name: &str, rev: &str) -> String {
    if rev.is_empty() {
        format!("https://www.rfc-editor.org/rfc/{name}.txt")
    } else {
        format!("https://www.ietf.org/archive/id/{name}-{rev}.txt")
    }
}

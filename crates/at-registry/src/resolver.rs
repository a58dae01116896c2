//! Resolution of document names to content URLs.
//!
//! A lookup can carry the revision the caller already has. When the
//! registry's latest revision is that same one, the caller wants something
//! to compare against, so the resolver walks back through `previous`
//! until it reaches a different document.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::registry::{DocumentIdentity, Registry};

/// Upper bound on `previous` hops in one resolution.
pub const MAX_WALK_HOPS: usize = 16;

/// Where a resolution ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Content URL of the resolved document.
    pub content_url: String,
    /// True when the resolved document precedes the caller's revision.
    pub walked_back: bool,
}

/// Resolves names through a [`Registry`].
pub struct Resolver {
    registry: Arc<dyn Registry>,
}

impl Resolver {
    #[must_use]
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Content URL of the latest document in `name`'s lineage.
    ///
    /// With `original`, a latest revision equal to `original` resolves to
    /// its predecessor instead.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DocumentNotFound`] when a record or one of
    /// its fields is missing and [`ResolveError::WalkTooDeep`] when the
    /// walk revisits a name or exceeds [`MAX_WALK_HOPS`].
    pub fn resolve_latest(&self, name: &str, original: Option<&str>) -> Result<String, ResolveError> {
        Ok(self.lookup_latest(name, original)?.content_url)
    }

    /// Like [`Resolver::resolve_latest`], also reporting whether the walk
    /// stepped back.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_latest`].
    pub fn lookup_latest(&self, name: &str, original: Option<&str>) -> Result<Resolution, ResolveError> {
        let mut current = name.to_owned();
        let mut visited = HashSet::new();
        let mut walked_back = false;

        for _ in 0..=MAX_WALK_HOPS {
            if !visited.insert(current.clone()) {
                break;
            }

            let identity = self.fetch(&current, "Can not find the latest document on datatracker")?;
            let content_url = identity.content_url.clone().ok_or_else(|| {
                tracing::error!(name = %current, "Registry record has no content_url");
                not_found("Can not find url for the latest document on datatracker")
            })?;

            let Some(original) = original else {
                return Ok(Resolution { content_url, walked_back });
            };
            if identity.revision_name().as_deref() != Some(original) {
                return Ok(Resolution { content_url, walked_back });
            }

            current = previous_name(identity)?;
            walked_back = true;
            tracing::debug!(%original, previous = %current, "Requested revision is the latest, walking back");
        }

        tracing::error!(%name, "Revision walk did not settle");
        Err(ResolveError::WalkTooDeep {
            name: name.to_owned(),
            limit: MAX_WALK_HOPS,
        })
    }

    /// Content URL of the document preceding `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DocumentNotFound`] when `name` or its
    /// predecessor is unknown.
    pub fn resolve_previous(&self, name: &str) -> Result<String, ResolveError> {
        let identity = self.fetch(name, "Can not find the previous document on datatracker")?;
        let previous = previous_name(identity)?;
        self.resolve_latest(&previous, None)
    }

    /// `(previous_url, content_url)` of `name` from a single lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DocumentNotFound`] when the record or either
    /// URL is missing.
    pub fn resolve_both(&self, name: &str) -> Result<(String, String), ResolveError> {
        let identity = self.fetch(name, "Can not find the latest document on datatracker")?;
        let latest = identity
            .content_url
            .ok_or_else(|| not_found("Can not find url for the latest document on datatracker"))?;
        let previous = identity
            .previous_url
            .ok_or_else(|| not_found("Can not find url for previous document on datatracker"))?;
        Ok((previous, latest))
    }

    fn fetch(&self, name: &str, missing: &str) -> Result<DocumentIdentity, ResolveError> {
        self.registry.lookup(name)?.ok_or_else(|| {
            tracing::error!(%name, "Can not find document on registry");
            not_found(missing)
        })
    }
}

fn previous_name(identity: DocumentIdentity) -> Result<String, ResolveError> {
    identity
        .previous
        .filter(|previous| !previous.is_empty())
        .ok_or_else(|| not_found("Can not find url for the previous document on datatracker"))
}

fn not_found(message: &str) -> ResolveError {
    ResolveError::DocumentNotFound(message.to_owned())
}

//! Datatracker registry client.

use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;

use crate::error::ResolveError;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Registry record for one document.
///
/// Only the fields the resolver uses are kept; the registry sends more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
    /// Where the text of this revision can be fetched.
    #[serde(default)]
    pub content_url: Option<String>,
    /// Name (with revision) of the preceding document.
    #[serde(default)]
    pub previous: Option<String>,
    /// Where the text of the preceding document can be fetched.
    #[serde(default)]
    pub previous_url: Option<String>,
}

impl DocumentIdentity {
    /// `name-rev`, or just `name` for documents without revisions.
    #[must_use]
    pub fn revision_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match self.rev.as_deref() {
            Some(rev) if !rev.is_empty() => format!("{name}-{rev}"),
            _ => name.to_owned(),
        })
    }
}

/// Source of document records.
pub trait Registry: Send + Sync {
    /// Look up `name`.
    ///
    /// Returns `Ok(None)` when the registry has no record.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Http`] when the registry cannot be reached.
    fn lookup(&self, name: &str) -> Result<Option<DocumentIdentity>, ResolveError>;
}

/// Registry backed by the datatracker `rfcdiff-latest-json` API.
pub struct HttpRegistry {
    agent: Agent,
    base_url: String,
}

impl HttpRegistry {
    /// Create a client for `base_url`.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            agent: http_agent(timeout),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn document_url(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }
}

impl Registry for HttpRegistry {
    fn lookup(&self, name: &str) -> Result<Option<DocumentIdentity>, ResolveError> {
        let url = self.document_url(name);
        tracing::debug!(%url, "Querying registry");

        let response = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        if status != 200 {
            tracing::info!(%url, status, "Registry has no record");
            return Ok(None);
        }

        match response.into_body().read_json::<DocumentIdentity>() {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "Unreadable registry record");
                Ok(None)
            }
        }
    }
}

/// Agent that reports HTTP error statuses as responses.
///
/// Redirects are returned rather than followed so that every host contacted
/// has passed URL validation.
pub(crate) fn http_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .max_redirects(0)
        .build()
        .into()
}

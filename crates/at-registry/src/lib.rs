//! Document resolution against the IETF datatracker.
//!
//! Turns document names, URLs and uploads into files in the scratch area:
//!
//! - [`Resolver`] maps names to content URLs through a [`Registry`],
//!   walking back through revisions when asked for a counterpart
//! - [`validate_url`] keeps caller-supplied URLs on an allow-list
//! - [`Downloader`] fetches documents into fresh scratch directories
//! - [`DocumentFetcher`] ties these together for a [`SourceDocument`]
//! - [`ApiKeyVerifier`] checks API keys with the datatracker
//!
//! Testing support ([`MockRegistry`]) is behind the `mock` feature.

mod auth;
mod download;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod names;
mod registry;
mod resolver;
mod source;
#[cfg(test)]
mod test_server;
mod url;

pub use auth::ApiKeyVerifier;
pub use download::Downloader;
pub use error::{AuthError, ResolveError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRegistry, content_url};
pub use names::{get_name, get_name_with_revision};
pub use registry::{DEFAULT_TIMEOUT, DocumentIdentity, HttpRegistry, Registry};
pub use resolver::{MAX_WALK_HOPS, Resolution, Resolver};
pub use source::{Counterpart, DocumentFetcher, SourceDocument};
pub use url::{is_url, validate_url};

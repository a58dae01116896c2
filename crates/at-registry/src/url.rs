//! URL allow-listing.
//!
//! Caller-supplied URLs are fetched server-side, so only http(s) URLs whose
//! registrable domain is on the allow-list get through.

use ureq::http::Uri;

use crate::error::ResolveError;

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Check that `url` may be fetched.
///
/// The domain check compares the last two labels of the whole authority,
/// so an explicit port makes the URL fail the check.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidUrl`] when the URL does not parse, has a
/// scheme other than http or https, or points outside `allowed_domains`.
pub fn validate_url(url: &str, allowed_domains: &[String]) -> Result<(), ResolveError> {
    let uri: Uri = url.parse().map_err(|e| {
        tracing::info!(%url, error = %e, "Invalid URL");
        ResolveError::InvalidUrl(format!("Invalid URL: {url}"))
    })?;

    let scheme = uri.scheme_str().unwrap_or_default();
    if !ALLOWED_SCHEMES.contains(&scheme) {
        tracing::info!(%url, "URL scheme is not allowed");
        return Err(ResolveError::InvalidUrl(format!("{scheme} scheme is not allowed.")));
    }

    let authority = uri.authority().map(|a| a.as_str().to_lowercase()).unwrap_or_default();
    let domain = registrable_domain(&authority);
    if !allowed_domains.iter().any(|allowed| allowed.eq_ignore_ascii_case(&domain)) {
        tracing::info!(%url, "URL domain is not allowed");
        return Err(ResolveError::InvalidUrl(format!("{authority} domain is not allowed.")));
    }

    Ok(())
}

/// Whether `value` looks like a URL (scheme and host both present).
#[must_use]
pub fn is_url(value: &str) -> bool {
    value.parse::<Uri>().is_ok_and(|uri| {
        uri.scheme_str().is_some() && uri.authority().is_some_and(|a| !a.as_str().is_empty())
    })
}

fn registrable_domain(authority: &str) -> String {
    let labels: Vec<&str> = authority.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

//! API key verification against the datatracker.

use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;

use crate::error::AuthError;
use crate::registry::http_agent;

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    #[serde(default)]
    success: bool,
}

/// Checks API keys with a single form POST.
pub struct ApiKeyVerifier {
    agent: Agent,
    url: String,
}

impl ApiKeyVerifier {
    #[must_use]
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            agent: http_agent(timeout),
            url: url.to_owned(),
        }
    }

    /// Verify `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Missing`] for an absent or blank key,
    /// [`AuthError::Invalid`] unless the endpoint answers 200 with
    /// `{"success": true}`, and [`AuthError::Http`] when it is unreachable.
    pub fn verify(&self, key: Option<&str>) -> Result<(), AuthError> {
        let key = key.map(str::trim).filter(|k| !k.is_empty()).ok_or_else(|| {
            tracing::error!("Missing API key");
            AuthError::Missing
        })?;

        let response = self.agent.post(&self.url).send_form([("apikey", key)])?;
        let status = response.status().as_u16();
        let accepted = status == 200
            && response
                .into_body()
                .read_json::<VerificationResponse>()
                .is_ok_and(|r| r.success);

        if accepted {
            tracing::debug!("Valid API key");
            Ok(())
        } else {
            tracing::error!(status, "Invalid API key");
            Err(AuthError::Invalid)
        }
    }
}

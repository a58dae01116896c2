//! Downloading documents into the scratch area.

use std::fs;
use std::time::Duration;

use at_pipeline::{ScratchArea, ScratchError, WorkingFile};
use ureq::Agent;
use ureq::http::Uri;

use crate::error::ResolveError;
use crate::registry::http_agent;

const DOWNLOAD_FAILED: &str = "Error occurred while downloading file.";

/// Fetches documents over HTTP.
pub struct Downloader {
    agent: Agent,
}

impl Downloader {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: http_agent(timeout),
        }
    }

    /// Download `url` into a fresh scratch directory.
    ///
    /// The file is named after the last path segment of the URL.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Download`] when no filename can be derived
    /// from the URL, the request fails, or the server answers with
    /// anything but 200.
    pub fn fetch_url_to_file(
        &self,
        url: &str,
        scratch: &ScratchArea,
    ) -> Result<WorkingFile, ResolveError> {
        let filename = url_filename(url);
        let path = scratch.allocate(&filename).map_err(|e| match e {
            ScratchError::InvalidFilename(_) => {
                ResolveError::Download(format!("Can not determine the filename: {url}"))
            }
            other => ResolveError::Scratch(other),
        })?;

        tracing::debug!(%url, file = %path.display(), "Downloading");
        let response = self.agent.get(url).call().map_err(|e| {
            tracing::error!(%url, error = %e, "Download failed");
            ResolveError::Download(DOWNLOAD_FAILED.to_owned())
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            tracing::error!(%url, status, "Download failed");
            return Err(ResolveError::Download(DOWNLOAD_FAILED.to_owned()));
        }

        let bytes = response.into_body().read_to_vec().map_err(|e| {
            tracing::error!(%url, error = %e, "Download failed");
            ResolveError::Download(DOWNLOAD_FAILED.to_owned())
        })?;
        fs::write(&path, bytes)?;

        tracing::info!(%url, file = %path.display(), "Downloaded");
        Ok(WorkingFile::new(path))
    }
}

fn url_filename(url: &str) -> String {
    let path = url
        .parse::<Uri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_owned()
}

//! Shared state for one CLI invocation.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use at_config::{CliSettings, Config, ToolsConfig};
use at_pipeline::{ScratchArea, Tool, Toolchain, UploadPurpose, WorkingFile};
use at_registry::{ApiKeyVerifier, DocumentFetcher, Downloader, HttpRegistry, SourceDocument};

use crate::GlobalArgs;
use crate::error::CliError;

/// Configuration, toolchain and document fetcher for a command.
pub(crate) struct Context {
    pub(crate) toolchain: Toolchain,
    pub(crate) fetcher: DocumentFetcher,
}

impl Context {
    /// Load configuration and check the API key when verification is configured.
    pub(crate) fn new(global: &GlobalArgs) -> Result<Self, CliError> {
        let settings = CliSettings {
            scratch_dir: global.scratch_dir.clone(),
            ..Default::default()
        };
        let config = Config::load(global.config.as_deref(), Some(&settings))?;
        tracing::debug!(
            config = ?config.config_path,
            scratch = %config.scratch_resolved.dir.display(),
            "Loaded configuration"
        );
        let http_timeout = Duration::from_secs(config.registry.timeout_secs);

        if let Some(auth_url) = &config.registry.auth_url {
            ApiKeyVerifier::new(auth_url, http_timeout).verify(global.api_key.as_deref())?;
        }

        let registry = HttpRegistry::new(&config.registry.latest_url, http_timeout);
        let fetcher = DocumentFetcher::new(
            Arc::new(registry),
            Downloader::new(http_timeout),
            ScratchArea::new(&config.scratch_resolved.dir),
            config.security.allowed_domains.clone(),
        );

        Ok(Self {
            toolchain: toolchain(&config.tools),
            fetcher,
        })
    }

    /// Materialize a local file.
    pub(crate) fn upload(&self, path: &Path, purpose: UploadPurpose) -> Result<WorkingFile, CliError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = SourceDocument::Upload {
            filename,
            bytes: fs::read(path)?,
        };
        Ok(self.fetcher.materialize(&source, purpose)?)
    }

    /// Materialize a local path, URL or document name.
    pub(crate) fn source(&self, reference: &str) -> Result<WorkingFile, CliError> {
        let path = Path::new(reference);
        if path.is_file() {
            return self.upload(path, UploadPurpose::Document);
        }
        let source = SourceDocument::from_reference(reference);
        Ok(self.fetcher.materialize(&source, UploadPurpose::Document)?)
    }
}

fn toolchain(tools: &ToolsConfig) -> Toolchain {
    let mut toolchain = Toolchain::system()
        .with_timeout(Duration::from_secs(tools.timeout_secs))
        .with_diff_timeout(Duration::from_secs(tools.diff_timeout_secs));
    for (key, program) in tools.programs.overrides() {
        if let Some(tool) = Tool::from_key(key) {
            toolchain = toolchain.with_program(tool, program);
        }
    }
    toolchain
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_config::ProgramsConfig;
    use at_pipeline::{MockRunner, ProcessOutput, svgcheck};
    use at_registry::MockRegistry;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn context(scratch: &TempDir, runner: &Arc<MockRunner>, registry: &Arc<MockRegistry>) -> Context {
        Context {
            toolchain: MockRunner::toolchain(runner),
            fetcher: DocumentFetcher::new(
                Arc::<MockRegistry>::clone(registry),
                Downloader::new(Duration::from_secs(5)),
                ScratchArea::new(scratch.path()),
                vec!["ietf.org".to_owned()],
            ),
        }
    }

    #[test]
    fn test_toolchain_from_config() {
        let tools = ToolsConfig {
            timeout_secs: 30,
            diff_timeout_secs: 5,
            programs: ProgramsConfig {
                kramdown: Some("/opt/kramdown/bin/kramdown-rfc".to_owned()),
                ..Default::default()
            },
        };

        let toolchain = toolchain(&tools);

        assert_eq!(toolchain.timeout(), Duration::from_secs(30));
        assert_eq!(toolchain.diff_timeout(), Duration::from_secs(5));
        assert_eq!(toolchain.program(Tool::Kramdown), "/opt/kramdown/bin/kramdown-rfc");
        assert_eq!(toolchain.program(Tool::Mmark), "mmark");
    }

    #[test]
    fn test_upload_is_checked_from_scratch() {
        let scratch = TempDir::new().unwrap();
        let input = TempDir::new().unwrap();
        let path = input.path().join("figure.svg");
        fs::write(&path, "<svg/>").unwrap();
        let runner = Arc::new(MockRunner::new().with_output("svgcheck", ProcessOutput::exited(0, "", "")));
        let registry = Arc::new(MockRegistry::new());
        let ctx = context(&scratch, &runner, &registry);

        let svg = ctx.upload(&path, UploadPurpose::Svg).unwrap();
        let report = svgcheck(&ctx.toolchain, &svg).unwrap();

        assert!(report.passed);
        assert!(svg.path().starts_with(scratch.path()));
        assert!(runner.invoked("svgcheck"));
        assert!(registry.lookups().is_empty());
    }

    #[test]
    fn test_source_name_goes_to_registry() {
        let scratch = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new());
        let registry = Arc::new(MockRegistry::new());
        let ctx = context(&scratch, &runner, &registry);

        let err = ctx.source("draft-ietf-quic-http").unwrap_err();

        assert_eq!(err.to_string(), "Can not find the latest document on datatracker");
        assert_eq!(registry.lookups(), vec!["draft-ietf-quic-http".to_owned()]);
        assert!(runner.calls().is_empty());
    }
}

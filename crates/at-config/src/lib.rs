//! Configuration management for the author tools.
//!
//! Parses `at.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `scratch.dir`
//! - `registry.latest_url`
//! - `registry.auth_url`

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override scratch root directory.
    pub scratch_dir: Option<PathBuf>,
    /// Override registry base URL.
    pub latest_url: Option<String>,
    /// Override API key verification URL.
    pub auth_url: Option<String>,
    /// Override the URL domain allow-list.
    pub allowed_domains: Option<Vec<String>>,
    /// Override the default external tool timeout.
    pub tool_timeout_secs: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "at.toml";

/// Default registry endpoint answering `GET <base>/<name>`.
const DEFAULT_LATEST_URL: &str = "https://datatracker.ietf.org/api/rfcdiff-latest-json";

/// Upper bound for HTTP timeouts.
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// Upper bound for external tool timeouts.
const MAX_TOOL_TIMEOUT_SECS: u64 = 600;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scratch area configuration (paths are relative strings from TOML).
    scratch: ScratchConfigRaw,
    /// Document registry configuration.
    pub registry: RegistryConfig,
    /// Server-side fetch restrictions.
    pub security: SecurityConfig,
    /// External tool configuration.
    pub tools: ToolsConfig,

    /// Resolved scratch configuration (set after loading).
    #[serde(skip)]
    pub scratch_resolved: ScratchConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw scratch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ScratchConfigRaw {
    dir: Option<String>,
}

/// Resolved scratch configuration with an absolute root.
#[derive(Debug, Default, Clone)]
pub struct ScratchConfig {
    /// Root under which every request gets its own unique directory.
    pub dir: PathBuf,
}

/// Document registry configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL queried as `<latest_url>/<name>`.
    pub latest_url: String,
    /// API key verification endpoint. Keys are not checked when unset.
    pub auth_url: Option<String>,
    /// Connect/read timeout for registry and download requests.
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            latest_url: DEFAULT_LATEST_URL.to_owned(),
            auth_url: None,
            timeout_secs: 30,
        }
    }
}

/// Restrictions on caller-supplied URLs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Registrable domains (last two DNS labels) that may be fetched.
    pub allowed_domains: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec!["ietf.org".to_owned(), "rfc-editor.org".to_owned()],
        }
    }
}

/// External tool configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Timeout for converters, renderers and checkers.
    pub timeout_secs: u64,
    /// Timeout for each comparison tool attempt.
    pub diff_timeout_secs: u64,
    /// Executable overrides.
    pub programs: ProgramsConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            diff_timeout_secs: 20,
            programs: ProgramsConfig::default(),
        }
    }
}

/// Executable overrides, one per external tool.
///
/// Unset entries fall back to the tool's conventional program name.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramsConfig {
    pub xml2rfc: Option<String>,
    pub kramdown: Option<String>,
    pub mmark: Option<String>,
    pub rst2rfcxml: Option<String>,
    pub id2xml: Option<String>,
    pub iddiff: Option<String>,
    pub rfcdiff: Option<String>,
    pub idnits: Option<String>,
    pub svgcheck: Option<String>,
    pub aex: Option<String>,
    pub bap: Option<String>,
}

impl ProgramsConfig {
    /// Configured overrides as `(tool key, program)` pairs.
    pub fn overrides(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("xml2rfc", &self.xml2rfc),
            ("kramdown", &self.kramdown),
            ("mmark", &self.mmark),
            ("rst2rfcxml", &self.rst2rfcxml),
            ("id2xml", &self.id2xml),
            ("iddiff", &self.iddiff),
            ("rfcdiff", &self.rfcdiff),
            ("idnits", &self.idnits),
            ("svgcheck", &self.svgcheck),
            ("aex", &self.aex),
            ("bap", &self.bap),
        ]
        .into_iter()
        .filter_map(|(key, program)| program.as_deref().map(|p| (key, p)))
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`registry.latest_url`").
        field: String,
        /// Error message (e.g., "${`DT_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require a timeout to be positive and bounded.
fn require_timeout(secs: u64, max: u64, field: &str) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    if secs > max {
        return Err(ConfigError::Validation(format!(
            "{field} cannot exceed {max}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `at.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.scratch_dir {
            self.scratch_resolved.dir.clone_from(dir);
        }
        if let Some(url) = &settings.latest_url {
            self.registry.latest_url.clone_from(url);
        }
        if let Some(url) = &settings.auth_url {
            self.registry.auth_url = Some(url.clone());
        }
        if let Some(domains) = &settings.allowed_domains {
            self.security.allowed_domains.clone_from(domains);
        }
        if let Some(secs) = settings.tool_timeout_secs {
            self.tools.timeout_secs = secs;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            scratch: ScratchConfigRaw::default(),
            registry: RegistryConfig::default(),
            security: SecurityConfig::default(),
            tools: ToolsConfig::default(),
            scratch_resolved: ScratchConfig {
                dir: base.join(".at").join("scratch"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_registry()?;
        self.validate_security()?;
        self.validate_tools()?;
        Ok(())
    }

    fn validate_registry(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.registry.latest_url, "registry.latest_url")?;
        require_http_url(&self.registry.latest_url, "registry.latest_url")?;
        if let Some(ref auth_url) = self.registry.auth_url {
            require_non_empty(auth_url, "registry.auth_url")?;
            require_http_url(auth_url, "registry.auth_url")?;
        }
        require_timeout(
            self.registry.timeout_secs,
            MAX_HTTP_TIMEOUT_SECS,
            "registry.timeout_secs",
        )
    }

    fn validate_security(&self) -> Result<(), ConfigError> {
        if self.security.allowed_domains.is_empty() {
            return Err(ConfigError::Validation(
                "security.allowed_domains cannot be empty".to_owned(),
            ));
        }
        for domain in &self.security.allowed_domains {
            require_non_empty(domain, "security.allowed_domains")?;
        }
        Ok(())
    }

    fn validate_tools(&self) -> Result<(), ConfigError> {
        require_timeout(
            self.tools.timeout_secs,
            MAX_TOOL_TIMEOUT_SECS,
            "tools.timeout_secs",
        )?;
        require_timeout(
            self.tools.diff_timeout_secs,
            MAX_TOOL_TIMEOUT_SECS,
            "tools.diff_timeout_secs",
        )?;
        for (key, program) in self.tools.programs.overrides() {
            require_non_empty(program, &format!("tools.programs.{key}"))?;
        }
        Ok(())
    }

    /// Expand `${VAR}` references from the process environment.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.expand_vars_with(|var| std::env::var(var).ok())
    }

    /// Expand `${VAR}` references in the expandable fields using `lookup`.
    fn expand_vars_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.scratch.dir {
            self.scratch.dir = Some(expand_field(dir, "scratch.dir", &lookup)?);
        }

        self.registry.latest_url =
            expand_field(&self.registry.latest_url, "registry.latest_url", &lookup)?;
        if let Some(ref url) = self.registry.auth_url {
            self.registry.auth_url = Some(expand_field(url, "registry.auth_url", &lookup)?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let dir = self
            .scratch
            .dir
            .as_deref()
            .map_or_else(|| config_dir.join(".at").join("scratch"), |d| config_dir.join(d));
        self.scratch_resolved = ScratchConfig { dir };
    }
}

/// Unset variable without a `:-default`.
struct Unset;

/// Expand one field value.
///
/// Only the braced `${VAR}` form is recognized; a value without `${` is
/// returned as is, so URLs with a literal `$` survive.
fn expand_field(
    value: &str,
    field: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| lookup(var).map(Some).ok_or(Unset))
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

//! Scratch filesystem area.
//!
//! Every request unit gets a fresh directory named by a random UUID under
//! the scratch root. Derived files are written next to their source, so
//! a single directory holds everything one request produced. Nothing here
//! deletes files; sweeping stale directories is left to housekeeping.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Permissions for per-request directories.
#[cfg(unix)]
const DIR_MODE: u32 = 0o770;

/// Extensions accepted for document uploads.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "xml", "md", "mkd", "rst"];

/// Extensions accepted for SVG checking.
const SVG_EXTENSIONS: &[&str] = &["svg"];

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// What an upload will be used for, which decides the accepted extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPurpose {
    /// Draft sources: txt, xml, md, mkd, rst.
    #[default]
    Document,
    /// SVG artwork for checking.
    Svg,
}

/// Scratch storage error.
#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    /// Upload arrived without a filename.
    #[error("Filename is missing")]
    MissingFilename,
    /// Extension not accepted for the upload's purpose.
    #[error("Input file format not supported: {0}")]
    UnsupportedFormat(String),
    /// Nothing usable remained after sanitizing the filename.
    #[error("Can not determine the filename: {0}")]
    InvalidFilename(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Root under which per-request directories are created.
#[derive(Debug, Clone)]
pub struct ScratchArea {
    root: PathBuf,
}

impl ScratchArea {
    /// Create a scratch area rooted at `root`.
    ///
    /// The root itself is created lazily on first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, collision-free directory under the root.
    pub fn create_unique_dir(&self) -> Result<PathBuf, ScratchError> {
        fs::create_dir_all(&self.root)?;
        let dir = self.root.join(Uuid::new_v4().to_string());

        let mut builder = fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(&dir)?;

        tracing::debug!(dir = %dir.display(), "Created scratch directory");
        Ok(dir)
    }

    /// Save uploaded bytes under a sanitized version of `filename`.
    pub fn save_upload(
        &self,
        filename: &str,
        bytes: &[u8],
        purpose: UploadPurpose,
    ) -> Result<WorkingFile, ScratchError> {
        if filename.is_empty() {
            return Err(ScratchError::MissingFilename);
        }
        if !is_allowed_file(filename, purpose) {
            return Err(ScratchError::UnsupportedFormat(filename.to_owned()));
        }

        let path = self.allocate(filename)?;
        fs::write(&path, bytes)?;
        tracing::info!(file = %path.display(), "Saved upload");
        Ok(WorkingFile::new(path))
    }

    /// Save `text` as a `.txt` file with a generated name.
    pub fn save_text(&self, text: &str) -> Result<WorkingFile, ScratchError> {
        let path = self.allocate(&format!("{}.txt", Uuid::new_v4()))?;
        fs::write(&path, text)?;
        Ok(WorkingFile::new(path))
    }

    /// Reserve a path for `filename` inside a fresh directory.
    ///
    /// The file itself is not created.
    pub fn allocate(&self, filename: &str) -> Result<PathBuf, ScratchError> {
        let name = secure_filename(filename);
        if name.is_empty() {
            return Err(ScratchError::InvalidFilename(filename.to_owned()));
        }
        Ok(self.create_unique_dir()?.join(name))
    }
}

/// A file materialized in the scratch area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingFile {
    path: PathBuf,
}

impl WorkingFile {
    /// Wrap an existing path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Containing scratch directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Lowercased extension without the dot, empty when absent.
    #[must_use]
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path with the same directory and stem but extension `ext`.
    #[must_use]
    pub fn sibling(&self, ext: &str) -> PathBuf {
        self.path.with_extension(ext)
    }

    /// Read the whole file as text, replacing invalid UTF-8.
    pub fn read_text(&self) -> std::io::Result<String> {
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Whether `filename` carries an extension accepted for `purpose`.
#[must_use]
pub fn is_allowed_file(filename: &str, purpose: UploadPurpose) -> bool {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_lowercase();
    let allowed = match purpose {
        UploadPurpose::Document => DOCUMENT_EXTENSIONS,
        UploadPurpose::Svg => SVG_EXTENSIONS,
    };
    allowed.contains(&ext.as_str())
}

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// Path separators become underscores, anything outside
/// `[A-Za-z0-9_.-]` is dropped and leading/trailing dots and underscores
/// are trimmed, so the result can never escape its directory.
#[must_use]
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_owned()
}

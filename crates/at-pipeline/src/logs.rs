//! Structured diagnostics scraped from renderer output.
//!
//! xml2rfc reports problems as free-form lines such as
//! `/scratch/3f…/draft.xml(12): Warning: Found non-ascii characters …`.
//! [`DiagnosticLog::parse`] turns that text into ordered error, warning and
//! non-ASCII buckets with the scratch directory removed.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::runner::ProcessOutput;

static ERROR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:.*\s)?Error:\s*(?P<message>.*)$").unwrap());

static WARNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:.*\s)?Warning:\s*(?P<message>.*)$").unwrap());

static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((?P<line>\d+)\):\s*(?:Error|Warning):").unwrap());

/// Warning text xml2rfc emits for non-ASCII content.
const NON_ASCII_MARKER: &str = "found non-ascii characters";

/// Diagnostics from one or more tool runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticLog {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Advisory non-ASCII findings, kept apart from blocking warnings.
    pub bare_unicode: Vec<String>,
}

impl DiagnosticLog {
    /// Parse raw diagnostic text produced while processing `source`.
    ///
    /// Every form of `source`'s directory is stripped before lines are
    /// classified. Pure: the same input always yields the same log.
    #[must_use]
    pub fn parse(raw: &str, source: &Path) -> Self {
        let cleaned = strip_dir(raw, source);
        let mut log = Self::default();

        for line in cleaned.lines() {
            let prefix = LINE_RE
                .captures(line)
                .map(|caps| format!("({}) ", &caps["line"]))
                .unwrap_or_default();

            if let Some(message) = message(&ERROR_RE, line) {
                log.errors.push(format!("{prefix}{message}"));
            } else if let Some(message) = message(&WARNING_RE, line) {
                let entry = format!("{prefix}{message}");
                if message.to_lowercase().contains(NON_ASCII_MARKER) {
                    log.bare_unicode.push(entry);
                } else {
                    log.warnings.push(entry);
                }
            }
        }

        log
    }

    /// Parse stdout followed by stderr of a tool run.
    #[must_use]
    pub fn from_output(output: &ProcessOutput, source: &Path) -> Self {
        let mut raw = output.stdout_lossy();
        if !raw.is_empty() && !raw.ends_with('\n') {
            raw.push('\n');
        }
        raw.push_str(&output.stderr_lossy());
        Self::parse(&raw, source)
    }

    /// Append `more` bucket by bucket, keeping existing entries first.
    pub fn update(&mut self, more: Self) {
        self.errors.extend(more.errors);
        self.warnings.extend(more.warnings);
        self.bare_unicode.extend(more.bare_unicode);
    }

    /// Consuming form of [`update`](Self::update).
    #[must_use]
    pub fn merged(mut self, more: Self) -> Self {
        self.update(more);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.bare_unicode.is_empty()
    }

    /// Errors joined by newlines, `None` when there are none.
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        (!self.errors.is_empty()).then(|| self.errors.join("\n"))
    }
}

fn message<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line)
        .and_then(|caps| caps.name("message"))
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
}

/// Remove every form of `file`'s directory from `text`.
///
/// Both the absolute directory and its form relative to the working
/// directory are removed, first with a trailing separator and then bare.
#[must_use]
pub fn strip_dir(text: &str, file: &Path) -> String {
    let mut out = text.to_owned();
    for dir in dir_forms(file) {
        out = out.replace(&format!("{dir}/"), "").replace(&dir, "");
    }
    out
}

/// Remove the directories of several files from `text`.
#[must_use]
pub fn strip_dirs(text: &str, files: &[&Path]) -> String {
    files
        .iter()
        .fold(text.to_owned(), |acc, file| strip_dir(&acc, file))
}

fn dir_forms(file: &Path) -> Vec<String> {
    let Some(dir) = file.parent() else {
        return Vec::new();
    };

    let mut forms: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Ok(absolute) = std::path::absolute(dir) {
        forms.push(absolute);
    }
    if let Ok(cwd) = std::env::current_dir() {
        let relative: Vec<PathBuf> = forms
            .iter()
            .filter_map(|form| form.strip_prefix(&cwd).ok().map(Path::to_path_buf))
            .collect();
        forms.extend(relative);
    }

    let mut forms: Vec<String> = forms
        .into_iter()
        .map(|form| form.to_string_lossy().trim_end_matches('/').to_owned())
        .filter(|form| !form.is_empty() && form != ".")
        .collect();
    // Longest first so a relative form never splits an absolute one
    forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    forms.dedup();
    forms
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "/srv/scratch/0d9e/draft-smoke-signals-00.xml";

    fn sample() -> String {
        [
            "Parsing file /srv/scratch/0d9e/draft-smoke-signals-00.xml",
            "/srv/scratch/0d9e/draft-smoke-signals-00.xml(12): Error: Unknown element <foo>",
            "/srv/scratch/0d9e/draft-smoke-signals-00.xml(40): Warning: Expected a 'date' element",
            "/srv/scratch/0d9e/draft-smoke-signals-00.xml(41): Warning: Found non-ascii characters in an element",
            "Warning: Setting consensus=\"true\" for IETF STD document",
            "error: could not read /srv/scratch/0d9e/include.xml",
            "Created file /srv/scratch/0d9e/draft-smoke-signals-00.txt",
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_classifies_lines() {
        let log = DiagnosticLog::parse(&sample(), Path::new(SOURCE));

        assert_eq!(
            log.errors,
            vec![
                "(12) Unknown element <foo>".to_owned(),
                "could not read include.xml".to_owned(),
            ]
        );
        assert_eq!(
            log.warnings,
            vec![
                "(40) Expected a 'date' element".to_owned(),
                "Setting consensus=\"true\" for IETF STD document".to_owned(),
            ]
        );
        assert_eq!(
            log.bare_unicode,
            vec!["(41) Found non-ascii characters in an element".to_owned()]
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = DiagnosticLog::parse(&sample(), Path::new(SOURCE));
        let second = DiagnosticLog::parse(&sample(), Path::new(SOURCE));
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_never_leaks_scratch_dir() {
        let log = DiagnosticLog::parse(&sample(), Path::new(SOURCE));
        let json = serde_json::to_string(&log).unwrap();
        assert!(!json.contains("/srv/scratch/0d9e"));
        assert!(!json.contains("0d9e"));
    }

    #[test]
    fn test_parse_drops_empty_messages() {
        let log = DiagnosticLog::parse("Error:\nWarning:   \nplain line", Path::new(SOURCE));
        assert!(log.is_empty());
    }

    #[test]
    fn test_error_wins_over_warning() {
        let log = DiagnosticLog::parse("x.xml(3): Warning: Error: both", Path::new(SOURCE));
        assert_eq!(log.errors, vec!["(3) both".to_owned()]);
        assert!(log.warnings.is_empty());
    }

    #[test]
    fn test_relative_dir_stripped() {
        let cwd = std::env::current_dir().unwrap();
        let file = cwd.join("scratch-rel/abc/draft.xml");
        let text = "scratch-rel/abc/draft.xml(1): Error: bad";

        let log = DiagnosticLog::parse(text, &file);
        assert_eq!(log.errors, vec!["(1) bad".to_owned()]);
    }

    #[test]
    fn test_update_preserves_order() {
        let mut log = DiagnosticLog {
            errors: vec!["a".to_owned()],
            warnings: vec!["w1".to_owned()],
            bare_unicode: Vec::new(),
        };
        log.update(DiagnosticLog {
            errors: vec!["b".to_owned()],
            warnings: Vec::new(),
            bare_unicode: vec!["u".to_owned()],
        });

        assert_eq!(log.errors, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(log.warnings, vec!["w1".to_owned()]);
        assert_eq!(log.bare_unicode, vec!["u".to_owned()]);
    }

    #[test]
    fn test_from_output_reads_both_streams() {
        let output = ProcessOutput::exited(1, "Warning: from stdout", "Error: from stderr\n");
        let log = DiagnosticLog::from_output(&output, Path::new(SOURCE));

        assert_eq!(log.warnings, vec!["from stdout".to_owned()]);
        assert_eq!(log.error_summary().as_deref(), Some("from stderr"));
    }

    #[test]
    fn test_strip_dirs() {
        let text = "/a/1/old.txt vs /b/2/new.txt";
        let out = strip_dirs(text, &[Path::new("/a/1/old.txt"), Path::new("/b/2/new.txt")]);
        assert_eq!(out, "old.txt vs new.txt");
    }
}

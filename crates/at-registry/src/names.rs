//! Draft and RFC name parsing.

use std::sync::LazyLock;

use regex::Regex;

static REVISION_AND_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-\d+)?(\..*)?$").unwrap());

static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\..*$").unwrap());

/// Base name of a draft or RFC, without revision or extension.
///
/// `draft-smoke-signals-00.txt` gives `draft-smoke-signals`, `rfc3333.txt`
/// gives `rfc3333`. Anything that is not a draft or RFC gives `None`.
#[must_use]
pub fn get_name(filename: &str) -> Option<String> {
    strip(filename, &REVISION_AND_EXTENSION)
}

/// Name with the revision kept and the extension removed.
#[must_use]
pub fn get_name_with_revision(filename: &str) -> Option<String> {
    strip(filename, &EXTENSION)
}

fn strip(filename: &str, pattern: &Regex) -> Option<String> {
    let lower = filename.to_lowercase();
    if !(lower.starts_with("draft-") || lower.starts_with("rfc")) {
        return None;
    }
    Some(pattern.replace(&lower, "").into_owned())
}

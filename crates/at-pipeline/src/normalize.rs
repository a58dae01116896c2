//! Upgrade xml2rfc documents to the current schema.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::convert::ConversionResult;
use crate::error::PipelineError;
use crate::logs::{DiagnosticLog, strip_dir};
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Current xml2rfc schema version.
pub const CURRENT_VERSION: &str = "3";

/// Version assumed when the root carries no `version` attribute.
pub const LEGACY_VERSION: &str = "2";

/// Read the root element's `version` attribute.
///
/// The whole document is checked for well-formedness first, so malformed
/// input is reported as [`PipelineError::XmlSyntax`] rather than guessed at.
pub fn schema_version(path: &Path) -> Result<String, PipelineError> {
    let content = fs::read(path)?;
    let mut reader = Reader::from_reader(content.as_slice());
    let mut buf = Vec::new();
    let mut root_version: Option<String> = None;
    let mut seen_root = false;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| PipelineError::XmlSyntax(e.to_string()))?;
        match event {
            Event::Start(e) => {
                if !seen_root {
                    root_version = version_attr(&e);
                    seen_root = true;
                } else if depth == 0 {
                    return Err(multiple_roots());
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if !seen_root {
                    root_version = version_attr(&e);
                    seen_root = true;
                } else if depth == 0 {
                    return Err(multiple_roots());
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(PipelineError::XmlSyntax("document has no root element".to_owned()));
    }
    if depth != 0 {
        return Err(PipelineError::XmlSyntax("unexpected end of document".to_owned()));
    }

    Ok(root_version.unwrap_or_else(|| LEGACY_VERSION.to_owned()))
}

fn version_attr(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"version")
        .map(|attr| String::from_utf8_lossy(&attr.value).trim().to_owned())
}

fn multiple_roots() -> PipelineError {
    PipelineError::XmlSyntax("content after the root element".to_owned())
}

/// Bring an XML document to the current schema.
///
/// Legacy documents are rewritten in place by `xml2rfc --v2v3` and come back
/// with the tool's diagnostics. Current documents come back untouched with
/// no log at all, so callers can tell "not upgraded" from "upgraded cleanly".
pub fn normalize_to_current(
    toolchain: &Toolchain,
    xml: &WorkingFile,
) -> Result<ConversionResult, PipelineError> {
    let version = schema_version(xml.path()).inspect_err(|e| {
        tracing::info!(file = %xml.path().display(), error = %e, "Rejected XML");
    })?;

    if version != LEGACY_VERSION {
        tracing::debug!(%version, "Schema already current");
        return Ok(ConversionResult::new(xml.clone()));
    }

    tracing::debug!("Converting v2 XML to v3 XML");
    let target = xml.sibling("xml");
    let args = vec![
        "--v2v3".to_owned(),
        "--out".to_owned(),
        path_arg(&target),
        path_arg(xml.path()),
    ];
    let output = toolchain.run(Tool::Xml2rfc, &args)?;

    if !output.is_success() {
        let stderr = strip_dir(&output.stderr_lossy(), xml.path());
        let message = if stderr.trim().is_empty() {
            "v2v3 conversion error".to_owned()
        } else {
            stderr
        };
        tracing::info!(%message, "xml2rfc v2v3 failed");
        return Err(PipelineError::XmlNormalization(message));
    }

    tracing::info!(file = %target.display(), "New file saved");
    let log = DiagnosticLog::from_output(&output, xml.path());
    Ok(ConversionResult::new(WorkingFile::new(target)).with_log(log))
}

//! Canonical plain-text extraction.
//!
//! Diffing and conformance checks work on the text rendering of a draft.
//! [`to_canonical_text`] drives any supported source there: markup goes
//! through its converter, every XML document through the normalizer, and
//! the result through xml2rfc's text renderer.

use crate::convert::{ConversionResult, SourceFormat, converter_for};
use crate::error::PipelineError;
use crate::normalize::normalize_to_current;
use crate::render::{RenderFormat, merge_logs, render};
use crate::scratch::WorkingFile;
use crate::tool::Toolchain;

/// How much processing [`to_canonical_text`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Convert everything that is not already text.
    #[default]
    Full,
    /// Return the file untouched.
    Raw,
    /// Return `.txt` and `.xml` untouched, convert the rest.
    Passthrough,
}

/// Produce the canonical text form of `file`.
///
/// Any sub-stage failure is reported as [`PipelineError::TextProcessing`]
/// with the inner message preserved.
pub fn to_canonical_text(
    toolchain: &Toolchain,
    file: &WorkingFile,
    mode: ExtractionMode,
) -> Result<ConversionResult, PipelineError> {
    match mode {
        ExtractionMode::Raw => return Ok(ConversionResult::new(file.clone())),
        ExtractionMode::Passthrough if matches!(file.extension().as_str(), "txt" | "xml") => {
            return Ok(ConversionResult::new(file.clone()));
        }
        _ => {}
    }

    extract(toolchain, file).map_err(|e| {
        tracing::error!(file = %file.file_name(), error = %e, "Error processing non text file");
        PipelineError::TextProcessing(e.to_string())
    })
}

fn extract(toolchain: &Toolchain, file: &WorkingFile) -> Result<ConversionResult, PipelineError> {
    let xml = match SourceFormat::classify(file)? {
        Some(SourceFormat::Text) => return Ok(ConversionResult::new(file.clone())),
        Some(SourceFormat::Xml) => ConversionResult::new(file.clone()),
        Some(format) => {
            tracing::debug!(?format, "Processing non text file");
            let convert =
                converter_for(format).ok_or_else(|| PipelineError::UnsupportedFormat(file.extension()))?;
            convert(toolchain, file)?
        }
        None => return Err(PipelineError::UnsupportedFormat(file.extension())),
    };

    let normalized = normalize_to_current(toolchain, &xml.file)?;
    let text = render(toolchain, &normalized.file, RenderFormat::Text)?;

    Ok(ConversionResult {
        file: text.file,
        log: merge_logs(normalized.log, text.log),
    })
}

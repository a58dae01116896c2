//! Rendering normalized XML with xml2rfc.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::convert::{self, ConversionResult};
use crate::error::PipelineError;
use crate::logs::DiagnosticLog;
use crate::normalize::normalize_to_current;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Output format of [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Normalized v3 XML.
    Xml,
    Html,
    Text,
    Pdf,
}

impl RenderFormat {
    /// Extension of the rendered file.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Pdf => "pdf",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }

    fn flag(self) -> Option<&'static str> {
        match self {
            Self::Xml => None,
            Self::Html => Some("--html"),
            Self::Text => Some("--text"),
            Self::Pdf => Some("--pdf"),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown render format name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown output format: {0}")]
pub struct ParseRenderFormatError(String);

impl FromStr for RenderFormat {
    type Err = ParseRenderFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xml" => Ok(Self::Xml),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ParseRenderFormatError(s.to_owned())),
        }
    }
}

/// Convert an uploaded source to XML.
///
/// Markdown goes through the dialect converter, `.txt` through id2xml and
/// `.rst` through rst2rfcxml; XML is returned as is.
pub fn process_source(
    toolchain: &Toolchain,
    file: &WorkingFile,
) -> Result<ConversionResult, PipelineError> {
    convert::to_xml(toolchain, file)
}

/// Render current-schema XML as `format`.
///
/// [`RenderFormat::Xml`] returns the input itself. Failures carry the
/// scraped error lines, or `"<format> generation error"` when xml2rfc gave
/// none.
pub fn render(
    toolchain: &Toolchain,
    xml: &WorkingFile,
    format: RenderFormat,
) -> Result<ConversionResult, PipelineError> {
    let Some(flag) = format.flag() else {
        return Ok(ConversionResult::new(xml.clone()));
    };

    tracing::debug!(%format, "Running xml2rfc renderer");
    let target = xml.sibling(format.extension());
    let args = vec![
        flag.to_owned(),
        "--quiet".to_owned(),
        "--out".to_owned(),
        path_arg(&target),
        path_arg(xml.path()),
    ];
    let output = toolchain.run(Tool::Xml2rfc, &args)?;

    if !output.is_success() {
        return Err(PipelineError::from_scraped(
            Tool::Xml2rfc,
            &output,
            xml.path(),
            &format!("{format} generation error"),
        ));
    }

    tracing::info!(file = %target.display(), "New file saved");
    let log = DiagnosticLog::from_output(&output, xml.path());
    Ok(ConversionResult::new(WorkingFile::new(target)).with_log(log))
}

/// Convert, normalize and render a source in one go.
///
/// The returned log holds the upgrade diagnostics followed by the
/// renderer's.
pub fn render_document(
    toolchain: &Toolchain,
    file: &WorkingFile,
    format: RenderFormat,
) -> Result<ConversionResult, PipelineError> {
    let xml = process_source(toolchain, file)?;
    let normalized = normalize_to_current(toolchain, &xml.file)?;
    let rendered = render(toolchain, &normalized.file, format)?;
    Ok(ConversionResult {
        file: rendered.file,
        log: merge_logs(normalized.log, rendered.log),
    })
}

/// Merge two optional logs, keeping `first`'s entries in front.
pub(crate) fn merge_logs(
    first: Option<DiagnosticLog>,
    second: Option<DiagnosticLog>,
) -> Option<DiagnosticLog> {
    match (first, second) {
        (Some(first), Some(second)) => Some(first.merged(second)),
        (first, second) => first.or(second),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRunner, output_arg};
    use crate::runner::ProcessOutput;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const V3: &str = r#"<rfc version="3"><front/></rfc>"#;

    /// xml2rfc stand-in writing a marker into whatever `--out` names.
    fn xml2rfc() -> Arc<MockRunner> {
        Arc::new(MockRunner::new().with_handler("xml2rfc", |args| {
            let out = output_arg(args).unwrap();
            let content = if args[0] == "--v2v3" { V3.to_owned() } else { args[0].clone() };
            fs::write(out, content).unwrap();
            Ok(ProcessOutput::exited(0, "", format!("{}(1): Warning: {}\n", out.display(), args[0])))
        }))
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("html".parse::<RenderFormat>().unwrap(), RenderFormat::Html);
        assert_eq!("TXT".parse::<RenderFormat>().unwrap(), RenderFormat::Text);
        assert!("docx".parse::<RenderFormat>().is_err());
    }

    #[test]
    fn test_render_html() {
        let temp = TempDir::new().unwrap();
        let runner = xml2rfc();
        let toolchain = MockRunner::toolchain(&runner);
        let xml = temp.path().join("draft.xml");
        fs::write(&xml, V3).unwrap();

        let result = render(&toolchain, &WorkingFile::new(&xml), RenderFormat::Html).unwrap();

        assert_eq!(result.file.path(), temp.path().join("draft.html"));
        assert_eq!(fs::read_to_string(result.file.path()).unwrap(), "--html");
        assert_eq!(
            runner.calls_to("xml2rfc")[0][..3].to_vec(),
            vec!["--html".to_owned(), "--quiet".to_owned(), "--out".to_owned()]
        );
        assert_eq!(result.log.unwrap().warnings, vec!["(1) --html".to_owned()]);
    }

    #[test]
    fn test_render_xml_is_identity() {
        let runner = xml2rfc();
        let toolchain = MockRunner::toolchain(&runner);
        let xml = WorkingFile::new("/scratch/x/draft.xml");

        let result = render(&toolchain, &xml, RenderFormat::Xml).unwrap();

        assert_eq!(result.file, xml);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_render_failure_messages() {
        let temp = TempDir::new().unwrap();
        let xml = WorkingFile::new(temp.path().join("draft.xml"));

        let silent = Arc::new(MockRunner::new().with_output("xml2rfc", ProcessOutput::exited(1, "", "")));
        let err = render(&MockRunner::toolchain(&silent), &xml, RenderFormat::Pdf).unwrap_err();
        assert_eq!(err.to_string(), "pdf generation error");

        let stderr = format!(
            "{}(7): Error: Unknown element\n{}(9): Error: Missing title\n",
            xml.path().display(),
            xml.path().display()
        );
        let noisy =
            Arc::new(MockRunner::new().with_output("xml2rfc", ProcessOutput::exited(1, "", stderr)));
        let err = render(&MockRunner::toolchain(&noisy), &xml, RenderFormat::Text).unwrap_err();
        assert_eq!(err.to_string(), "(7) Unknown element\n(9) Missing title");
        assert_eq!(err.tool(), Some(Tool::Xml2rfc));
    }

    #[test]
    fn test_render_document_merges_upgrade_log_first() {
        let temp = TempDir::new().unwrap();
        let runner = xml2rfc();
        let toolchain = MockRunner::toolchain(&runner);
        let xml = temp.path().join("draft.xml");
        fs::write(&xml, "<rfc><front/></rfc>").unwrap();

        let result = render_document(&toolchain, &WorkingFile::new(&xml), RenderFormat::Text).unwrap();

        assert_eq!(result.file.path(), temp.path().join("draft.txt"));
        assert_eq!(
            result.log.unwrap().warnings,
            vec!["(1) --v2v3".to_owned(), "(1) --text".to_owned()]
        );
    }

    #[test]
    fn test_merge_logs() {
        let a = DiagnosticLog {
            errors: vec!["a".to_owned()],
            ..DiagnosticLog::default()
        };
        assert_eq!(merge_logs(None, None), None);
        assert_eq!(merge_logs(Some(a.clone()), None), Some(a.clone()));
        assert_eq!(merge_logs(None, Some(a.clone())), Some(a.clone()));
        assert_eq!(
            merge_logs(Some(a.clone()), Some(a)).unwrap().errors.len(),
            2
        );
    }
}

//! Format converters: draft sources to XML.
//!
//! Each converter turns one [`WorkingFile`] into an XML sibling in the same
//! scratch directory. Dispatch goes through [`SourceFormat::classify`] and
//! the [`CONVERTERS`] table.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};

use crate::error::PipelineError;
use crate::logs::DiagnosticLog;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// First-line sentinel of mmark title blocks.
const MMARK_SENTINEL: &str = "%%%";

/// A converted (or passed-through) file with the diagnostics produced on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub file: WorkingFile,
    /// `None` when the stage did not scrape any tool output.
    pub log: Option<DiagnosticLog>,
}

impl ConversionResult {
    /// Result without diagnostics.
    #[must_use]
    pub fn new(file: WorkingFile) -> Self {
        Self { file, log: None }
    }

    /// Attach a diagnostic log.
    #[must_use]
    pub fn with_log(mut self, log: DiagnosticLog) -> Self {
        self.log = Some(log);
        self
    }
}

/// Real format of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Markdown for kramdown-rfc.
    Kramdown,
    /// Markdown for mmark.
    Mmark,
    /// reStructuredText.
    Rst,
    /// Plain-text draft.
    Text,
    /// xml2rfc XML, any schema version.
    Xml,
}

impl SourceFormat {
    /// Classify `file` by extension, sniffing markdown dialect from content.
    ///
    /// Returns `None` for extensions no converter handles.
    pub fn classify(file: &WorkingFile) -> Result<Option<Self>, PipelineError> {
        let format = match file.extension().as_str() {
            "md" | "mkd" => Some(Self::sniff_markdown(&first_line(file)?)),
            "rst" => Some(Self::Rst),
            "txt" => Some(Self::Text),
            "xml" => Some(Self::Xml),
            _ => None,
        };
        Ok(format)
    }

    /// Pick the markdown dialect from a file's first line.
    ///
    /// Both tools accept the same extensions but use incompatible front
    /// matter; only mmark opens with `%%%`.
    #[must_use]
    pub fn sniff_markdown(first_line: &str) -> Self {
        if first_line.trim().starts_with(MMARK_SENTINEL) {
            Self::Mmark
        } else {
            Self::Kramdown
        }
    }
}

/// Signature shared by every converter.
pub type ConvertFn = fn(&Toolchain, &WorkingFile) -> Result<ConversionResult, PipelineError>;

/// Converter for each non-XML source format.
pub const CONVERTERS: [(SourceFormat, ConvertFn); 4] = [
    (SourceFormat::Kramdown, kramdown2xml),
    (SourceFormat::Mmark, mmark2xml),
    (SourceFormat::Rst, rst2xml),
    (SourceFormat::Text, txt2xml),
];

/// Converter registered for `format`.
#[must_use]
pub fn converter_for(format: SourceFormat) -> Option<ConvertFn> {
    CONVERTERS
        .iter()
        .find(|(candidate, _)| *candidate == format)
        .map(|(_, convert)| *convert)
}

/// Convert `file` to XML, returning XML input unchanged.
pub fn to_xml(toolchain: &Toolchain, file: &WorkingFile) -> Result<ConversionResult, PipelineError> {
    match SourceFormat::classify(file)? {
        Some(SourceFormat::Xml) => Ok(ConversionResult::new(file.clone())),
        Some(format) => match converter_for(format) {
            Some(convert) => convert(toolchain, file),
            None => Err(PipelineError::UnsupportedFormat(file.extension())),
        },
        None => Err(PipelineError::UnsupportedFormat(file.extension())),
    }
}

/// Convert markdown to XML, choosing the dialect from the first line.
pub fn md2xml(toolchain: &Toolchain, file: &WorkingFile) -> Result<ConversionResult, PipelineError> {
    match SourceFormat::sniff_markdown(&first_line(file)?) {
        SourceFormat::Mmark => mmark2xml(toolchain, file),
        _ => kramdown2xml(toolchain, file),
    }
}

/// Convert kramdown-rfc markdown to XML.
pub fn kramdown2xml(
    toolchain: &Toolchain,
    file: &WorkingFile,
) -> Result<ConversionResult, PipelineError> {
    stdout_to_xml(toolchain, Tool::Kramdown, file)
}

/// Convert mmark markdown to XML.
pub fn mmark2xml(
    toolchain: &Toolchain,
    file: &WorkingFile,
) -> Result<ConversionResult, PipelineError> {
    stdout_to_xml(toolchain, Tool::Mmark, file)
}

/// Convert reStructuredText to XML.
pub fn rst2xml(toolchain: &Toolchain, file: &WorkingFile) -> Result<ConversionResult, PipelineError> {
    stdout_to_xml(toolchain, Tool::Rst2rfcxml, file)
}

/// Convert a plain-text draft to legacy (v2) XML.
///
/// The v2 shape is what the normalizer expects as input.
pub fn txt2xml(toolchain: &Toolchain, file: &WorkingFile) -> Result<ConversionResult, PipelineError> {
    tracing::debug!(file = %file.path().display(), "Converting text draft to XML");

    let xml = file.sibling("xml");
    let args = vec![
        "--v2".to_owned(),
        "--out".to_owned(),
        path_arg(&xml),
        path_arg(file.path()),
    ];
    let output = toolchain.run(Tool::Id2xml, &args)?;
    if !output.is_success() {
        return Err(PipelineError::from_stderr(Tool::Id2xml, &output, file.path()));
    }

    tracing::info!(file = %xml.display(), "New file saved");
    Ok(ConversionResult::new(WorkingFile::new(xml)))
}

/// Run a converter that prints XML on stdout and save it as the `.xml` sibling.
fn stdout_to_xml(
    toolchain: &Toolchain,
    tool: Tool,
    file: &WorkingFile,
) -> Result<ConversionResult, PipelineError> {
    tracing::debug!(%tool, file = %file.path().display(), "Converting to XML");

    let output = toolchain.run(tool, &[path_arg(file.path())])?;
    if !output.is_success() {
        return Err(PipelineError::from_stderr(tool, &output, file.path()));
    }

    let xml = file.sibling("xml");
    fs::write(&xml, &output.stdout)?;

    tracing::info!(file = %xml.display(), "New file saved");
    Ok(ConversionResult::new(WorkingFile::new(xml)))
}

fn first_line(file: &WorkingFile) -> Result<String, PipelineError> {
    let mut reader = BufReader::new(File::open(file.path())?);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;
    use crate::runner::ProcessOutput;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const XML: &str = r#"<rfc version="3"><front/></rfc>"#;

    fn write(dir: &Path, name: &str, content: &str) -> WorkingFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        WorkingFile::new(path)
    }

    fn converters() -> Arc<MockRunner> {
        Arc::new(
            MockRunner::new()
                .with_output("kramdown-rfc", ProcessOutput::exited(0, XML, ""))
                .with_output("mmark", ProcessOutput::exited(0, XML, ""))
                .with_output("rst2rfcxml", ProcessOutput::exited(0, XML, "")),
        )
    }

    #[test]
    fn test_sniff_markdown() {
        assert_eq!(SourceFormat::sniff_markdown("%%%\n"), SourceFormat::Mmark);
        assert_eq!(SourceFormat::sniff_markdown("  %%%  "), SourceFormat::Mmark);
        assert_eq!(SourceFormat::sniff_markdown("---\n"), SourceFormat::Kramdown);
        assert_eq!(SourceFormat::sniff_markdown("%%"), SourceFormat::Kramdown);
        assert_eq!(SourceFormat::sniff_markdown(""), SourceFormat::Kramdown);
    }

    #[test]
    fn test_classify() {
        let temp = TempDir::new().unwrap();
        let cases = [
            ("a.md", "%%%\ntitle = \"x\"\n", Some(SourceFormat::Mmark)),
            ("b.mkd", "---\ntitle: x\n", Some(SourceFormat::Kramdown)),
            ("c.rst", "Title\n=====\n", Some(SourceFormat::Rst)),
            ("d.TXT", "", Some(SourceFormat::Text)),
            ("e.xml", XML, Some(SourceFormat::Xml)),
            ("f.docx", "", None),
        ];
        for (name, content, expected) in cases {
            let file = write(temp.path(), name, content);
            assert_eq!(SourceFormat::classify(&file).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_mmark_source_never_reaches_kramdown() {
        let temp = TempDir::new().unwrap();
        let runner = converters();
        let toolchain = MockRunner::toolchain(&runner);
        let file = write(temp.path(), "draft-a-00.md", "%%%\ntitle = \"A\"\n%%%\n");

        let result = md2xml(&toolchain, &file).unwrap();

        assert!(runner.invoked("mmark"));
        assert!(!runner.invoked("kramdown-rfc"));
        assert_eq!(result.file.path(), temp.path().join("draft-a-00.xml"));
        assert_eq!(fs::read_to_string(result.file.path()).unwrap(), XML);
        assert!(result.log.is_none());
    }

    #[test]
    fn test_kramdown_is_default_dialect() {
        let temp = TempDir::new().unwrap();
        let runner = converters();
        let toolchain = MockRunner::toolchain(&runner);
        let file = write(temp.path(), "draft-b-00.md", "---\ntitle: B\n---\n");

        to_xml(&toolchain, &file).unwrap();

        assert!(runner.invoked("kramdown-rfc"));
        assert!(!runner.invoked("mmark"));
        assert_eq!(
            runner.calls_to("kramdown-rfc"),
            vec![vec![path_arg(file.path())]]
        );
    }

    #[test]
    fn test_converter_failure_carries_stderr() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new().with_output(
            "kramdown-rfc",
            ProcessOutput::exited(1, "", "*** Unknown key: tittle\n"),
        ));
        let toolchain = MockRunner::toolchain(&runner);
        let file = write(temp.path(), "draft-c-00.md", "---\ntittle: C\n");

        let err = kramdown2xml(&toolchain, &file).unwrap_err();

        assert!(matches!(err, PipelineError::Tool { tool: Tool::Kramdown, .. }));
        assert_eq!(err.to_string(), "*** Unknown key: tittle\n");
        assert!(!temp.path().join("draft-c-00.xml").exists());
    }

    #[test]
    fn test_txt2xml_requests_v2() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new().with_handler("id2xml", |args| {
            let out = crate::mock::output_arg(args).unwrap();
            fs::write(out, r#"<rfc><front/></rfc>"#).unwrap();
            Ok(ProcessOutput::exited(0, "", ""))
        }));
        let toolchain = MockRunner::toolchain(&runner);
        let file = write(temp.path(), "draft-d-00.txt", "Internet-Draft\n");

        let result = to_xml(&toolchain, &file).unwrap();

        let xml = temp.path().join("draft-d-00.xml");
        assert_eq!(result.file.path(), xml);
        assert_eq!(
            runner.calls_to("id2xml"),
            vec![vec![
                "--v2".to_owned(),
                "--out".to_owned(),
                path_arg(&xml),
                path_arg(file.path()),
            ]]
        );
    }

    #[test]
    fn test_xml_passes_through() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new());
        let toolchain = MockRunner::toolchain(&runner);
        let file = write(temp.path(), "draft-e-00.xml", XML);

        let result = to_xml(&toolchain, &file).unwrap();

        assert_eq!(result.file, file);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let toolchain = MockRunner::toolchain(&Arc::new(MockRunner::new()));
        let file = write(temp.path(), "draft.pdf", "");

        let err = to_xml(&toolchain, &file).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(ext) if ext == "pdf"));
    }

    #[test]
    fn test_missing_converter_is_runner_error() {
        let temp = TempDir::new().unwrap();
        let toolchain = MockRunner::toolchain(&Arc::new(MockRunner::new()));
        let file = write(temp.path(), "draft.rst", "T\n=\n");

        let err = rst2xml(&toolchain, &file).unwrap_err();
        assert!(matches!(err, PipelineError::Runner(_)));
    }
}

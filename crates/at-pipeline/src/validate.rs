//! Document validation: xml2rfc diagnostics plus an idnits report.

use serde::Serialize;

use crate::error::PipelineError;
use crate::logs::{DiagnosticLog, strip_dir};
use crate::normalize::normalize_to_current;
use crate::render::process_source;
use crate::scratch::WorkingFile;
use crate::tool::{Tool, Toolchain, path_arg};

/// Combined validation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    #[serde(flatten)]
    pub log: DiagnosticLog,
    /// idnits output for the rendered text.
    pub idnits: String,
}

/// idnits switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdnitsOptions {
    /// Verbosity level; values above 2 are treated as 2.
    pub verbose: u8,
    pub show_text: bool,
    /// Year to expect in the copyright boilerplate.
    pub year: Option<u16>,
    pub submit_check: bool,
}

impl IdnitsOptions {
    fn args(self) -> Vec<String> {
        let mut args = vec!["--verbose".to_owned(); usize::from(self.verbose.min(2))];
        if self.show_text {
            args.push("--showtext".to_owned());
        }
        if let Some(year) = self.year {
            args.push("--year".to_owned());
            args.push(year.to_string());
        }
        if self.submit_check {
            args.push("--submitcheck".to_owned());
        }
        args
    }
}

/// Run idnits on a text draft.
///
/// The report comes from stdout with the scratch directory removed. A
/// failing run with nothing on stdout is an error carrying stderr.
pub fn idnits(
    toolchain: &Toolchain,
    text: &WorkingFile,
    options: &IdnitsOptions,
) -> Result<String, PipelineError> {
    tracing::debug!(?options, "Running idnits");

    let mut args = options.args();
    args.push(path_arg(text.path()));
    let output = toolchain.run(Tool::Idnits, &args)?;

    if !output.stdout.is_empty() {
        return Ok(strip_dir(&output.stdout_lossy(), text.path()));
    }
    if output.is_success() {
        return Ok(String::new());
    }

    let stderr = strip_dir(&output.stderr_lossy(), text.path());
    let message = if stderr.trim().is_empty() {
        "Error occurred while running idnits".to_owned()
    } else {
        stderr
    };
    tracing::info!(%message, "idnits failed");
    Err(PipelineError::Tool {
        tool: Tool::Idnits,
        message,
    })
}

/// Validate XML: upgrade if needed, collect xml2rfc diagnostics, run idnits.
///
/// An xml2rfc failure is not an error here; its diagnostics are the report.
pub fn validate_xml(
    toolchain: &Toolchain,
    xml: &WorkingFile,
) -> Result<ValidationReport, PipelineError> {
    let normalized = normalize_to_current(toolchain, xml)?;
    let source = &normalized.file;
    let text = WorkingFile::new(source.sibling("txt"));

    tracing::debug!("Running xml2rfc");
    let args = vec![
        "--out".to_owned(),
        path_arg(text.path()),
        path_arg(source.path()),
    ];
    let output = toolchain.run(Tool::Xml2rfc, &args)?;
    if !output.is_success() {
        tracing::info!(code = ?output.code, "xml2rfc reported errors");
    }

    let mut log = normalized.log.unwrap_or_default();
    log.update(DiagnosticLog::from_output(&output, source.path()));

    let idnits = match idnits(toolchain, &text, &IdnitsOptions::default()) {
        Ok(report) => report,
        Err(PipelineError::Tool { message, .. }) => message,
        Err(e) => return Err(e),
    };

    Ok(ValidationReport { log, idnits })
}

/// Validate any supported source, converting it to XML first.
pub fn validate(toolchain: &Toolchain, file: &WorkingFile) -> Result<ValidationReport, PipelineError> {
    let xml = process_source(toolchain, file)?;
    validate_xml(toolchain, &xml.file)
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

    #[test]
    fn test_idnits_args() {
        let options = IdnitsOptions {
            verbose: 5,
            show_text: true,
            year: Some(2026),
            submit_check: true,
        };
        assert_eq!(
            options.args(),
            vec![
                "--verbose".to_owned(),
                "--verbose".to_owned(),
                "--showtext".to_owned(),
                "--year".to_owned(),
                "2026".to_owned(),
                "--submitcheck".to_owned(),
            ]
        );
        assert!(IdnitsOptions::default().args().is_empty());
    }

    #[test]
    fn test_idnits_strips_dir() {
        let text = WorkingFile::new("/scratch/1234/draft-a-00.txt");
        let runner = Arc::new(MockRunner::new().with_output(
            "idnits",
            ProcessOutput::exited(0, "  Checking nits in /scratch/1234/draft-a-00.txt\n", ""),
        ));

        let report =
            idnits(&MockRunner::toolchain(&runner), &text, &IdnitsOptions::default()).unwrap();

        assert_eq!(report, "  Checking nits in draft-a-00.txt\n");
    }

    #[test]
    fn test_idnits_failure_without_stdout() {
        let text = WorkingFile::new("/scratch/1234/draft-a-00.txt");
        let runner = Arc::new(MockRunner::new().with_output("idnits", ProcessOutput::exited(1, "", "")));

        let err = idnits(&MockRunner::toolchain(&runner), &text, &IdnitsOptions::default())
            .unwrap_err();

        assert_eq!(err.to_string(), "Error occurred while running idnits");
        assert_eq!(err.tool(), Some(Tool::Idnits));
    }

    #[test]
    fn test_validate_legacy_xml_merges_upgrade_log_first() {
        let temp = TempDir::new().unwrap();
        let xml = temp.path().join("draft-a-00.xml");
        fs::write(&xml, "<rfc><front/></rfc>").unwrap();

        let runner = Arc::new(
            MockRunner::new()
                .with_handler("xml2rfc", |args| {
                    let out = output_arg(args).unwrap();
                    if args[0] == "--v2v3" {
                        fs::write(out, r#"<rfc version="3"><front/></rfc>"#).unwrap();
                        return Ok(ProcessOutput::exited(0, "", "Warning: upgraded <seriesInfo>\n"));
                    }
                    fs::write(out, "text").unwrap();
                    let log = format!(
                        "{d}(3): Warning: Found non-ascii characters in title\n{d}(9): Error: Missing <abstract>\n",
                        d = out.with_extension("xml").display()
                    );
                    Ok(ProcessOutput::exited(1, "", log))
                })
                .with_output("idnits", ProcessOutput::exited(0, "No nits found.\n", "")),
        );

        let report = validate(&MockRunner::toolchain(&runner), &WorkingFile::new(&xml)).unwrap();

        assert_eq!(report.log.warnings, vec!["upgraded <seriesInfo>".to_owned()]);
        assert_eq!(report.log.errors, vec!["(9) Missing <abstract>".to_owned()]);
        assert_eq!(
            report.log.bare_unicode,
            vec!["(3) Found non-ascii characters in title".to_owned()]
        );
        assert_eq!(report.idnits, "No nits found.\n");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("errors").is_some());
        assert!(json.get("idnits").is_some());
    }

    #[test]
    fn test_validate_reports_idnits_failure_inline() {
        let temp = TempDir::new().unwrap();
        let xml = temp.path().join("draft-b-00.xml");
        fs::write(&xml, r#"<rfc version="3"/>"#).unwrap();

        let runner = Arc::new(
            MockRunner::new()
                .with_output("xml2rfc", ProcessOutput::exited(0, "", ""))
                .with_output("idnits", ProcessOutput::exited(2, "", "idnits: no such file\n")),
        );

        let report = validate_xml(&MockRunner::toolchain(&runner), &WorkingFile::new(&xml)).unwrap();

        assert!(report.log.is_empty());
        assert_eq!(report.idnits, "idnits: no such file\n");
    }
}

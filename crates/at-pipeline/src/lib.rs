//! Conversion, rendering, checking and diff pipeline for Internet-Draft sources.
//!
//! Every stage shells out to an external tool through a [`Runner`] carried by
//! a [`Toolchain`], and works on [`WorkingFile`]s that live in one scratch
//! directory per request.
//!
//! # Architecture
//!
//! - [`Runner`] trait with [`ProcessRunner`] for real processes and
//!   [`MockRunner`] for tests (behind the `mock` feature)
//! - Format converters ([`kramdown2xml`], [`mmark2xml`], [`rst2xml`],
//!   [`txt2xml`]) dispatched through [`SourceFormat::classify`]
//! - [`normalize_to_current`] upgrading legacy XML
//! - [`DiagnosticLog`] turning renderer output into errors and warnings
//! - [`to_canonical_text`] driving any source to plain text
//! - [`diff`] with iddiff and an rfcdiff fallback
//! - [`validate`], [`idnits`], [`svgcheck`], ABNF tools and [`tool_versions`]
//!
//! # Example
//!
//! ```ignore
//! use at_pipeline::{ExtractionMode, ScratchArea, Toolchain, UploadPurpose, to_canonical_text};
//!
//! let toolchain = Toolchain::system();
//! let scratch = ScratchArea::new("/var/tmp/at");
//! let file = scratch.save_upload("draft-foo-00.md", &bytes, UploadPurpose::Document)?;
//! let text = to_canonical_text(&toolchain, &file, ExtractionMode::Full)?;
//! ```

mod abnf;
mod convert;
mod diff;
mod error;
mod logs;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod normalize;
mod render;
mod runner;
mod scratch;
mod svgcheck;
mod text;
mod tool;
mod validate;
mod version;

pub use abnf::{AbnfParse, NO_AEX_OUTPUT, extract_abnf, parse_abnf};
pub use convert::{
    CONVERTERS, ConversionResult, ConvertFn, SourceFormat, converter_for, kramdown2xml, md2xml,
    mmark2xml, rst2xml, to_xml, txt2xml,
};
pub use diff::{DiffMode, DiffRequest, diff};
pub use error::PipelineError;
pub use logs::{DiagnosticLog, strip_dir, strip_dirs};
#[cfg(any(test, feature = "mock"))]
pub use mock::{Invocation, MockRunner, output_arg};
pub use normalize::{CURRENT_VERSION, LEGACY_VERSION, normalize_to_current, schema_version};
pub use render::{ParseRenderFormatError, RenderFormat, process_source, render, render_document};
pub use runner::{ProcessOutput, ProcessRunner, Runner, RunnerError};
pub use scratch::{
    ScratchArea, ScratchError, UploadPurpose, WorkingFile, is_allowed_file, secure_filename,
};
pub use svgcheck::{SvgCheckReport, svgcheck};
pub use text::{ExtractionMode, to_canonical_text};
pub use tool::{Tool, Toolchain};
pub use validate::{IdnitsOptions, ValidationReport, idnits, validate, validate_xml};
pub use version::{tool_version, tool_versions};

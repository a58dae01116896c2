//! CLI command implementations.

pub(crate) mod abnf;
pub(crate) mod diff;
pub(crate) mod idnits;
pub(crate) mod render;
pub(crate) mod svgcheck;
pub(crate) mod validate;
pub(crate) mod versions;

pub(crate) use abnf::AbnfCommand;
pub(crate) use diff::DiffArgs;
pub(crate) use idnits::IdnitsArgs;
pub(crate) use render::RenderArgs;
pub(crate) use svgcheck::SvgcheckArgs;
pub(crate) use validate::ValidateArgs;

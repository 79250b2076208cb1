//! Output blocks
//!
//! Blocks that produce the final artifact.

mod report_generator;

pub use report_generator::{Report, ReportGeneratorBlock};

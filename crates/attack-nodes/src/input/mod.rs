//! Input blocks
//!
//! Blocks that bring ATT&CK data into the workflow.

mod stix_loader;

pub use stix_loader::StixLoaderBlock;

//! Local batch conversion: discovery and the sequential driver

pub mod batch;
pub mod scanner;

pub use batch::{BatchConverter, ConversionOutcome};
pub use scanner::{scan, supported_extensions, ScanItem};

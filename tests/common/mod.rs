#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from foodscan for tests
pub use foodscan::config::{InputConfig, ScannerConfig, StrategyKind};
pub use foodscan::detection::ocr::PageLayout;
pub use foodscan::{Detection, Pipeline, ScanError, Scanner, Symbology, ValidatedBarcode};

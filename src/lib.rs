pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod validation;

pub use config::{load_config, save_config, ScannerConfig, StrategyKind};
pub use detection::{build_standard_pipeline, Scanner};
pub use error::ScanError;
pub use models::{Detection, Region, Symbology, ValidatedBarcode};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineStep};
pub use validation::{check_digit, validate_barcode, validate_manual_entry, ManualEntryError};

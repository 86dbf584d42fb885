pub mod contours;
pub mod morphology;
pub mod ocr;
pub mod preprocessing;
pub mod steps;
pub mod strategies;
pub mod symbology;

use crate::config::{InputConfig, ScannerConfig};
use crate::error::ScanError;
use crate::models::Detection;
use crate::pipeline::Pipeline;
use image::DynamicImage;
use ocr::{DigitRecognizer, OcrsRecognizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use steps::{DirectDecodeStep, OcrStep};
use strategies::strategy_for;
use symbology::{RxingDecoder, SymbolDecoder};
use tracing::debug;

/// Entry point for scanning product photos.
///
/// Decodes and normalizes the input, then hands it to the detection pipeline.
pub struct Scanner {
    pipeline: Pipeline,
    input: InputConfig,
}

impl Scanner {
    /// Scanner with the rxing decoder and ocrs recognizer described by `config`
    pub fn from_config(config: &ScannerConfig) -> Self {
        let recognizer = Arc::new(OcrsRecognizer::new(config.ocr.clone()));
        let decoder = Arc::new(RxingDecoder::new(config.direct.try_harder));
        Self::with_pipeline(
            build_standard_pipeline(config, recognizer, decoder),
            config.input.clone(),
        )
    }

    pub fn with_pipeline(pipeline: Pipeline, input: InputConfig) -> Self {
        Self { pipeline, input }
    }

    /// Save intermediate images under `output_dir` (must be empty or absent)
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Scan an encoded image (JPEG, PNG, ...)
    pub fn scan_bytes(&self, bytes: &[u8]) -> Result<Option<Detection>, ScanError> {
        let img = preprocessing::decode_image(bytes, self.input.apply_exif_orientation)?;
        self.scan_owned(img)
    }

    pub fn scan_file(&self, path: impl AsRef<Path>) -> Result<Option<Detection>, ScanError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.scan_bytes(&bytes)
    }

    /// Scan an already decoded image. Orientation is taken as is.
    pub fn scan_image(&self, img: &DynamicImage) -> Result<Option<Detection>, ScanError> {
        self.scan_owned(img.clone())
    }

    fn scan_owned(&self, img: DynamicImage) -> Result<Option<Detection>, ScanError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(ScanError::EmptyImage {
                width: img.width(),
                height: img.height(),
            });
        }

        let img = preprocessing::normalize_width(img, self.input.target_width);
        debug!("Scanning {}x{} image", img.width(), img.height());
        self.pipeline.run(&img)
    }
}

/// Build a standard detection pipeline: direct decoding (if enabled), then
/// the configured OCR strategies in order
pub fn build_standard_pipeline(
    config: &ScannerConfig,
    recognizer: Arc<dyn DigitRecognizer>,
    decoder: Arc<dyn SymbolDecoder>,
) -> Pipeline {
    let mut pipeline = Pipeline::new();

    if config.direct.enabled {
        pipeline = pipeline.add_step(Arc::new(DirectDecodeStep::new(decoder)));
    }

    for &kind in &config.strategies {
        pipeline = pipeline.add_step(Arc::new(OcrStep::new(
            strategy_for(kind),
            recognizer.clone(),
        )));
    }

    pipeline
}

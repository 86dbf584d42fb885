use crate::detection::ocr::{extract_digits, DigitRecognizer};
use crate::detection::preprocessing;
use crate::detection::strategies::VariantSource;
use crate::detection::symbology::SymbolDecoder;
use crate::models::{Detection, ValidatedBarcode};
use crate::pipeline::{PipelineContext, PipelineStep};
use crate::validation::validate_barcode;
use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Read the bars directly with a symbology decoder
pub struct DirectDecodeStep {
    decoder: Arc<dyn SymbolDecoder>,
}

impl DirectDecodeStep {
    pub fn new(decoder: Arc<dyn SymbolDecoder>) -> Self {
        Self { decoder }
    }
}

impl PipelineStep for DirectDecodeStep {
    fn process(&self, image: &DynamicImage, context: &PipelineContext) -> Result<Option<Detection>> {
        let gray = preprocessing::to_grayscale(image);
        if let Err(e) = context.save_debug_image(1, &gray) {
            warn!("{:#}", e);
        }

        let Some(symbol) = self.decoder.decode(&gray)? else {
            return Ok(None);
        };

        // The decoder has verified the checksum; only the length classification is left
        match ValidatedBarcode::from_decoded_payload(&symbol.payload) {
            Some(barcode) => Ok(Some(
                Detection::new(barcode, self.name()).with_raw_format(symbol.format),
            )),
            None => {
                info!(
                    payload = %symbol.payload,
                    format = %symbol.format,
                    "Decoded symbol is not a product code, falling back to OCR"
                );
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        "Direct Decode"
    }
}

/// Preprocess with a strategy, then OCR every variant under each layout.
///
/// The first digit string that validates ends the step.
pub struct OcrStep<S> {
    source: S,
    recognizer: Arc<dyn DigitRecognizer>,
}

impl<S: VariantSource> OcrStep<S> {
    pub fn new(source: S, recognizer: Arc<dyn DigitRecognizer>) -> Self {
        Self { source, recognizer }
    }
}

impl<S: VariantSource> PipelineStep for OcrStep<S> {
    fn process(&self, image: &DynamicImage, context: &PipelineContext) -> Result<Option<Detection>> {
        // Fails the whole strategy when no engine is available
        self.recognizer.warm_up()?;

        let gray = preprocessing::to_grayscale(image);
        let variants = self.source.variants(&gray);
        debug!("{}: {} variants", self.name(), variants.len());

        for (i, variant) in variants.iter().enumerate() {
            if variant.width() == 0 || variant.height() == 0 {
                continue;
            }
            if let Err(e) = context.save_debug_image(i + 1, variant) {
                warn!("{:#}", e);
            }

            for &layout in self.source.layouts() {
                let text = match self.recognizer.recognize(variant, layout) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!("{} variant {} ({}) failed: {:#}", self.name(), i + 1, layout.name(), e);
                        continue;
                    }
                };

                let digits = extract_digits(&text);
                if digits.is_empty() {
                    continue;
                }
                trace!(variant = i + 1, layout = layout.name(), digits = %digits, "Candidate");

                if let Some(barcode) = validate_barcode(&digits) {
                    return Ok(Some(Detection::new(barcode, self.name())));
                }
            }
        }

        Ok(None)
    }

    fn name(&self) -> &str {
        self.source.name()
    }
}

use anyhow::Result;
use image::GrayImage;
use rxing::common::HybridBinarizer;
use rxing::{
    BinaryBitmap, DecodeHintType, DecodeHintValue, Luma8LuminanceSource, MultiFormatReader,
    Reader,
};
use std::collections::HashMap;
use tracing::debug;

/// A symbol read straight from the bars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub payload: String,
    /// Decoder's own name for the symbology, e.g. "EAN_13"
    pub format: String,
}

/// Direct (non-OCR) barcode reader.
///
/// `Ok(None)` means no symbol was found. Decoders are expected to verify
/// the symbology checksum themselves.
pub trait SymbolDecoder: Send + Sync {
    fn decode(&self, image: &GrayImage) -> Result<Option<DecodedSymbol>>;
}

/// [`SymbolDecoder`] backed by rxing's multi-format reader.
///
/// Every format rxing knows is tried. Payloads that are not retail codes
/// are filtered out by the caller.
pub struct RxingDecoder {
    pub try_harder: bool,
}

impl RxingDecoder {
    pub fn new(try_harder: bool) -> Self {
        Self { try_harder }
    }

    fn hints(&self) -> HashMap<DecodeHintType, DecodeHintValue> {
        let mut hints = HashMap::new();
        hints.insert(
            DecodeHintType::TRY_HARDER,
            DecodeHintValue::TryHarder(self.try_harder),
        );
        hints
    }
}

impl SymbolDecoder for RxingDecoder {
    fn decode(&self, image: &GrayImage) -> Result<Option<DecodedSymbol>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let source = Luma8LuminanceSource::new(image.as_raw().clone(), width, height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiFormatReader::default();

        match reader.decode_with_hints(&mut bitmap, &self.hints()) {
            Ok(result) => Ok(Some(DecodedSymbol {
                payload: result.getText().to_string(),
                format: format!("{:?}", result.getBarcodeFormat()),
            })),
            Err(e) => {
                if !matches!(e, rxing::Exceptions::NotFoundException(_)) {
                    debug!("Symbol decode failed: {:?}", e);
                }
                Ok(None)
            }
        }
    }
}

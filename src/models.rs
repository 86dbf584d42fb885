use image::GrayImage;
use serde::Serialize;
use std::fmt;

/// Bounding box of an extracted contour
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Polygon area of the contour (not of the bounding box)
    pub area: f32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f32 {
        let h = self.height() as f32;
        if h == 0.0 {
            return 0.0;
        }
        self.width() as f32 / h
    }

    /// Grow the box by `padding` on every side, clamped to the image bounds
    pub fn padded(&self, padding: u32, img_width: u32, img_height: u32) -> Region {
        Region {
            min_x: self.min_x.saturating_sub(padding),
            min_y: self.min_y.saturating_sub(padding),
            max_x: (self.max_x + padding).min(img_width.saturating_sub(1)),
            max_y: (self.max_y + padding).min(img_height.saturating_sub(1)),
            area: self.area,
        }
    }

    /// Cut the region out of `img`. Returns None when the box falls outside the image.
    pub fn crop(&self, img: &GrayImage) -> Option<GrayImage> {
        if self.min_x >= img.width() || self.min_y >= img.height() {
            return None;
        }
        let width = self.width().min(img.width() - self.min_x);
        let height = self.height().min(img.height() - self.min_y);

        if width == 0 || height == 0 {
            return None;
        }

        Some(image::imageops::crop_imm(img, self.min_x, self.min_y, width, height).to_image())
    }
}

/// Barcode symbologies the validator knows how to classify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Symbology {
    #[serde(rename = "EAN-13")]
    Ean13,
    #[serde(rename = "UPC-A")]
    UpcA,
    #[serde(rename = "EAN-8")]
    Ean8,
    #[serde(rename = "ITF-14")]
    Itf14,
    Generic,
}

impl Symbology {
    /// Classify a digit string by its length alone
    pub fn from_length(len: usize) -> Option<Self> {
        match len {
            13 => Some(Symbology::Ean13),
            12 => Some(Symbology::UpcA),
            8 => Some(Symbology::Ean8),
            14 => Some(Symbology::Itf14),
            9..=11 => Some(Symbology::Generic),
            _ => None,
        }
    }

    /// Fixed code length, or None for `Generic`
    pub fn expected_length(&self) -> Option<usize> {
        match self {
            Symbology::Ean13 => Some(13),
            Symbology::UpcA => Some(12),
            Symbology::Ean8 => Some(8),
            Symbology::Itf14 => Some(14),
            Symbology::Generic => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN-13",
            Symbology::UpcA => "UPC-A",
            Symbology::Ean8 => "EAN-8",
            Symbology::Itf14 => "ITF-14",
            Symbology::Generic => "Generic",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A structurally valid barcode.
///
/// Only constructed by the validator (or from a direct decoder payload), so
/// `code` is always ASCII digits and its length fits the symbology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedBarcode {
    code: String,
    symbology: Symbology,
    length: usize,
}

impl ValidatedBarcode {
    pub(crate) fn new(code: &str, symbology: Symbology) -> Self {
        Self {
            code: code.to_string(),
            symbology,
            length: code.len(),
        }
    }

    /// Classify a payload that a symbology decoder already checksum-verified.
    /// Anything that is not 8-14 ASCII digits is refused.
    pub fn from_decoded_payload(payload: &str) -> Option<Self> {
        if !payload.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let symbology = Symbology::from_length(payload.len())?;
        Some(Self::new(payload, symbology))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Successful pipeline output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub barcode: ValidatedBarcode,
    /// Name of the pipeline step that produced the code
    pub strategy: String,
    /// Symbology label reported by the direct decoder, if that is where the code came from
    pub raw_format: Option<String>,
}

impl Detection {
    pub fn new(barcode: ValidatedBarcode, strategy: impl Into<String>) -> Self {
        Self {
            barcode,
            strategy: strategy.into(),
            raw_format: None,
        }
    }

    pub fn with_raw_format(mut self, format: impl Into<String>) -> Self {
        self.raw_format = Some(format.into());
        self
    }
}

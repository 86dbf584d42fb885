//! OCR preprocessing strategies.
//!
//! Each strategy turns one grayscale image into a list of variants (filtered
//! copies or cropped regions) and names the page layouts its variants should
//! be read under. Strategies hold no state between calls.

use crate::config::StrategyKind;
use crate::detection::contours::{external_regions, largest, RegionFilter};
use crate::detection::morphology::{black_hat, close_rect};
use crate::detection::ocr::PageLayout;
use crate::detection::preprocessing::{
    adaptive_threshold, apply_blur, clahe, denoise, detect_edges, kernel_sigma,
    median_blur, otsu_binarize, sobel_magnitude, AdaptiveMethod,
};
use crate::models::Region;
use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};

/// Produces the images a strategy wants recognized
pub trait VariantSource: Send + Sync {
    fn name(&self) -> &str;

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage>;

    fn layouts(&self) -> &[PageLayout];
}

/// Build the strategy for a configured kind
pub fn strategy_for(kind: StrategyKind) -> Box<dyn VariantSource> {
    match kind {
        StrategyKind::DenoiseContrast => Box::new(DenoiseContrast),
        StrategyKind::Zoning => Box::new(Zoning),
        StrategyKind::AdaptiveThreshold => Box::new(AdaptiveThreshold),
        StrategyKind::Contours => Box::new(ContourRegions),
        StrategyKind::BlackHat => Box::new(BlackHatRegions),
        StrategyKind::Gradient => Box::new(GradientRegions),
    }
}

impl<T: VariantSource + ?Sized> VariantSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        (**self).variants(gray)
    }

    fn layouts(&self) -> &[PageLayout] {
        (**self).layouts()
    }
}

/// Whole-image cleanups: denoise, local contrast, blur + Otsu, closing
pub struct DenoiseContrast;

impl VariantSource for DenoiseContrast {
    fn name(&self) -> &str {
        "Denoise Contrast"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        vec![
            denoise(gray, 3.0),
            clahe(gray, 2.0, 8),
            otsu_binarize(&apply_blur(gray, kernel_sigma(5))),
            close_rect(gray, 3, 3),
        ]
    }

    fn layouts(&self) -> &[PageLayout] {
        &[
            PageLayout::Block,
            PageLayout::SingleLine,
            PageLayout::SingleWord,
            PageLayout::RawLine,
        ]
    }
}

/// Overlapping horizontal and vertical bands plus a centre crop.
///
/// The printed digits usually sit in a strip under the bars; reading a band
/// at a time keeps unrelated label text out of the recognizer.
pub struct Zoning;

const ZONE_BANDS: u32 = 5;

impl Zoning {
    /// Bands of `extent / 4` with a quarter-band lead-in and half-band overlap
    fn bands(extent: u32) -> Vec<(u32, u32)> {
        let band = extent / 4;
        (0..ZONE_BANDS)
            .map(|i| {
                let start = (i * band).saturating_sub(band / 4);
                let end = (start + band + band / 2).min(extent);
                (start, end)
            })
            .collect()
    }

    /// Span of `size / 2` on either side of the midpoint of `extent`
    fn centred(extent: u32, size: u32) -> (u32, u32) {
        let half = size / 2;
        (extent / 2 - half, 2 * half)
    }

    /// A third of each dimension, centred
    fn centre(gray: &GrayImage) -> Option<GrayImage> {
        let (x, w) = Self::centred(gray.width(), gray.width() / 3);
        let (y, h) = Self::centred(gray.height(), gray.height() / 3);
        Self::crop(gray, x, y, w, h)
    }

    fn crop(gray: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> Option<GrayImage> {
        if w == 0 || h == 0 || x >= gray.width() || y >= gray.height() {
            return None;
        }
        Some(image::imageops::crop_imm(gray, x, y, w, h).to_image())
    }
}

impl VariantSource for Zoning {
    fn name(&self) -> &str {
        "Zoning"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        let (width, height) = gray.dimensions();
        let mut zones = Vec::new();

        for (start, end) in Self::bands(height) {
            zones.extend(Self::crop(gray, 0, start, width, end.saturating_sub(start)));
        }
        for (start, end) in Self::bands(width) {
            zones.extend(Self::crop(gray, start, 0, end.saturating_sub(start), height));
        }
        zones.extend(Self::centre(gray));

        zones
    }

    fn layouts(&self) -> &[PageLayout] {
        &[PageLayout::Block, PageLayout::SingleLine, PageLayout::SingleWord]
    }
}

/// Local thresholding for uneven lighting
pub struct AdaptiveThreshold;

const ADAPTIVE_PARAMS: [(AdaptiveMethod, u32, i16); 4] = [
    (AdaptiveMethod::Gaussian, 11, 7),
    (AdaptiveMethod::Gaussian, 15, 10),
    (AdaptiveMethod::Mean, 11, 7),
    (AdaptiveMethod::Mean, 15, 10),
];

impl VariantSource for AdaptiveThreshold {
    fn name(&self) -> &str {
        "Adaptive Threshold"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        ADAPTIVE_PARAMS
            .iter()
            .map(|&(method, block, c)| {
                let thresh = adaptive_threshold(gray, method, block, c);
                median_blur(&close_rect(&thresh, 2, 2), 3)
            })
            .collect()
    }

    fn layouts(&self) -> &[PageLayout] {
        &[PageLayout::Block, PageLayout::SingleLine]
    }
}

/// Crop every region kept by `filter` out of `gray`, largest contours first
fn crop_regions(
    gray: &GrayImage,
    binary: &GrayImage,
    keep: usize,
    filter: &RegionFilter,
    padding: u32,
) -> Vec<GrayImage> {
    let (width, height) = gray.dimensions();
    largest(external_regions(binary), keep)
        .iter()
        .filter(|r| filter.accepts(r))
        .map(|r| r.padded(padding, width, height))
        .filter_map(|r: Region| r.crop(gray))
        .collect()
}

/// Barcode-shaped regions found on Canny edge maps
pub struct ContourRegions;

const CANNY_THRESHOLDS: [(f32, f32); 3] = [(50.0, 150.0), (30.0, 100.0), (100.0, 200.0)];

impl VariantSource for ContourRegions {
    fn name(&self) -> &str {
        "Contours"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        let filter = RegionFilter {
            min_width: 80,
            min_height: 20,
            min_aspect: Some(1.5),
            min_area: Some(1000.0),
        };

        CANNY_THRESHOLDS
            .iter()
            .flat_map(|&(low, high)| {
                let edges = detect_edges(gray, low, high);
                crop_regions(gray, &edges, 10, &filter, 10)
            })
            .collect()
    }

    fn layouts(&self) -> &[PageLayout] {
        &[PageLayout::Block, PageLayout::SingleLine, PageLayout::SingleWord]
    }
}

/// Dark strokes on a light label, picked out with a wide black-hat
pub struct BlackHatRegions;

impl VariantSource for BlackHatRegions {
    fn name(&self) -> &str {
        "Black Hat"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        let thresh = otsu_binarize(&black_hat(gray, 21, 7));
        let filter = RegionFilter {
            min_width: 100,
            min_height: 30,
            ..Default::default()
        };
        crop_regions(gray, &thresh, 5, &filter, 0)
    }

    fn layouts(&self) -> &[PageLayout] {
        &[PageLayout::Block, PageLayout::SingleLine]
    }
}

/// Wide areas of strong gradient, where bars and digits cluster
pub struct GradientRegions;

impl VariantSource for GradientRegions {
    fn name(&self) -> &str {
        "Gradient"
    }

    fn variants(&self, gray: &GrayImage) -> Vec<GrayImage> {
        let edges = threshold(&sobel_magnitude(gray), 50, ThresholdType::Binary);
        let closed = close_rect(&edges, 15, 5);
        let filter = RegionFilter {
            min_width: 80,
            min_height: 25,
            min_aspect: Some(2.0),
            min_area: None,
        };
        crop_regions(gray, &closed, 5, &filter, 0)
    }

    fn layouts(&self) -> &[PageLayout] {
        &[PageLayout::Block, PageLayout::SingleWord]
    }
}

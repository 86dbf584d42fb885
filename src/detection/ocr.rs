use crate::config::OcrConfig;
use anyhow::{anyhow, Result};
use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, OcrInput};
use rten::Model;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Characters the recognizer is allowed to emit
pub const DIGITS: &str = "0123456789";

/// How the recognizer should segment an image before reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Uniform block of text, lines joined in reading order
    Block,
    /// Every detected word read as one line
    SingleLine,
    /// Only the most digit-heavy word
    SingleWord,
    /// Lines read and concatenated with no separators
    RawLine,
}

impl PageLayout {
    pub fn name(&self) -> &'static str {
        match self {
            PageLayout::Block => "block",
            PageLayout::SingleLine => "single_line",
            PageLayout::SingleWord => "single_word",
            PageLayout::RawLine => "raw_line",
        }
    }
}

/// Text recognition backend.
///
/// The pipeline only needs raw text back. Digit filtering and validation
/// happen on the caller's side, so implementations may return anything.
pub trait DigitRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage, layout: PageLayout) -> Result<String>;

    /// Load models or other expensive state ahead of the first `recognize` call
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// Keep only ASCII digits
pub fn extract_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Order items by their leftmost x coordinate
pub fn sort_left_to_right<T>(items: &mut [T], left: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| left(a).total_cmp(&left(b)));
}

/// Load the ocrs detection and recognition models
pub fn init_ocr_engine(config: &OcrConfig) -> Result<OcrEngine> {
    if !config.detection_model.exists() || !config.recognition_model.exists() {
        anyhow::bail!(
            "OCR models not found. Download them with ocrs-cli or point [ocr] in the config at them.\n\
             Expected locations:\n  - {}\n  - {}",
            config.detection_model.display(),
            config.recognition_model.display()
        );
    }

    let detection_model = Model::load_file(&config.detection_model)?;
    let recognition_model = Model::load_file(&config.recognition_model)?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        allowed_chars: Some(DIGITS.to_string()),
        ..Default::default()
    })?;

    Ok(engine)
}

/// [`DigitRecognizer`] backed by ocrs
pub struct OcrsRecognizer {
    config: OcrConfig,
    // Lazy-initialized on first use; the Arc lets callers drop the lock before recognizing
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            engine: Mutex::new(None),
        }
    }

    fn engine(&self) -> Result<Arc<OcrEngine>> {
        let mut guard = self
            .engine
            .lock()
            .map_err(|_| anyhow!("OCR engine lock poisoned"))?;

        if let Some(engine) = guard.as_ref() {
            return Ok(engine.clone());
        }

        info!("Initializing OCR engine...");
        let engine = Arc::new(init_ocr_engine(&self.config)?);
        info!("OCR engine initialized successfully");
        *guard = Some(engine.clone());
        Ok(engine)
    }

    fn read_lines(engine: &OcrEngine, input: &OcrInput, one_line: bool) -> Result<Vec<String>> {
        let mut words = engine.detect_words(input)?;
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let lines = if one_line {
            // Detection order is arbitrary; a single line must read left to right
            sort_left_to_right(&mut words, |word| {
                word.corners()
                    .iter()
                    .map(|corner| corner.x)
                    .fold(f32::INFINITY, f32::min)
            });
            vec![words]
        } else {
            engine.find_text_lines(input, &words)
        };

        let recognized = engine.recognize_text(input, &lines)?;
        Ok(recognized
            .into_iter()
            .flatten()
            .map(|line| line.to_string())
            .collect())
    }
}

impl DigitRecognizer for OcrsRecognizer {
    fn warm_up(&self) -> Result<()> {
        self.engine().map(|_| ())
    }

    fn recognize(&self, image: &GrayImage, layout: PageLayout) -> Result<String> {
        let engine = self.engine()?;

        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| anyhow!("Failed to create image source: {}", e))?;
        let input = engine.prepare_input(source)?;

        let text = match layout {
            PageLayout::Block => engine.get_text(&input)?,
            PageLayout::SingleLine => Self::read_lines(&engine, &input, true)?.join(" "),
            PageLayout::RawLine => Self::read_lines(&engine, &input, false)?.concat(),
            PageLayout::SingleWord => Self::read_lines(&engine, &input, false)?
                .iter()
                .flat_map(|line| line.split_whitespace())
                .max_by_key(|word| word.chars().filter(|c| c.is_ascii_digit()).count())
                .unwrap_or_default()
                .to_string(),
        };

        debug!(layout = layout.name(), text = %text.trim(), "OCR output");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_digits() {
        assert_eq!(extract_digits("EAN 5 901234 123457\n"), "5901234123457");
        assert_eq!(extract_digits("no digits"), "");
        assert_eq!(extract_digits("٣٤ 12"), "12");
    }

    #[test]
    fn test_sort_left_to_right() {
        // (left edge, text) in detection order
        let mut words = vec![(210.5, "3"), (12.0, "5"), (-1.0, "0"), (98.25, "9")];
        sort_left_to_right(&mut words, |w| w.0);
        let text: String = words.iter().map(|w| w.1).collect();
        assert_eq!(text, "0593");
    }

    #[test]
    fn test_missing_models_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig {
            detection_model: dir.path().join("missing-detection.rten"),
            recognition_model: dir.path().join("missing-recognition.rten"),
        };
        let err = init_ocr_engine(&config).err().unwrap();
        assert!(err.to_string().contains("OCR models not found"));

        let recognizer = OcrsRecognizer::new(config);
        assert!(recognizer.warm_up().is_err());
    }
}

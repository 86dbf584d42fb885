//! Scanner configuration
//!
//! Stored as TOML. Every field has a default, so a config file only needs to
//! name the values it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// OCR fallback strategies, tried in this order after direct decoding
    pub strategies: Vec<StrategyKind>,
    /// Normalization applied to uploaded images
    pub input: InputConfig,
    /// Direct symbology decoder
    pub direct: DirectDecodeConfig,
    /// OCR engine model locations
    pub ocr: OcrConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::ALL.to_vec(),
            input: InputConfig::default(),
            direct: DirectDecodeConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

/// Input normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Images wider than this are downscaled to it
    pub target_width: u32,
    /// Rotate according to the EXIF orientation tag
    pub apply_exif_orientation: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            target_width: 1000,
            apply_exif_orientation: true,
        }
    }
}

/// Direct decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectDecodeConfig {
    pub enabled: bool,
    /// Spend more time looking for a symbol (rotations, more rows)
    pub try_harder: bool,
}

impl Default for DirectDecodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            try_harder: true,
        }
    }
}

/// Locations of the ocrs detection and recognition models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub detection_model: PathBuf,
    pub recognition_model: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        let model_dir = dirs::cache_dir().unwrap_or_default().join("ocrs");
        Self {
            detection_model: model_dir.join("text-detection.rten"),
            recognition_model: model_dir.join("text-recognition.rten"),
        }
    }
}

/// OCR fallback strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DenoiseContrast,
    Zoning,
    AdaptiveThreshold,
    Contours,
    BlackHat,
    Gradient,
}

impl StrategyKind {
    /// Default order, most reliable first
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::DenoiseContrast,
        StrategyKind::Zoning,
        StrategyKind::AdaptiveThreshold,
        StrategyKind::Contours,
        StrategyKind::BlackHat,
        StrategyKind::Gradient,
    ];
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<ScannerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ScannerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ScannerConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}

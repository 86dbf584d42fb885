use crate::error::ScanError;
use crate::models::Detection;
use anyhow::Result;
use image::{DynamicImage, GrayImage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context handed to a step while it runs
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
    /// Position of the running step, starting at 0
    pub step_index: usize,
    pub step_name: String,
}

impl PipelineContext {
    fn step_dir_name(&self) -> String {
        format!(
            "{:02}_{}",
            self.step_index + 1,
            self.step_name.to_lowercase().replace(' ', "_")
        )
    }

    /// Save an intermediate image as `NN_step_name/MM.png`. No-op unless debug is enabled.
    pub fn save_debug_image(&self, index: usize, image: &GrayImage) -> Result<()> {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };

        let step_dir_name = self.step_dir_name();
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        let filename = format!("{:02}.png", index);
        image
            .save(step_dir.join(&filename))
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        debug!("Debug: saved {}/{}", step_dir_name, filename);
        Ok(())
    }
}

/// One detection strategy.
///
/// A step either finds a barcode (`Ok(Some(_))`), finds nothing (`Ok(None)`)
/// or fails. The pipeline treats failure like "nothing found" and moves on.
pub trait PipelineStep: Send + Sync {
    fn process(&self, image: &DynamicImage, context: &PipelineContext) -> Result<Option<Detection>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Ordered list of steps, run until the first one returns a detection
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            debug: None,
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    fn save_debug_input(&self, input: &DynamicImage) -> Result<()> {
        if let Some(debug_config) = &self.debug {
            let input_dir = debug_config.output_dir.join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            input
                .save(input_dir.join("01.png"))
                .map_err(|e| anyhow::anyhow!("Failed to save debug input: {}", e))?;
            debug!("Debug: saved 00_input/01.png");
        }
        Ok(())
    }

    /// Run the steps in order on an already normalized image.
    ///
    /// Returns the first detection. `Ok(None)` means every step came up empty;
    /// only an image without pixels is an error.
    pub fn run(&self, input: &DynamicImage) -> Result<Option<Detection>, ScanError> {
        if input.width() == 0 || input.height() == 0 {
            return Err(ScanError::EmptyImage {
                width: input.width(),
                height: input.height(),
            });
        }

        if let Err(e) = self.save_debug_input(input) {
            warn!("{:#}", e);
        }

        for (step_index, step) in self.steps.iter().enumerate() {
            let context = PipelineContext {
                debug: self.debug.clone(),
                step_index,
                step_name: step.name().to_string(),
            };

            debug!("Running step: {}", step.name());
            match step.process(input, &context) {
                Ok(Some(detection)) => {
                    info!(
                        strategy = step.name(),
                        code = detection.barcode.code(),
                        symbology = %detection.barcode.symbology(),
                        "Barcode detected"
                    );
                    return Ok(Some(detection));
                }
                Ok(None) => debug!("  → {}: nothing found", step.name()),
                Err(e) => warn!("Step {} failed: {:#}", step.name(), e),
            }
        }

        info!("No barcode found after {} steps", self.steps.len());
        Ok(None)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

use image::Rgba32FImage;
use std::sync::Arc;
use std::collections::HashMap;
use anyhow::Result;
use log::{debug, info};

use crate::config::{Adjustments, ThresholdConfig};
use crate::models::Region;
use crate::overlay;
use crate::raster;

/// Data that flows through the pipeline
#[derive(Clone)]
pub struct PipelineData {
    /// The working image
    pub image: Rgba32FImage,

    /// The untouched input (shared efficiently via Arc)
    pub original: Arc<Rgba32FImage>,

    /// Regions found so far, in emission order
    pub regions: Vec<Region>,

    /// Metadata for tracking properties (e.g., "white_cells", "total_ms", etc.)
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Float(f32),
    Int(i64),
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: Rgba32FImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            regions: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Replace the working image, keeping everything else
    pub fn with_image(mut self, image: Rgba32FImage) -> Self {
        self.image = image;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.metadata.get(key) {
            Some(MetadataValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: std::path::PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pub thresholds: ThresholdConfig,
    pub adjustments: Adjustments,
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData>;

    /// Human-readable name for this step (used in log output)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new(thresholds: ThresholdConfig, adjustments: Adjustments) -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext {
                thresholds,
                adjustments,
                debug: None,
            },
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: std::path::PathBuf) -> Result<Self> {
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

        self.context.debug = Some(DebugConfig { output_dir });

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

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Save one debug image, drawing any regions found so far
    fn save_debug(&self, dir_name: &str, data: &PipelineData) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let dir = debug_config.output_dir.join(dir_name);
        std::fs::create_dir_all(&dir)?;
        let output_path = dir.join("01.png");

        let mut img = raster::to_rgba8(&data.image);
        overlay::draw_regions(&mut img, &data.regions);
        img.save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        debug!("Debug: saved {}/01.png", dir_name);
        Ok(())
    }

    /// Run the pipeline sequentially on an input image
    pub fn run(&self, input: Rgba32FImage) -> Result<PipelineData> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: Rgba32FImage, num_steps: usize) -> Result<PipelineData> {
        let mut data = PipelineData::from_image(input);
        self.save_debug("00_input", &data)?;

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            info!("Running step {}: {}", step_idx + 1, step.name());

            data = step.process(data, &self.context)?;

            let step_dir_name = format!("{:02}_{}", step_idx + 1,
                step.name().to_lowercase().replace(' ', "_"));
            self.save_debug(&step_dir_name, &data)?;

            debug!("  → {} regions", data.regions.len());
        }

        Ok(data)
    }
}

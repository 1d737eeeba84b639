pub mod config;
pub mod detection;
pub mod error;
pub mod filters;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod overlay;
pub mod pipeline;
pub mod raster;

pub use config::{Adjustments, SliderSettings, ThresholdConfig};
pub use detection::{CellDetector, Detection, SuppressedOutput};
pub use error::{ConfigError, DetectionError, DetectionResult, ForestError};
pub use filters::Filter;
pub use metrics::{DetectionTimings, ProcessingMetrics};
pub use models::{Label, Point, Rect, Region, Sample};
pub use orchestrator::{
    DetectionRequest, StageOutput, StageState, SuppressionOrchestrator,
};
pub use pipeline::{
    DebugConfig, MetadataValue, Pipeline, PipelineContext, PipelineData, PipelineStep,
};
pub use raster::{Raster, RasterMut};

use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::detection::{self, CellDetector};
use crate::filters::Filter;
use crate::metrics::ProcessingMetrics;
use crate::models::Label;
use anyhow::Result;
use std::sync::Mutex;

/// Apply one of the per-pixel colour filters
pub struct FilterStep {
    pub filter: Filter,
}

impl PipelineStep for FilterStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let filtered = self.filter.apply(&data.image, &context.adjustments);
        Ok(data.with_image(filtered))
    }

    fn name(&self) -> &str {
        self.filter.name()
    }
}

/// Union-find detection of white and red cells on the working image
#[derive(Default)]
pub struct CellDetectionStep {
    /// Timings of every run through this step
    pub metrics: Mutex<ProcessingMetrics>,
}

impl CellDetectionStep {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineStep for CellDetectionStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let detector = CellDetector::new(context.thresholds);
        let detection = detector.detect(&data.image)?;

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(&detection.timings);
        }

        let white = detection.count(Label::WhiteCell) as i64;
        let red = detection.count(Label::RedCell) as i64;
        let total_ms = detection.timings.total.as_secs_f32() * 1000.0;

        let mut data = data
            .with_metadata("white_cells", MetadataValue::Int(white))
            .with_metadata("red_cells", MetadataValue::Int(red))
            .with_metadata("total_ms", MetadataValue::Float(total_ms));
        data.regions = detection.regions;
        Ok(data)
    }

    fn name(&self) -> &str {
        "Cell Detection"
    }
}

/// Stage 1 of the cross-type variant: repaint pixels with marker colours
pub struct MarkerClassificationStep;

impl PipelineStep for MarkerClassificationStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let markers = detection::classify_stage(&data.image, &context.adjustments)?;
        Ok(data.with_image(markers))
    }

    fn name(&self) -> &str {
        "Marker Classification"
    }
}

/// Stage 2 of the cross-type variant: erase red markers touching purple ones
pub struct SuppressionStep;

impl PipelineStep for SuppressionStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let out = detection::suppression_stage(&data.image, &context.thresholds)?;

        let white = out.regions.iter().filter(|r| r.label == Label::WhiteCell).count() as i64;
        let red = out.regions.len() as i64 - white;

        let mut data = data
            .with_image(out.raster)
            .with_metadata("white_cells", MetadataValue::Int(white))
            .with_metadata("red_cells", MetadataValue::Int(red))
            .with_metadata("red_removed", MetadataValue::Int(out.stats.red_removed() as i64));
        data.regions = out.regions;
        Ok(data)
    }

    fn name(&self) -> &str {
        "Adjacency Suppression"
    }
}

/// Put the untouched input back as the working image, keeping regions
pub struct RestoreOriginalStep;

impl PipelineStep for RestoreOriginalStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let original = (*data.original).clone();
        Ok(data.with_image(original))
    }

    fn name(&self) -> &str {
        "Restore Original"
    }
}

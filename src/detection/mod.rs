pub mod bbox;
pub mod classify;
pub mod forest;
pub mod labeling;
pub mod steps;
pub mod suppression;

use std::time::Instant;

use image::Rgba32FImage;
use log::{debug, info};

use crate::config::{Adjustments, ThresholdConfig};
use crate::detection::classify::{Marker, PixelClassifier};
use crate::detection::labeling::{Component, ComponentLabeler};
use crate::detection::suppression::SuppressionStats;
use crate::error::{DetectionError, DetectionResult};
use crate::metrics::DetectionTimings;
use crate::models::{Label, Region};
use crate::raster::Raster;

/// Regions found by one synchronous detection call.
#[derive(Debug, Clone)]
pub struct Detection {
    /// White cells first, then red cells, each in discovery order.
    pub regions: Vec<Region>,
    pub timings: DetectionTimings,
}

impl Detection {
    pub fn count(&self, label: Label) -> usize {
        self.regions.iter().filter(|r| r.label == label).count()
    }
}

fn ensure_not_empty<R: Raster>(raster: &R) -> DetectionResult<()> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectionError::EmptyRaster { width, height });
    }
    Ok(())
}

/// Turn labeled components into numbered regions.
pub fn regions_from_components(components: &[Component], label: Label) -> Vec<Region> {
    components
        .iter()
        .filter_map(|c| {
            debug_assert!(!c.pixels.is_empty(), "labeled component without pixels");
            c.bounds().map(|rect| (rect, c.size()))
        })
        .enumerate()
        .map(|(i, (rect, size))| Region {
            rect,
            label,
            sequence: i as u32 + 1,
            pixel_count: size as u32,
        })
        .collect()
}

/// Union-find detector for white and red cells on a photograph.
#[derive(Debug, Clone, Copy)]
pub struct CellDetector {
    config: ThresholdConfig,
    classifier: PixelClassifier,
}

impl CellDetector {
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            config,
            classifier: PixelClassifier::new(&config),
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Regions of one label, ordered by each component's first pixel.
    pub fn detect_label<R: Raster>(&self, raster: &R, label: Label) -> DetectionResult<Vec<Region>> {
        ensure_not_empty(raster)?;
        let (width, height) = raster.dimensions();
        let components = ComponentLabeler::new(width, height).label(
            raster,
            |s| self.classifier.matches(s, label),
            self.config.min_size() as usize..=self.config.max_size() as usize,
        )?;
        Ok(regions_from_components(&components, label))
    }

    /// Detect white cells, then red cells.
    pub fn detect<R: Raster>(&self, raster: &R) -> DetectionResult<Detection> {
        let start = Instant::now();

        let white_start = Instant::now();
        let mut regions = self.detect_label(raster, Label::WhiteCell)?;
        let white_cells = white_start.elapsed();

        let red_start = Instant::now();
        let red = self.detect_label(raster, Label::RedCell)?;
        let red_cells = red_start.elapsed();

        let white_count = regions.len();
        let red_count = red.len();
        regions.extend(red);

        let timings = DetectionTimings {
            white_cells,
            red_cells,
            total: start.elapsed(),
            cells_found: regions.len(),
        };
        info!(
            "Detected {} white cells and {} red cells in {:.2} ms",
            white_count,
            red_count,
            timings.total.as_secs_f64() * 1000.0
        );

        Ok(Detection { regions, timings })
    }
}

/// Stage 1 of the cross-type variant: paint the photograph with marker colours.
pub fn classify_stage<R: Raster>(
    raster: &R,
    adjustments: &Adjustments,
) -> DetectionResult<Rgba32FImage> {
    ensure_not_empty(raster)?;
    let markers = classify::classify_markers(raster, adjustments);
    debug!(
        "Stage 1 classified {}x{} raster",
        markers.width(),
        markers.height()
    );
    Ok(markers)
}

/// Output of stage 2 of the cross-type variant.
#[derive(Debug, Clone)]
pub struct SuppressedOutput {
    pub raster: Rgba32FImage,
    pub regions: Vec<Region>,
    pub stats: SuppressionStats,
}

/// Regions of a marker raster: purple markers as white cells, red markers as red cells.
pub fn marker_regions<R: Raster>(
    raster: &R,
    config: &ThresholdConfig,
) -> DetectionResult<Vec<Region>> {
    let (width, height) = raster.dimensions();
    let labeler = ComponentLabeler::new(width, height);
    let size_range = config.min_size() as usize..=config.max_size() as usize;

    let mut regions = Vec::new();
    for marker in [Marker::Purple, Marker::Red] {
        let components = labeler.label(
            raster,
            |s| Marker::of(s) == Some(marker),
            size_range.clone(),
        )?;
        regions.extend(regions_from_components(&components, marker.label()));
    }
    Ok(regions)
}

/// Stage 2 of the cross-type variant: suppress, then emit regions.
pub fn suppression_stage<R: Raster>(
    markers: &R,
    config: &ThresholdConfig,
) -> DetectionResult<SuppressedOutput> {
    ensure_not_empty(markers)?;
    let (raster, stats) = suppression::suppress_raster(markers)?;
    let regions = marker_regions(&raster, config)?;
    info!(
        "Suppression removed {} red pixels, {} regions remain",
        stats.red_removed(),
        regions.len()
    );
    Ok(SuppressedOutput {
        raster,
        regions,
        stats,
    })
}

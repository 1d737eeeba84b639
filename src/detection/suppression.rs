//! Cross-type adjacency suppression.
//!
//! White-cell and red-cell markers are merged into one 8-connected
//! foreground. Any red marker sharing a component with a purple marker is
//! read as stain bleed from the nucleus and erased.

use image::Rgba32FImage;
use imageproc::region_labelling::Connectivity;
use log::debug;

use crate::detection::classify::Marker;
use crate::detection::forest::DisjointSetForest;
use crate::detection::labeling::ComponentLabeler;
use crate::error::{DetectionError, DetectionResult};
use crate::models::Sample;
use crate::raster::{Raster, RasterMut};

/// Marker tallies before and after suppression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuppressionStats {
    pub purple_before: usize,
    pub red_before: usize,
    pub purple_after: usize,
    pub red_after: usize,
}

impl SuppressionStats {
    pub fn red_removed(&self) -> usize {
        self.red_before - self.red_after
    }
}

fn count(markers: &[Option<Marker>], which: Marker) -> usize {
    markers.iter().filter(|m| **m == Some(which)).count()
}

/// Suppress a `width` x `height` grid of markers.
pub fn suppress_markers(
    width: u32,
    height: u32,
    markers: &[Option<Marker>],
) -> DetectionResult<(Vec<Option<Marker>>, SuppressionStats)> {
    let labeler = ComponentLabeler::new(width, height).with_connectivity(Connectivity::Eight);
    if markers.len() != labeler.len() {
        return Err(DetectionError::MaskLengthMismatch {
            expected: labeler.len(),
            actual: markers.len(),
        });
    }

    let foreground: Vec<bool> = markers.iter().map(Option::is_some).collect();
    let mut forest = DisjointSetForest::new(markers.len());
    labeler.union_adjacent(&foreground, &mut forest)?;

    let mut has_purple = vec![false; markers.len()];
    for (p, marker) in markers.iter().enumerate() {
        if *marker == Some(Marker::Purple) {
            has_purple[forest.find(p)?] = true;
        }
    }

    let mut out = Vec::with_capacity(markers.len());
    for (p, marker) in markers.iter().enumerate() {
        let kept = match marker {
            Some(Marker::Purple) => Some(Marker::Purple),
            Some(Marker::Red) => {
                if has_purple[forest.find(p)?] {
                    None
                } else {
                    Some(Marker::Red)
                }
            }
            None => None,
        };
        out.push(kept);
    }

    let stats = SuppressionStats {
        purple_before: count(markers, Marker::Purple),
        red_before: count(markers, Marker::Red),
        purple_after: count(&out, Marker::Purple),
        red_after: count(&out, Marker::Red),
    };
    debug!(
        "Suppression: purple {} -> {}, red {} -> {}",
        stats.purple_before, stats.purple_after, stats.red_before, stats.red_after
    );

    Ok((out, stats))
}

/// Read the marker at every pixel of an intermediate raster.
pub fn read_markers<R: Raster>(raster: &R) -> Vec<Option<Marker>> {
    let (width, height) = raster.dimensions();
    let mut markers = Vec::with_capacity(raster.pixel_count());
    for y in 0..height {
        for x in 0..width {
            markers.push(Marker::of(&raster.get(x, y)));
        }
    }
    markers
}

/// Paint markers back into a raster, white where there is none.
pub fn paint_markers(width: u32, height: u32, markers: &[Option<Marker>]) -> Rgba32FImage {
    let mut out = Rgba32FImage::new(width, height);
    for (p, marker) in markers.iter().enumerate() {
        let x = p as u32 % width;
        let y = p as u32 / width;
        out.put(x, y, marker.map_or(Sample::WHITE, Marker::color));
    }
    out
}

/// Suppress a marker raster produced by the stage-1 classification.
pub fn suppress_raster<R: Raster>(raster: &R) -> DetectionResult<(Rgba32FImage, SuppressionStats)> {
    let (width, height) = raster.dimensions();
    let markers = read_markers(raster);
    let (kept, stats) = suppress_markers(width, height, &markers)?;
    Ok((paint_markers(width, height, &kept), stats))
}

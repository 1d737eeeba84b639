use image::Rgba32FImage;

use crate::config::{Adjustments, ThresholdConfig};
use crate::models::{Label, Sample};
use crate::raster::{Raster, RasterMut};

/// Pixels brighter than this are never red cells.
const RED_CELL_MAX_BRIGHTNESS: f32 = 0.8;

/// Threshold-based per-pixel classification of the photograph.
#[derive(Debug, Clone, Copy)]
pub struct PixelClassifier {
    white_cell_threshold: f32,
    red_cell_threshold: f32,
}

impl PixelClassifier {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self {
            white_cell_threshold: config.white_cell_threshold(),
            red_cell_threshold: config.red_cell_threshold(),
        }
    }

    /// Dark and bluer than red.
    pub fn is_white_cell(&self, s: &Sample) -> bool {
        s.brightness() < self.white_cell_threshold && s.b > s.r
    }

    /// Red enough, redder than blue, and not washed out.
    pub fn is_red_cell(&self, s: &Sample) -> bool {
        s.r > self.red_cell_threshold && s.r > s.b && s.brightness() < RED_CELL_MAX_BRIGHTNESS
    }

    pub fn matches(&self, s: &Sample, label: Label) -> bool {
        match label {
            Label::WhiteCell => self.is_white_cell(s),
            Label::RedCell => self.is_red_cell(s),
            Label::Background => !self.is_white_cell(s) && !self.is_red_cell(s),
        }
    }

    /// The two cell predicates are mutually exclusive (`b > r` vs `r > b`).
    pub fn classify(&self, s: &Sample) -> Label {
        if self.is_white_cell(s) {
            Label::WhiteCell
        } else if self.is_red_cell(s) {
            Label::RedCell
        } else {
            Label::Background
        }
    }
}

/// Fixed colours written by the stage-1 classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// White-cell nucleus.
    Purple,
    /// Red cell or stain bleed.
    Red,
}

const MARKER_TOLERANCE: f32 = 0.01;
const PURPLE_INTENSITY_CUTOFF: f32 = 0.15;
const NUCLEUS_MAX_VALUE: f32 = 0.6;

impl Marker {
    pub fn color(self) -> Sample {
        match self {
            Marker::Purple => Sample::from_rgb8(75, 0, 130),
            Marker::Red => Sample::from_rgb8(219, 112, 147),
        }
    }

    /// Tolerance match against the two marker colours.
    pub fn of(s: &Sample) -> Option<Marker> {
        if s.approx_eq(&Marker::Purple.color(), MARKER_TOLERANCE) {
            Some(Marker::Purple)
        } else if s.approx_eq(&Marker::Red.color(), MARKER_TOLERANCE) {
            Some(Marker::Red)
        } else {
            None
        }
    }

    pub fn label(self) -> Label {
        match self {
            Marker::Purple => Label::WhiteCell,
            Marker::Red => Label::RedCell,
        }
    }
}

/// Stage-1 marker for a photograph pixel.
pub fn marker_for(s: &Sample, brightness: f32) -> Option<Marker> {
    let purple_intensity = (s.r + s.b) / 2.0 - s.g + brightness;
    if purple_intensity <= PURPLE_INTENSITY_CUTOFF {
        return None;
    }
    if s.max_channel() < NUCLEUS_MAX_VALUE && s.b > s.r && s.b > s.g {
        Some(Marker::Purple)
    } else {
        Some(Marker::Red)
    }
}

/// Paint every pixel as purple marker, red marker or white background.
pub fn classify_markers<R: Raster>(raster: &R, adjustments: &Adjustments) -> Rgba32FImage {
    let (width, height) = raster.dimensions();
    let mut out = Rgba32FImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let sample = match marker_for(&raster.get(x, y), adjustments.brightness) {
                Some(marker) => marker.color(),
                None => Sample::WHITE,
            };
            out.put(x, y, sample);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(white: f32, red: f32) -> PixelClassifier {
        PixelClassifier::new(&ThresholdConfig::new(white, red, 1, 100).unwrap())
    }

    #[test]
    fn test_white_cell_predicate() {
        let c = classifier(0.6, 0.5);
        assert!(c.is_white_cell(&Sample::new(0.3, 0.0, 0.5)));
        // blue == red is not enough
        assert!(!c.is_white_cell(&Sample::new(0.0, 0.0, 0.0)));
        // too bright
        assert!(!c.is_white_cell(&Sample::new(0.6, 0.6, 0.9)));
    }

    #[test]
    fn test_white_cell_boundary_is_background() {
        // brightness exactly 0.5
        let s = Sample::new(0.25, 0.5, 0.75);
        assert!((s.brightness() - 0.5).abs() < f32::EPSILON);
        assert!(!classifier(0.5, 0.5).is_white_cell(&s));
        assert!(classifier(0.51, 0.5).is_white_cell(&s));
    }

    #[test]
    fn test_red_cell_predicate() {
        let c = classifier(0.5, 0.5);
        assert!(c.is_red_cell(&Sample::new(0.8, 0.3, 0.4)));
        // red at threshold is background
        assert!(!c.is_red_cell(&Sample::new(0.5, 0.1, 0.1)));
        // too bright overall
        assert!(!c.is_red_cell(&Sample::new(1.0, 0.9, 0.9)));
        // blue dominates
        assert!(!c.is_red_cell(&Sample::new(0.7, 0.1, 0.8)));
    }

    #[test]
    fn test_classify_is_exclusive() {
        let c = classifier(0.9, 0.1);
        assert_eq!(c.classify(&Sample::new(0.2, 0.1, 0.6)), Label::WhiteCell);
        assert_eq!(c.classify(&Sample::new(0.6, 0.1, 0.2)), Label::RedCell);
        assert_eq!(c.classify(&Sample::new(0.4, 0.4, 0.4)), Label::Background);
        assert!(c.matches(&Sample::new(0.4, 0.4, 0.4), Label::Background));
    }

    #[test]
    fn test_marker_round_trip_through_u8() {
        let purple = Marker::Purple.color();
        assert_eq!(Marker::of(&purple), Some(Marker::Purple));
        assert_eq!(Marker::of(&Marker::Red.color()), Some(Marker::Red));
        assert_eq!(Marker::of(&Sample::WHITE), None);
        // within tolerance
        let near = Sample::new(purple.r + 0.005, purple.g, purple.b - 0.005);
        assert_eq!(Marker::of(&near), Some(Marker::Purple));
    }

    #[test]
    fn test_stage_one_marker_rules() {
        // deep purple nucleus
        assert_eq!(marker_for(&Sample::new(0.3, 0.0, 0.5), 0.0), Some(Marker::Purple));
        // purple-ish but bright: pink
        assert_eq!(marker_for(&Sample::new(0.9, 0.4, 0.7), 0.0), Some(Marker::Red));
        // greenish background
        assert_eq!(marker_for(&Sample::new(0.8, 0.8, 0.8), 0.0), None);
        // brightness shift can push a pixel over the cutoff
        assert_eq!(marker_for(&Sample::new(0.8, 0.8, 0.8), 0.2), Some(Marker::Red));
    }

    #[test]
    fn test_classify_markers_paints_raster() {
        let mut img = crate::raster::filled(2, 1, Sample::new(0.9, 0.9, 0.9));
        img.put(1, 0, Sample::new(0.3, 0.0, 0.5));
        let markers = classify_markers(&img, &Adjustments::default());
        assert_eq!(Marker::of(&markers.get(0, 0)), None);
        assert_eq!(markers.get(0, 0), Sample::WHITE);
        assert_eq!(Marker::of(&markers.get(1, 0)), Some(Marker::Purple));
    }
}

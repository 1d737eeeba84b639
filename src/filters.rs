//! Stateless per-pixel colour filters.

use image::Rgba32FImage;

use crate::config::Adjustments;
use crate::models::Sample;
use crate::raster::{Raster, RasterMut};

const BW_BASE_THRESHOLD: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Grayscale,
    BlackAndWhite,
    Sepia,
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::Grayscale => "Grayscale",
            Filter::BlackAndWhite => "Black and White",
            Filter::Sepia => "Sepia",
        }
    }

    /// Filter a single sample. Opacity passes through untouched.
    pub fn apply_sample(self, s: &Sample, adj: &Adjustments) -> Sample {
        let out = match self {
            Filter::Grayscale => {
                let gray = luminance(s) * (1.0 + adj.brightness) * adj.mean_gain();
                Sample::new(gray, gray, gray)
            }
            Filter::BlackAndWhite => {
                let l = luminance(s) * adj.mean_gain();
                let t = (BW_BASE_THRESHOLD * (1.0 - 0.5 * adj.brightness)).clamp(0.0, 1.0);
                if l > t { Sample::WHITE } else { Sample::BLACK }
            }
            Filter::Sepia => {
                let k = 1.0 + adj.brightness;
                Sample::new(
                    (0.393 * s.r + 0.769 * s.g + 0.189 * s.b) * adj.gain_r * k,
                    (0.349 * s.r + 0.686 * s.g + 0.168 * s.b) * adj.gain_g * k,
                    (0.272 * s.r + 0.534 * s.g + 0.131 * s.b) * adj.gain_b * k,
                )
            }
        };
        out.with_alpha(s.a).clamped()
    }

    pub fn apply<R: Raster>(self, raster: &R, adj: &Adjustments) -> Rgba32FImage {
        let (width, height) = raster.dimensions();
        let mut out = Rgba32FImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                out.put(x, y, self.apply_sample(&raster.get(x, y), adj));
            }
        }
        out
    }
}

fn luminance(s: &Sample) -> f32 {
    0.299 * s.r + 0.587 * s.g + 0.114 * s.b
}

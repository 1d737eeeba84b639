//! Pixel access over `image` buffers.
//!
//! Detection only needs `get`/`put` with normalised channels, so both 8-bit
//! and float RGBA buffers are usable without conversion.

use image::{DynamicImage, Rgba, Rgba32FImage, RgbaImage};

use crate::models::Sample;

/// Read access to a raster with channels in `[0.0, 1.0]`.
pub trait Raster {
    fn dimensions(&self) -> (u32, u32);

    fn get(&self, x: u32, y: u32) -> Sample;

    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixel_count(&self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }
}

/// Write access to a raster.
pub trait RasterMut: Raster {
    fn put(&mut self, x: u32, y: u32, sample: Sample);
}

impl Raster for Rgba32FImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn get(&self, x: u32, y: u32) -> Sample {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Sample { r, g, b, a }
    }
}

impl RasterMut for Rgba32FImage {
    fn put(&mut self, x: u32, y: u32, sample: Sample) {
        self.put_pixel(x, y, Rgba([sample.r, sample.g, sample.b, sample.a]));
    }
}

impl Raster for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn get(&self, x: u32, y: u32) -> Sample {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Sample {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }
}

impl RasterMut for RgbaImage {
    fn put(&mut self, x: u32, y: u32, sample: Sample) {
        let s = sample.clamped();
        let to_u8 = |v: f32| (v * 255.0).round() as u8;
        self.put_pixel(x, y, Rgba([to_u8(s.r), to_u8(s.g), to_u8(s.b), to_u8(s.a)]));
    }
}

/// Float working copy of a decoded image.
pub fn to_working_raster(img: &DynamicImage) -> Rgba32FImage {
    img.to_rgba32f()
}

/// Fill a new float raster of the given size with one sample.
pub fn filled(width: u32, height: u32, sample: Sample) -> Rgba32FImage {
    Rgba32FImage::from_pixel(width, height, Rgba([sample.r, sample.g, sample.b, sample.a]))
}

/// Convert a float raster to 8-bit for saving or drawing.
pub fn to_rgba8(raster: &Rgba32FImage) -> RgbaImage {
    DynamicImage::ImageRgba32F(raster.clone()).to_rgba8()
}

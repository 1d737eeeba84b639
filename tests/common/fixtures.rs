use cellscan::models::Sample;
use cellscan::raster::{RasterMut, filled};
use image::{ImageBuffer, Rgb, Rgba32FImage};
use tempfile::NamedTempFile;

/// Neutral light-grey background: no label, no marker.
pub const BACKGROUND: Sample = Sample::new(0.9, 0.9, 0.9);
/// Nucleus stain: a white cell for the union-find detector, purple for stage 1.
pub const PURPLE: Sample = Sample::new(0.3, 0.0, 0.5);
/// Erythrocyte stain: a red cell for both detectors.
pub const PINK: Sample = Sample::new(0.9, 0.4, 0.7);

/// Paint a `w` x `h` block with its top-left corner at `(x0, y0)`.
pub fn paint_block(img: &mut Rgba32FImage, x0: u32, y0: u32, w: u32, h: u32, s: Sample) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put(x, y, s);
        }
    }
}

/// 10x10 background with a 3x3 purple block at rows/cols 0..=2.
pub fn purple_block_raster() -> Rgba32FImage {
    let mut img = filled(10, 10, BACKGROUND);
    paint_block(&mut img, 0, 0, 3, 3, PURPLE);
    img
}

/// `purple_block_raster` plus one pink block touching the purple block
/// diagonally and one pink block far from it.
pub fn touching_and_lone_red() -> Rgba32FImage {
    let mut img = purple_block_raster();
    paint_block(&mut img, 3, 3, 2, 2, PINK);
    paint_block(&mut img, 7, 7, 2, 2, PINK);
    img
}

/// Creates a PNG of `touching_and_lone_red` and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let raster = touching_and_lone_red();
    let img = ImageBuffer::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, _] = raster.get_pixel(x, y).0;
        Rgb([
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        ])
    });
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

//! Region overlay rendering.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as DrawRect;

use crate::models::{Label, Region};

const BORDER_THICKNESS: u32 = 2;
const CORNER_SIZE: u32 = 6;

/// Overlay colour per label, indexed by `Label::index`.
const OVERLAY_COLORS: [Rgba<u8>; Label::COUNT] = [
    Rgba([0, 0, 0, 0]),
    Rgba([139, 0, 0, 255]),
    Rgba([0, 0, 139, 255]),
];

pub fn overlay_color(label: Label) -> Rgba<u8> {
    OVERLAY_COLORS[label.index()]
}

/// Draw one region: a 2 px border plus filled corner squares, clipped to the image.
pub fn draw_region(img: &mut RgbaImage, region: &Region) {
    let color = overlay_color(region.label);
    let r = &region.rect;
    let x = r.min_x as i32;
    let y = r.min_y as i32;
    // Pixel extent covers both endpoints
    let w = r.width + 1;
    let h = r.height + 1;

    for t in 0..BORDER_THICKNESS {
        if w <= 2 * t || h <= 2 * t {
            break;
        }
        let inset = DrawRect::at(x + t as i32, y + t as i32).of_size(w - 2 * t, h - 2 * t);
        draw_hollow_rect_mut(img, inset, color);
    }

    let corner = CORNER_SIZE as i32;
    let right = r.max_x() as i32 - corner + 1;
    let bottom = r.max_y() as i32 - corner + 1;
    for (cx, cy) in [(x, y), (right, y), (x, bottom), (right, bottom)] {
        draw_filled_rect_mut(img, DrawRect::at(cx, cy).of_size(CORNER_SIZE, CORNER_SIZE), color);
    }
}

pub fn draw_regions(img: &mut RgbaImage, regions: &[Region]) {
    for region in regions {
        draw_region(img, region);
    }
}

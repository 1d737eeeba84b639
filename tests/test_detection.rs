//! Integration tests for the synchronous detectors.
//!
//! Tests cover:
//! - Fixed scenarios for the union-find detector and the cross-type stages
//! - Idempotence and the component-count bound on random rasters

mod common;

use cellscan::detection::classify::Marker;
use cellscan::detection::{classify_stage, suppression_stage};
use cellscan::raster::{Raster, filled};
use common::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_black_raster_has_no_regions() {
    let img = filled(3, 3, Sample::BLACK);
    let detector = CellDetector::new(ThresholdConfig::new(0.5, 0.5, 1, 100).unwrap());
    let detection = detector.detect(&img).unwrap();
    assert!(detection.regions.is_empty());
}

#[test]
fn test_single_purple_block_bounds() {
    let detector = CellDetector::new(ThresholdConfig::new(0.6, 0.5, 1, 100).unwrap());
    let detection = detector.detect(&purple_block_raster()).unwrap();
    assert_eq!(
        detection.regions,
        vec![Region {
            rect: Rect {
                min_x: 0,
                min_y: 0,
                width: 2,
                height: 2
            },
            label: Label::WhiteCell,
            sequence: 1,
            pixel_count: 9,
        }]
    );
}

#[test]
fn test_union_detector_keeps_both_red_blocks() {
    let detector = CellDetector::new(ThresholdConfig::new(0.6, 0.5, 1, 100).unwrap());
    let detection = detector.detect(&touching_and_lone_red()).unwrap();
    assert_eq!(detection.count(Label::WhiteCell), 1);
    assert_eq!(detection.count(Label::RedCell), 2);
}

#[test]
fn test_suppression_erases_touching_red_block_only() {
    let img = touching_and_lone_red();
    let markers = classify_stage(&img, &Adjustments::default()).unwrap();
    assert_eq!(Marker::of(&markers.get(3, 3)), Some(Marker::Red));

    let config = ThresholdConfig::new(0.6, 0.5, 1, 100).unwrap();
    let out = suppression_stage(&markers, &config).unwrap();

    for (x, y) in [(3, 3), (4, 3), (3, 4), (4, 4)] {
        assert_eq!(Marker::of(&out.raster.get(x, y)), None);
    }
    for (x, y) in [(7, 7), (8, 7), (7, 8), (8, 8)] {
        assert_eq!(Marker::of(&out.raster.get(x, y)), Some(Marker::Red));
    }

    let summary: Vec<(Label, u32, u32, u32)> = out
        .regions
        .iter()
        .map(|r| (r.label, r.rect.min_x, r.rect.min_y, r.pixel_count))
        .collect();
    assert_eq!(
        summary,
        vec![(Label::WhiteCell, 0, 0, 9), (Label::RedCell, 7, 7, 4)]
    );
    assert_eq!(out.stats.red_removed(), 4);
}

#[test]
fn test_default_settings_detect_nothing_on_tiny_image() {
    // Default minimum size is far above 9 pixels
    let (config, _) = SliderSettings::default().validate().unwrap();
    let detector = CellDetector::new(config);
    assert!(detector.detect(&purple_block_raster()).unwrap().regions.is_empty());
}

#[test]
fn test_inverted_size_sliders_find_nothing() {
    let settings = SliderSettings {
        white_cell_threshold: 60.0,
        min_cell_size: 100.0,
        max_cell_size: 0.0,
        ..Default::default()
    };
    let (config, _) = settings.validate().unwrap();
    let mut img = filled(40, 40, BACKGROUND);
    paint_block(&mut img, 0, 0, 20, 20, PURPLE);
    let detection = CellDetector::new(config).detect(&img).unwrap();
    assert!(detection.regions.is_empty());
}

/// Random rasters of background, purple and pink pixels.
fn random_raster(rng: &mut StdRng) -> image::Rgba32FImage {
    let w = rng.random_range(1..24u32);
    let h = rng.random_range(1..24u32);
    let mut img = filled(w, h, BACKGROUND);
    for y in 0..h {
        for x in 0..w {
            let s = match rng.random_range(0..3) {
                0 => BACKGROUND,
                1 => PURPLE,
                _ => PINK,
            };
            paint_block(&mut img, x, y, 1, 1, s);
        }
    }
    img
}

#[test]
fn test_detection_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(42);
    let detector = CellDetector::new(ThresholdConfig::new(0.6, 0.5, 1, 1000).unwrap());
    for _ in 0..100 {
        let img = random_raster(&mut rng);
        let first = detector.detect(&img).unwrap();
        let second = detector.detect(&img).unwrap();
        assert_eq!(first.regions, second.regions);
    }
}

#[test]
fn test_region_count_bounded_by_min_size() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let img = random_raster(&mut rng);
        let min_size = rng.random_range(1..12u32);
        let detector = CellDetector::new(ThresholdConfig::new(0.6, 0.5, min_size, 10_000).unwrap());
        let pixels = img.pixel_count();
        for label in Label::CELLS {
            let regions = detector.detect_label(&img, label).unwrap();
            assert!(regions.len() <= pixels / min_size as usize);
            for r in &regions {
                assert!(r.pixel_count >= min_size);
            }
        }
    }
}

#[test]
fn test_suppressed_regions_are_idempotent() {
    let mut rng = StdRng::seed_from_u64(123);
    let config = ThresholdConfig::new(0.6, 0.5, 1, 1000).unwrap();
    for _ in 0..50 {
        let img = random_raster(&mut rng);
        let markers = classify_stage(&img, &Adjustments::default()).unwrap();
        let a = suppression_stage(&markers, &config).unwrap();
        let b = suppression_stage(&markers, &config).unwrap();
        assert_eq!(a.regions, b.regions);
        assert_eq!(a.stats, b.stats);
    }
}

#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from cellscan for tests
pub use cellscan::{
    Adjustments, CellDetector, Label, Rect, Region, Sample, SliderSettings, ThresholdConfig,
};

use std::fmt;

/// A single pixel's colour, each channel in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Opacity. Carried through transforms, never used for classification.
    pub a: f32,
}

impl Sample {
    pub const WHITE: Sample = Sample::new(1.0, 1.0, 1.0);
    pub const BLACK: Sample = Sample::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    /// Build a sample from 8-bit channel values.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Mean of the three colour channels.
    pub fn brightness(&self) -> f32 {
        (self.r + self.g + self.b) / 3.0
    }

    /// HSB "value": the largest of the three colour channels.
    pub fn max_channel(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    /// Channel-wise clamp into `[0.0, 1.0]`.
    pub fn clamped(&self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    /// True when every colour channel is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &Sample, tolerance: f32) -> bool {
        (self.r - other.r).abs() < tolerance
            && (self.g - other.g).abs() < tolerance
            && (self.b - other.b).abs() < tolerance
    }
}

/// Classification outcome for a pixel or a detected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Background,
    /// White blood cells, stained purple.
    WhiteCell,
    /// Red blood cells, stained pink.
    RedCell,
}

impl Label {
    pub const COUNT: usize = 3;

    /// The labels that produce regions, in emission order.
    pub const CELLS: [Label; 2] = [Label::WhiteCell, Label::RedCell];

    pub const fn index(self) -> usize {
        match self {
            Label::Background => 0,
            Label::WhiteCell => 1,
            Label::RedCell => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Label::Background => "background",
            Label::WhiteCell => "white cell",
            Label::RedCell => "red cell",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
///
/// `width` and `height` are the coordinate spans (`max - min`), so a single
/// pixel yields a `0x0` rectangle anchored at that pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: u32,
    pub min_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn max_x(&self) -> u32 {
        self.min_x + self.width
    }

    pub fn max_y(&self) -> u32 {
        self.min_y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x() && p.y >= self.min_y && p.y <= self.max_y()
    }
}

/// A detected cell: its bounds, what it is, and its annotation number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub rect: Rect,
    pub label: Label,
    /// 1-based, counted per label in discovery order.
    pub sequence: u32,
    pub pixel_count: u32,
}

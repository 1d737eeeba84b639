//! Two-pass connected component labeling on top of the disjoint-set forest.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use imageproc::region_labelling::Connectivity;
use log::debug;

use crate::detection::bbox::bounding_box;
use crate::detection::forest::DisjointSetForest;
use crate::error::{DetectionError, DetectionResult};
use crate::models::{Point, Rect, Sample};
use crate::raster::Raster;

/// One labeled component, alive only for the labeling call that built it.
#[derive(Debug, Clone)]
pub struct Component {
    /// Forest root that represents the component.
    pub root: usize,
    /// Raster index of the first pixel met in scan order.
    pub first_index: usize,
    /// Member pixels in scan order. Never empty.
    pub pixels: Vec<Point>,
}

impl Component {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    pub fn bounds(&self) -> Option<Rect> {
        bounding_box(&self.pixels)
    }
}

fn neighbour_count(connectivity: Connectivity) -> u8 {
    match connectivity {
        Connectivity::Four => 4,
        Connectivity::Eight => 8,
    }
}

#[derive(Clone, Copy)]
pub struct ComponentLabeler {
    width: u32,
    height: u32,
    connectivity: Connectivity,
}

impl ComponentLabeler {
    /// Labeler for a `width` x `height` grid using 4-connectivity.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            connectivity: Connectivity::Four,
        }
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union every pair of adjacent `mask` pixels into `forest`.
    ///
    /// Only already-visited neighbours (left, and the row above) are checked,
    /// which covers every adjacent pair exactly once.
    pub fn union_adjacent(
        &self,
        mask: &[bool],
        forest: &mut DisjointSetForest,
    ) -> DetectionResult<()> {
        let w = self.width as usize;
        let h = self.height as usize;
        let eight = matches!(self.connectivity, Connectivity::Eight);

        for y in 0..h {
            for x in 0..w {
                let p = y * w + x;
                if !mask[p] {
                    continue;
                }
                if x > 0 && mask[p - 1] {
                    forest.union(p, p - 1)?;
                }
                if y > 0 {
                    let up = p - w;
                    if mask[up] {
                        forest.union(p, up)?;
                    }
                    if eight {
                        if x > 0 && mask[up - 1] {
                            forest.union(p, up - 1)?;
                        }
                        if x + 1 < w && mask[up + 1] {
                            forest.union(p, up + 1)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Label a precomputed foreground mask and keep components whose pixel
    /// count lies in `size_range`.
    ///
    /// Components come back ordered by the scan index of their first pixel.
    pub fn label_mask(
        &self,
        mask: &[bool],
        size_range: RangeInclusive<usize>,
    ) -> DetectionResult<Vec<Component>> {
        if mask.len() != self.len() {
            return Err(DetectionError::MaskLengthMismatch {
                expected: self.len(),
                actual: mask.len(),
            });
        }

        let mut forest = DisjointSetForest::new(self.len());
        self.union_adjacent(mask, &mut forest)?;

        // Group by root, keeping discovery order
        let w = self.width as usize;
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Component> = Vec::new();
        for (p, _) in mask.iter().enumerate().filter(|(_, set)| **set) {
            let root = forest.find(p)?;
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                groups.push(Component {
                    root,
                    first_index: p,
                    pixels: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot]
                .pixels
                .push(Point::new((p % w) as u32, (p / w) as u32));
        }

        let found = groups.len();
        let mut kept = Vec::with_capacity(found);
        for group in groups {
            if size_range.contains(&forest.size(group.root)?) {
                kept.push(group);
            }
        }

        debug!(
            "Labeled {} components ({}-connectivity), {} within size range {:?}",
            found,
            neighbour_count(self.connectivity),
            kept.len(),
            size_range
        );

        Ok(kept)
    }

    /// Label the pixels of `raster` that satisfy `predicate`.
    pub fn label<R, F>(
        &self,
        raster: &R,
        predicate: F,
        size_range: RangeInclusive<usize>,
    ) -> DetectionResult<Vec<Component>>
    where
        R: Raster,
        F: Fn(&Sample) -> bool,
    {
        let (width, height) = raster.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(DetectionError::DimensionMismatch {
                width: self.width,
                height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }

        let mut mask = Vec::with_capacity(self.len());
        for y in 0..height {
            for x in 0..width {
                mask.push(predicate(&raster.get(x, y)));
            }
        }
        self.label_mask(&mask, size_range)
    }
}

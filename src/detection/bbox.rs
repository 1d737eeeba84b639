use crate::models::{Point, Rect};

/// Smallest rectangle enclosing `points`, with `width = max_x - min_x` and
/// `height = max_y - min_y`.
///
/// Returns `None` for an empty slice. Labeled components are never empty, so
/// callers treat `None` as a broken precondition.
pub fn bounding_box(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Rect {
        min_x,
        min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

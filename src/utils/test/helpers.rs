//! Test helper functions

use geo_types::{polygon, Polygon};

/// Axis-aligned square with its lower left corner at `(x, y)`
#[must_use]
pub fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
        (x: x, y: y),
    ]
}

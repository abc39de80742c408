//! Geometry repair and measurement.

use geo::{Area, BooleanOps, BoundingRect, Validation};
use geo_types::{Geometry, LineString, MultiPolygon, Polygon};

use crate::error::Result;
use crate::geometry::crs::{Crs, Transformer};

/// Reason why a geometry is invalid, `None` if it is valid
#[must_use]
pub fn invalidity_reason(geom: &Geometry<f64>) -> Option<String> {
    geom.check_validation().err().map(|e| e.to_string())
}

#[must_use]
pub fn is_valid(geom: &Geometry<f64>) -> bool {
    geom.is_valid()
}

/// Repair invalid polygonal geometries.
///
/// Polygons are rebuilt through a boolean union with themselves, which
/// resolves self-intersections and ring orientation. Valid geometries and
/// non-polygonal geometries are returned unchanged.
#[must_use]
pub fn make_valid(geom: Geometry<f64>) -> Geometry<f64> {
    if geom.is_valid() {
        return geom;
    }
    match geom {
        Geometry::Polygon(polygon) => simplify_multi(polygon.union(&polygon)),
        Geometry::MultiPolygon(polygons) => simplify_multi(polygons.union(&polygons)),
        Geometry::Rect(rect) => Geometry::Polygon(rect.to_polygon()),
        Geometry::Triangle(triangle) => {
            let polygon = triangle.to_polygon();
            simplify_multi(polygon.union(&polygon))
        }
        Geometry::GeometryCollection(mut collection) => {
            collection.0 = collection.0.into_iter().map(make_valid).collect();
            Geometry::GeometryCollection(collection)
        }
        other => other,
    }
}

fn simplify_multi(polygons: MultiPolygon<f64>) -> Geometry<f64> {
    if polygons.0.len() == 1 {
        polygons.0.into_iter().next().map_or_else(
            || Geometry::MultiPolygon(MultiPolygon::new(vec![])),
            Geometry::Polygon,
        )
    } else {
        Geometry::MultiPolygon(polygons)
    }
}

/// Split multi-part geometries and collections into their single parts
#[must_use]
pub fn explode(geom: Geometry<f64>) -> Vec<Geometry<f64>> {
    match geom {
        Geometry::MultiPolygon(polygons) => polygons.0.into_iter().map(Geometry::Polygon).collect(),
        Geometry::MultiLineString(lines) => lines.0.into_iter().map(Geometry::LineString).collect(),
        Geometry::MultiPoint(points) => points.0.into_iter().map(Geometry::Point).collect(),
        Geometry::GeometryCollection(collection) => {
            collection.0.into_iter().flat_map(explode).collect()
        }
        other => vec![other],
    }
}

#[must_use]
pub fn is_multi(geom: &Geometry<f64>) -> bool {
    matches!(
        geom,
        Geometry::MultiPolygon(_)
            | Geometry::MultiLineString(_)
            | Geometry::MultiPoint(_)
            | Geometry::GeometryCollection(_)
    )
}

#[must_use]
pub fn is_polygon(geom: &Geometry<f64>) -> bool {
    matches!(geom, Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_))
}

fn ring_length(ring: &LineString<f64>) -> f64 {
    ring.lines().map(|line| line.dx().hypot(line.dy())).sum()
}

fn polygon_perimeter(polygon: &Polygon<f64>) -> f64 {
    ring_length(polygon.exterior()) + polygon.interiors().iter().map(ring_length).sum::<f64>()
}

/// Planar perimeter of all polygon rings, 0 for non-polygonal geometries
#[must_use]
pub fn perimeter(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(polygon) => polygon_perimeter(polygon),
        Geometry::MultiPolygon(polygons) => polygons.0.iter().map(polygon_perimeter).sum(),
        Geometry::Rect(rect) => polygon_perimeter(&rect.to_polygon()),
        Geometry::Triangle(triangle) => polygon_perimeter(&triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => collection.0.iter().map(perimeter).sum(),
        _ => 0.0,
    }
}

/// Area and perimeter of a geometry.
///
/// With a transformer the geometry is first projected into a metric
/// (equal-area) CRS; without one the coordinates are assumed to be metric.
pub fn measure(geom: &Geometry<f64>, transformer: Option<&Transformer>) -> Result<(f64, f64)> {
    match transformer {
        Some(transformer) => {
            let mut projected = geom.clone();
            transformer.transform(&mut projected)?;
            Ok((projected.unsigned_area(), perimeter(&projected)))
        }
        None => Ok((geom.unsigned_area(), perimeter(geom))),
    }
}

/// Area in m² and perimeter in m of a geometry in a geographic CRS.
///
/// The geometry is projected to an equal-area projection centred on its
/// bounding box, which keeps the perimeter distortion small as well.
pub fn measure_geographic(geom: &Geometry<f64>, crs: &Crs) -> Result<(f64, f64)> {
    let Some(rect) = geom.bounding_rect() else {
        return Ok((0.0, 0.0));
    };
    let transformer = Transformer::to_equal_area(crs, rect.center())?;
    measure(geom, Some(&transformer))
}

//! Conversion between GeoJSON geometry objects and `geo-types`.

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{json, Value};

use crate::error::{Result, VecorelError};

/// Parse a GeoJSON geometry object; Z ordinates are dropped
pub fn from_value(value: &Value) -> Result<Geometry<f64>> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| VecorelError::geometry("GeoJSON geometry without 'type'"))?;

    if kind == "GeometryCollection" {
        let members = value
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| VecorelError::geometry("GeometryCollection without 'geometries'"))?;
        let geoms = members.iter().map(from_value).collect::<Result<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geoms)));
    }

    let coords = value
        .get("coordinates")
        .ok_or_else(|| VecorelError::geometry(format!("{kind} without 'coordinates'")))?;

    let geom = match kind {
        "Point" => Geometry::Point(Point(coord(coords)?)),
        "LineString" => Geometry::LineString(line_string(coords)?),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            array(coords)?
                .iter()
                .map(|c| coord(c).map(Point))
                .collect::<Result<Vec<_>>>()?,
        )),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            array(coords)?
                .iter()
                .map(line_string)
                .collect::<Result<Vec<_>>>()?,
        )),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            array(coords)?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => {
            return Err(VecorelError::geometry(format!(
                "Unsupported GeoJSON geometry type '{other}'"
            )));
        }
    };
    Ok(geom)
}

fn array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| VecorelError::geometry(format!("Expected a coordinate array, got {value}")))
}

fn coord(value: &Value) -> Result<Coord<f64>> {
    let position = array(value)?;
    match (
        position.first().and_then(Value::as_f64),
        position.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(VecorelError::geometry(format!("Invalid position {value}"))),
    }
}

fn line_string(value: &Value) -> Result<LineString<f64>> {
    let coords = array(value)?
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value)?.iter().map(line_string);
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(vec![]));
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn position(c: Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn positions(line: &LineString<f64>) -> Value {
    Value::Array(line.0.iter().copied().map(position).collect())
}

fn rings(polygon: &Polygon<f64>) -> Value {
    if polygon.exterior().0.is_empty() {
        return Value::Array(vec![]);
    }
    let mut rings = vec![positions(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(positions));
    Value::Array(rings)
}

/// Serialise a geometry as a GeoJSON geometry object
#[must_use]
pub fn to_value(geom: &Geometry<f64>) -> Value {
    match geom {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": position(p.0)}),
        Geometry::Line(line) => json!({
            "type": "LineString",
            "coordinates": [position(line.start), position(line.end)]
        }),
        Geometry::LineString(line) => json!({"type": "LineString", "coordinates": positions(line)}),
        Geometry::Polygon(polygon) => json!({"type": "Polygon", "coordinates": rings(polygon)}),
        Geometry::Rect(rect) => to_value(&Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => to_value(&Geometry::Polygon(triangle.to_polygon())),
        Geometry::MultiPoint(points) => json!({
            "type": "MultiPoint",
            "coordinates": points.0.iter().map(|p| position(p.0)).collect::<Vec<_>>()
        }),
        Geometry::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": lines.0.iter().map(positions).collect::<Vec<_>>()
        }),
        Geometry::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.0.iter().map(rings).collect::<Vec<_>>()
        }),
        Geometry::GeometryCollection(collection) => json!({
            "type": "GeometryCollection",
            "geometries": collection.0.iter().map(to_value).collect::<Vec<_>>()
        }),
    }
}

//! Coordinate reference systems and reprojection.
//!
//! All transformations are delegated to `proj4rs`. A CRS is either an EPSG
//! code or a PROJ string; GeoParquet metadata carries it as PROJJSON, of which
//! only the `id` member is written and read.

use std::fmt;
use std::str::FromStr;

use geo::MapCoordsInPlace;
use geo_types::{Coord, Geometry};
use proj4rs::Proj;
use serde_json::{json, Value};

use crate::error::{Result, VecorelError};

/// Lambert azimuthal equal-area projection on WGS 84 centred on a lon/lat
/// point, used for area and perimeter computation
#[must_use]
pub fn equal_area_proj(center: Coord<f64>) -> String {
    format!(
        "+proj=laea +lat_0={} +lon_0={} +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs",
        center.y, center.x
    )
}

/// A coordinate reference system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    Epsg(u16),
    Proj(String),
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl Crs {
    /// Longitude/latitude on WGS 84, the CRS of GeoJSON
    pub const WGS84: Crs = Crs::Epsg(4326);

    #[must_use]
    pub fn epsg(&self) -> Option<u16> {
        match self {
            Self::Epsg(code) => Some(*code),
            Self::Proj(_) => None,
        }
    }

    /// Parse the `crs` member of GeoParquet column metadata.
    ///
    /// A missing or null CRS means OGC:CRS84, which is treated as EPSG:4326.
    pub fn from_projjson(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::WGS84),
            Some(Value::String(s)) => s.parse(),
            Some(Value::Object(obj)) => {
                let id = obj.get("id");
                let authority = id.and_then(|i| i.get("authority")).and_then(Value::as_str);
                let code = id.and_then(|i| i.get("code"));
                match (authority, code) {
                    (Some("EPSG"), Some(Value::Number(n))) => n
                        .as_u64()
                        .and_then(|c| u16::try_from(c).ok())
                        .map(Self::Epsg)
                        .ok_or_else(|| VecorelError::Crs(format!("Invalid EPSG code {n}"))),
                    (Some("EPSG"), Some(Value::String(c))) => format!("EPSG:{c}").parse(),
                    (Some("OGC"), Some(Value::String(c))) if c == "CRS84" => Ok(Self::WGS84),
                    _ => Err(VecorelError::Crs(
                        "Unsupported PROJJSON CRS without an EPSG id".to_string(),
                    )),
                }
            }
            Some(other) => Err(VecorelError::Crs(format!("Invalid CRS definition {other}"))),
        }
    }

    /// Minimal PROJJSON representation identifying the CRS
    #[must_use]
    pub fn to_projjson(&self) -> Value {
        match self {
            Self::Epsg(code) => json!({
                "$schema": "https://proj.org/schemas/v0.7/projjson.schema.json",
                "name": format!("EPSG:{code}"),
                "id": {"authority": "EPSG", "code": code}
            }),
            Self::Proj(def) => Value::String(def.clone()),
        }
    }

    fn to_proj(&self) -> Result<Proj> {
        match self {
            Self::Epsg(code) => Proj::from_epsg_code(*code)
                .map_err(|e| VecorelError::Crs(format!("EPSG:{code}: {e}"))),
            Self::Proj(def) => {
                Proj::from_proj_string(def).map_err(|e| VecorelError::Crs(format!("{def}: {e}")))
            }
        }
    }

    /// Whether coordinates are angular (longitude/latitude) rather than metric
    pub fn is_geographic(&self) -> Result<bool> {
        if let Self::Epsg(4326 | 4258 | 4269 | 4979) = self {
            return Ok(true);
        }
        Ok(self.to_proj()?.is_latlong())
    }
}

impl FromStr for Crs {
    type Err = VecorelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('+') {
            return Ok(Self::Proj(s.to_string()));
        }
        let upper = s.to_uppercase();
        if matches!(upper.as_str(), "OGC:CRS84" | "CRS84" | "WGS84") {
            return Ok(Self::WGS84);
        }
        let code = upper.strip_prefix("EPSG:").unwrap_or(&upper);
        code.parse::<u16>()
            .map(Self::Epsg)
            .map_err(|_| VecorelError::Crs(format!("Unrecognised CRS '{s}'")))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsg(code) => write!(f, "EPSG:{code}"),
            Self::Proj(def) => f.write_str(def),
        }
    }
}

/// Reprojects geometries between two coordinate reference systems
pub struct Transformer {
    from: Proj,
    to: Proj,
    from_latlong: bool,
    to_latlong: bool,
}

impl Transformer {
    /// `None` when both CRS are the same and nothing needs to happen
    pub fn new(from: &Crs, to: &Crs) -> Result<Option<Self>> {
        if from == to {
            return Ok(None);
        }
        let from_proj = from.to_proj()?;
        let to_proj = to.to_proj()?;
        Ok(Some(Self {
            from_latlong: from_proj.is_latlong(),
            to_latlong: to_proj.is_latlong(),
            from: from_proj,
            to: to_proj,
        }))
    }

    /// Transformer into an equal-area projection centred on `center`, given
    /// in the coordinates of `from`
    pub fn to_equal_area(from: &Crs, center: Coord<f64>) -> Result<Self> {
        let to = Crs::Proj(equal_area_proj(center));
        Self::new(from, &to)?
            .ok_or_else(|| VecorelError::Crs("Source is already equal-area".to_string()))
    }

    /// Transform a single coordinate
    pub fn transform_coord(&self, c: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from_latlong {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };
        proj4rs::transform::transform(&self.from, &self.to, &mut point)
            .map_err(|e| VecorelError::Crs(format!("Cannot transform ({}, {}): {e}", c.x, c.y)))?;
        Ok(if self.to_latlong {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }

    /// Transform every coordinate of a geometry in place
    pub fn transform(&self, geom: &mut Geometry<f64>) -> Result<()> {
        let f = |c: Coord<f64>| self.transform_coord(c);
        match geom {
            Geometry::Point(g) => g.try_map_coords_in_place(f),
            Geometry::Line(g) => g.try_map_coords_in_place(f),
            Geometry::LineString(g) => g.try_map_coords_in_place(f),
            Geometry::Polygon(g) => g.try_map_coords_in_place(f),
            Geometry::MultiPoint(g) => g.try_map_coords_in_place(f),
            Geometry::MultiLineString(g) => g.try_map_coords_in_place(f),
            Geometry::MultiPolygon(g) => g.try_map_coords_in_place(f),
            Geometry::Rect(g) => g.try_map_coords_in_place(f),
            Geometry::Triangle(g) => g.try_map_coords_in_place(f),
            Geometry::GeometryCollection(collection) => {
                collection.0.iter_mut().try_for_each(|g| self.transform(g))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, polygon};

    #[test]
    fn test_parse() {
        assert_eq!("EPSG:25832".parse::<Crs>().unwrap(), Crs::Epsg(25832));
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!("OGC:CRS84".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!("3857".parse::<Crs>().unwrap(), Crs::Epsg(3857));
        assert!(matches!("+proj=longlat +datum=WGS84".parse::<Crs>().unwrap(), Crs::Proj(_)));
        assert!("not a crs".parse::<Crs>().is_err());
    }

    #[test]
    fn test_projjson() {
        let crs = Crs::Epsg(25832);
        assert_eq!(Crs::from_projjson(Some(&crs.to_projjson())).unwrap(), crs);
        assert_eq!(Crs::from_projjson(None).unwrap(), Crs::WGS84);
        assert_eq!(
            Crs::from_projjson(Some(&json!({"id": {"authority": "OGC", "code": "CRS84"}}))).unwrap(),
            Crs::WGS84
        );
    }

    #[test]
    fn test_web_mercator_round_trip() {
        let to_merc = Transformer::new(&Crs::WGS84, &Crs::Epsg(3857)).unwrap().unwrap();
        let back = Transformer::new(&Crs::Epsg(3857), &Crs::WGS84).unwrap().unwrap();

        let mut geom: Geometry<f64> = point!(x: 7.0, y: 51.0).into();
        to_merc.transform(&mut geom).unwrap();
        let Geometry::Point(p) = geom else { panic!("point expected") };
        assert!((p.x() - 779_236.4).abs() < 1.0);

        back.transform(&mut geom).unwrap();
        let Geometry::Point(p) = geom else { panic!("point expected") };
        assert!((p.x() - 7.0).abs() < 1e-6);
        assert!((p.y() - 51.0).abs() < 1e-6);
    }

    #[test]
    fn test_collection_members_are_transformed() {
        let to_merc = Transformer::new(&Crs::WGS84, &Crs::Epsg(3857)).unwrap().unwrap();
        let mut geom = Geometry::GeometryCollection(geo_types::GeometryCollection(vec![
            point!(x: 7.0, y: 51.0).into(),
            Geometry::Polygon(geo_types::polygon![
                (x: 7.0, y: 51.0),
                (x: 8.0, y: 51.0),
                (x: 8.0, y: 52.0),
                (x: 7.0, y: 51.0),
            ]),
        ]));
        to_merc.transform(&mut geom).unwrap();
        let Geometry::GeometryCollection(collection) = geom else { panic!("collection expected") };
        let Geometry::Polygon(polygon) = &collection.0[1] else { panic!("polygon expected") };
        assert!((polygon.exterior().0[1].x - 890_555.9).abs() < 1.0);
    }

    #[test]
    fn test_equal_area_center_in_definition() {
        let definition = equal_area_proj(Coord { x: 10.5, y: 52.25 });
        assert!(definition.contains("+proj=laea"));
        assert!(definition.contains("+lat_0=52.25 +lon_0=10.5"));
        assert!(Transformer::to_equal_area(&Crs::WGS84, Coord { x: 10.5, y: 52.25 }).is_ok());
    }

    #[test]
    fn test_identity_is_skipped() {
        assert!(Transformer::new(&Crs::WGS84, &Crs::WGS84).unwrap().is_none());
        assert!(Crs::WGS84.is_geographic().unwrap());
    }
}

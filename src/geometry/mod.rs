//! Geometry handling: codecs, reprojection and repair.
//!
//! Geometries are stored as WKB in Arrow `Binary` columns and decoded into
//! `geo-types` values whenever they have to be inspected or transformed.

pub mod crs;
pub mod geojson;
pub mod ops;
pub mod wkb;

use std::fmt;
use std::str::FromStr;

use geo::BoundingRect;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::VecorelError;

pub use crs::Crs;

/// Geometry type discriminator, named as in GeoJSON and GeoParquet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Classify a geo-types Geometry.
    #[must_use]
    pub fn from_geometry(geom: &Geometry<f64>) -> Self {
        match geom {
            Geometry::Point(_) => Self::Point,
            Geometry::Line(_) | Geometry::LineString(_) => Self::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Self::Polygon,
            Geometry::MultiPoint(_) => Self::MultiPoint,
            Geometry::MultiLineString(_) => Self::MultiLineString,
            Geometry::MultiPolygon(_) => Self::MultiPolygon,
            Geometry::GeometryCollection(_) => Self::GeometryCollection,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }

    /// WKB type code (2D)
    #[must_use]
    pub const fn wkb_code(self) -> u32 {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::GeometryCollection => 7,
        }
    }

    #[must_use]
    pub const fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Point),
            2 => Some(Self::LineString),
            3 => Some(Self::Polygon),
            4 => Some(Self::MultiPoint),
            5 => Some(Self::MultiLineString),
            6 => Some(Self::MultiPolygon),
            7 => Some(Self::GeometryCollection),
            _ => None,
        }
    }
}

impl FromStr for GeometryType {
    type Err = VecorelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // GeoParquet allows a " Z" suffix for 3D types
        let name = s.trim().trim_end_matches(" Z");
        [
            Self::Point,
            Self::LineString,
            Self::Polygon,
            Self::MultiPoint,
            Self::MultiLineString,
            Self::MultiPolygon,
            Self::GeometryCollection,
        ]
        .into_iter()
        .find(|t| t.as_str() == name)
        .ok_or_else(|| VecorelError::geometry(format!("Unknown geometry type '{s}'")))
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box `[xmin, ymin, xmax, ymax]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBox {
    #[must_use]
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Bounding box of a geometry, `None` for empty geometries
    #[must_use]
    pub fn of(geom: &Geometry<f64>) -> Option<Self> {
        geom.bounding_rect()
            .map(|r| Self::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Grow this box to include another one
    #[must_use]
    pub fn union(self, other: BBox) -> Self {
        Self::new(
            self.xmin.min(other.xmin),
            self.ymin.min(other.ymin),
            self.xmax.max(other.xmax),
            self.ymax.max(other.ymax),
        )
    }

    /// `xmin <= xmax` and `ymin <= ymax`
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    #[must_use]
    pub fn to_array(self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Point};

    #[test]
    fn test_type_names() {
        assert_eq!("MultiPolygon".parse::<GeometryType>().unwrap(), GeometryType::MultiPolygon);
        assert_eq!("Polygon Z".parse::<GeometryType>().unwrap(), GeometryType::Polygon);
        assert!("Circle".parse::<GeometryType>().is_err());
        assert_eq!(GeometryType::from_wkb_code(6), Some(GeometryType::MultiPolygon));
    }

    #[test]
    fn test_bbox() {
        let poly: Geometry<f64> = polygon![(x: 0.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 3.0)].into();
        let bbox = BBox::of(&poly).unwrap();
        assert_eq!(bbox.to_array(), [0.0, 1.0, 2.0, 3.0]);
        assert!(bbox.is_ordered());
        let grown = bbox.union(BBox::of(&Point::new(-1.0, 5.0).into()).unwrap());
        assert_eq!(grown.to_array(), [-1.0, 1.0, 2.0, 5.0]);
        assert!(!BBox::new(1.0, 0.0, 0.0, 1.0).is_ordered());
    }
}

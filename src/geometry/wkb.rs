//! Well-Known Binary encoding.
//!
//! Writes little-endian 2D ISO WKB. Reads either byte order and the ISO
//! (1000/2000/3000) and EWKB (flag bits) dimension variants; Z and M
//! ordinates are skipped since geometries are handled in 2D.

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};

use crate::error::{Result, VecorelError};
use crate::geometry::GeometryType;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Encode a geometry as little-endian WKB
#[must_use]
pub fn encode(geom: &Geometry<f64>) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_geometry(&mut out, geom);
    out
}

/// Decode WKB into a 2D geometry
pub fn decode(bytes: &[u8]) -> Result<Geometry<f64>> {
    let mut reader = Reader { bytes, pos: 0 };
    let geom = reader.geometry()?;
    if reader.pos != bytes.len() {
        log::debug!(
            "Ignoring {} trailing bytes after WKB geometry",
            bytes.len() - reader.pos
        );
    }
    Ok(geom)
}

/// Read only the geometry type from the WKB header
pub fn peek_type(bytes: &[u8]) -> Result<GeometryType> {
    let mut reader = Reader { bytes, pos: 0 };
    let header = reader.header()?;
    Ok(header.kind)
}

fn write_header(out: &mut Vec<u8>, kind: GeometryType) {
    out.push(1);
    out.extend_from_slice(&kind.wkb_code().to_le_bytes());
}

fn write_u32(out: &mut Vec<u8>, value: usize) {
    // Counts beyond u32 cannot be represented in WKB
    let value = u32::try_from(value).unwrap_or(u32::MAX);
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_coord(out: &mut Vec<u8>, coord: Coord<f64>) {
    out.extend_from_slice(&coord.x.to_le_bytes());
    out.extend_from_slice(&coord.y.to_le_bytes());
}

fn write_line_string(out: &mut Vec<u8>, line: &LineString<f64>) {
    write_u32(out, line.0.len());
    for coord in &line.0 {
        write_coord(out, *coord);
    }
}

fn write_polygon(out: &mut Vec<u8>, polygon: &Polygon<f64>) {
    if polygon.exterior().0.is_empty() {
        write_u32(out, 0);
        return;
    }
    write_u32(out, 1 + polygon.interiors().len());
    write_line_string(out, polygon.exterior());
    for ring in polygon.interiors() {
        write_line_string(out, ring);
    }
}

fn write_geometry(out: &mut Vec<u8>, geom: &Geometry<f64>) {
    match geom {
        Geometry::Point(p) => {
            write_header(out, GeometryType::Point);
            write_coord(out, p.0);
        }
        Geometry::Line(line) => {
            write_geometry(out, &Geometry::LineString(LineString::from(vec![line.start, line.end])));
        }
        Geometry::LineString(line) => {
            write_header(out, GeometryType::LineString);
            write_line_string(out, line);
        }
        Geometry::Polygon(polygon) => {
            write_header(out, GeometryType::Polygon);
            write_polygon(out, polygon);
        }
        Geometry::Rect(rect) => write_geometry(out, &Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => {
            write_geometry(out, &Geometry::Polygon(triangle.to_polygon()));
        }
        Geometry::MultiPoint(points) => {
            write_header(out, GeometryType::MultiPoint);
            write_u32(out, points.0.len());
            for p in &points.0 {
                write_geometry(out, &Geometry::Point(*p));
            }
        }
        Geometry::MultiLineString(lines) => {
            write_header(out, GeometryType::MultiLineString);
            write_u32(out, lines.0.len());
            for line in &lines.0 {
                write_header(out, GeometryType::LineString);
                write_line_string(out, line);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_header(out, GeometryType::MultiPolygon);
            write_u32(out, polygons.0.len());
            for polygon in &polygons.0 {
                write_header(out, GeometryType::Polygon);
                write_polygon(out, polygon);
            }
        }
        Geometry::GeometryCollection(collection) => {
            write_header(out, GeometryType::GeometryCollection);
            write_u32(out, collection.0.len());
            for g in &collection.0 {
                write_geometry(out, g);
            }
        }
    }
}

struct Header {
    kind: GeometryType,
    little_endian: bool,
    extra_dims: usize,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            VecorelError::geometry(format!("WKB truncated at byte {}", self.pos))
        })?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn u32(&mut self, little_endian: bool) -> Result<u32> {
        let buf = self.take::<4>()?;
        Ok(if little_endian {
            u32::from_le_bytes(buf)
        } else {
            u32::from_be_bytes(buf)
        })
    }

    fn f64(&mut self, little_endian: bool) -> Result<f64> {
        let buf = self.take::<8>()?;
        Ok(if little_endian {
            f64::from_le_bytes(buf)
        } else {
            f64::from_be_bytes(buf)
        })
    }

    fn count(&mut self, little_endian: bool) -> Result<usize> {
        let count = self.u32(little_endian)? as usize;
        // Every element needs at least one byte, guards against bogus counts
        if count > self.bytes.len().saturating_sub(self.pos) {
            return Err(VecorelError::geometry(format!(
                "WKB element count {count} exceeds remaining input"
            )));
        }
        Ok(count)
    }

    fn header(&mut self) -> Result<Header> {
        let [order] = self.take::<1>()?;
        let little_endian = match order {
            0 => false,
            1 => true,
            other => {
                return Err(VecorelError::geometry(format!("Invalid WKB byte order {other}")));
            }
        };
        let raw = self.u32(little_endian)?;

        let mut extra_dims = usize::from(raw & EWKB_Z != 0) + usize::from(raw & EWKB_M != 0);
        if raw & EWKB_SRID != 0 {
            self.u32(little_endian)?;
        }
        let code = raw & 0x0FFF_FFFF;
        let base = match code / 1000 {
            0 => code,
            1 | 2 => {
                extra_dims += 1;
                code % 1000
            }
            3 => {
                extra_dims += 2;
                code % 1000
            }
            _ => code,
        };
        let kind = GeometryType::from_wkb_code(base)
            .ok_or_else(|| VecorelError::geometry(format!("Unsupported WKB type code {raw}")))?;
        Ok(Header {
            kind,
            little_endian,
            extra_dims,
        })
    }

    fn coord(&mut self, header: &Header) -> Result<Coord<f64>> {
        let x = self.f64(header.little_endian)?;
        let y = self.f64(header.little_endian)?;
        for _ in 0..header.extra_dims {
            self.f64(header.little_endian)?;
        }
        Ok(Coord { x, y })
    }

    fn line_string(&mut self, header: &Header) -> Result<LineString<f64>> {
        let n = self.count(header.little_endian)?;
        let coords = (0..n)
            .map(|_| self.coord(header))
            .collect::<Result<Vec<_>>>()?;
        Ok(LineString::from(coords))
    }

    fn polygon(&mut self, header: &Header) -> Result<Polygon<f64>> {
        let rings = self.count(header.little_endian)?;
        if rings == 0 {
            return Ok(Polygon::new(LineString::new(vec![]), vec![]));
        }
        let exterior = self.line_string(header)?;
        let interiors = (1..rings)
            .map(|_| self.line_string(header))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn expect(&mut self, kind: GeometryType) -> Result<Header> {
        let header = self.header()?;
        if header.kind != kind {
            return Err(VecorelError::geometry(format!(
                "Expected {kind} inside multi geometry, got {}",
                header.kind
            )));
        }
        Ok(header)
    }

    fn geometry(&mut self) -> Result<Geometry<f64>> {
        let header = self.header()?;
        let le = header.little_endian;
        let geom = match header.kind {
            GeometryType::Point => Geometry::Point(Point(self.coord(&header)?)),
            GeometryType::LineString => Geometry::LineString(self.line_string(&header)?),
            GeometryType::Polygon => Geometry::Polygon(self.polygon(&header)?),
            GeometryType::MultiPoint => {
                let n = self.count(le)?;
                let points = (0..n)
                    .map(|_| {
                        let inner = self.expect(GeometryType::Point)?;
                        Ok(Point(self.coord(&inner)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPoint(MultiPoint(points))
            }
            GeometryType::MultiLineString => {
                let n = self.count(le)?;
                let lines = (0..n)
                    .map(|_| {
                        let inner = self.expect(GeometryType::LineString)?;
                        self.line_string(&inner)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiLineString(MultiLineString(lines))
            }
            GeometryType::MultiPolygon => {
                let n = self.count(le)?;
                let polygons = (0..n)
                    .map(|_| {
                        let inner = self.expect(GeometryType::Polygon)?;
                        self.polygon(&inner)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPolygon(MultiPolygon(polygons))
            }
            GeometryType::GeometryCollection => {
                let n = self.count(le)?;
                let geoms = (0..n)
                    .map(|_| self.geometry())
                    .collect::<Result<Vec<_>>>()?;
                Geometry::GeometryCollection(GeometryCollection(geoms))
            }
        };
        Ok(geom)
    }
}

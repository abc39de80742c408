//! Configuration for reading and writing Vecorel datasets.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use parquet::basic::{BrotliLevel, GzipLevel, ZstdLevel};

use crate::error::{Result, VecorelError};

/// Default number of rows per Parquet row group
pub const DEFAULT_ROW_GROUP_SIZE: usize = 25_000;

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> usize {
    std::env::var("VECOREL_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Named column compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Brotli,
    Gzip,
    Lz4,
    Snappy,
    Zstd,
    None,
}

impl Compression {
    /// Convert into the Parquet codec with default levels
    #[must_use]
    pub fn to_parquet(self) -> parquet::basic::Compression {
        use parquet::basic::Compression as Pq;
        match self {
            Self::Brotli => Pq::BROTLI(BrotliLevel::default()),
            Self::Gzip => Pq::GZIP(GzipLevel::default()),
            Self::Lz4 => Pq::LZ4_RAW,
            Self::Snappy => Pq::SNAPPY,
            Self::Zstd => Pq::ZSTD(ZstdLevel::default()),
            Self::None => Pq::UNCOMPRESSED,
        }
    }
}

impl FromStr for Compression {
    type Err = VecorelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "brotli" => Ok(Self::Brotli),
            "gzip" => Ok(Self::Gzip),
            "lz4" => Ok(Self::Lz4),
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "none" | "uncompressed" => Ok(Self::None),
            other => Err(VecorelError::Other(format!(
                "Unknown compression '{other}', expected one of brotli, gzip, lz4, snappy, zstd, none"
            ))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// GeoParquet specification version to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GeoParquetVersion {
    V1_0,
    #[default]
    V1_1,
}

impl GeoParquetVersion {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0.0",
            Self::V1_1 => "1.1.0",
        }
    }

    /// Whether this version writes a `bbox` covering column
    #[must_use]
    pub const fn writes_bbox(self) -> bool {
        matches!(self, Self::V1_1)
    }
}

impl FromStr for GeoParquetVersion {
    type Err = VecorelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.0" | "1.0.0" => Ok(Self::V1_0),
            "1.1" | "1.1.0" => Ok(Self::V1_1),
            other => Err(VecorelError::Other(format!(
                "Unsupported GeoParquet version '{other}', expected 1.0.0 or 1.1.0"
            ))),
        }
    }
}

impl fmt::Display for GeoParquetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit `uri -> local path` table consulted before any schema fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMap(HashMap<String, PathBuf>);

impl SchemaMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, path: impl Into<PathBuf>) {
        self.0.insert(uri.into(), path.into());
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&PathBuf> {
        self.0.get(uri)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse repeated `uri,path` pairs as given on the command line
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (uri, path) = pair.split_once(',').ok_or_else(|| {
                VecorelError::Other(format!(
                    "Schema mapping '{pair}' must have the form <uri>,<path>"
                ))
            })?;
            map.insert(uri.trim(), PathBuf::from(path.trim()));
        }
        Ok(map)
    }
}

/// Options for writing GeoParquet files
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Column compression codec
    pub compression: Compression,
    /// GeoParquet version of the `geo` metadata
    pub geoparquet_version: GeoParquetVersion,
    /// Maximum rows per row group
    pub row_group_size: usize,
    /// Local overrides for schema URIs
    pub schema_map: SchemaMap,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            geoparquet_version: GeoParquetVersion::default(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            schema_map: SchemaMap::default(),
        }
    }
}

/// Options for reading datasets
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Only read the first `num` rows
    pub num: Option<usize>,
    /// Only read these properties (plus the geometry and collection columns)
    pub properties: Option<Vec<String>>,
    /// Broadcast collection-level properties back into columns
    pub hydrate: bool,
}

impl ReadOptions {
    #[must_use]
    pub fn with_num(mut self, num: usize) -> Self {
        self.num = Some(num);
        self
    }

    #[must_use]
    pub fn with_hydrate(mut self, hydrate: bool) -> Self {
        self.hydrate = hydrate;
        self
    }

    /// Whether reading can stop early or skip values
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.num.is_some() || self.properties.is_some()
    }
}

/// Options for writing GeoJSON output
#[derive(Debug, Clone, Default)]
pub struct GeoJsonOptions {
    /// Write one file per feature instead of a FeatureCollection
    pub features: bool,
    /// Only write the first `num` features
    pub num: Option<usize>,
    /// Pretty-print with the given indentation
    pub indent: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_from_str() {
        assert_eq!("ZSTD".parse::<Compression>().unwrap(), Compression::Zstd);
        assert_eq!("uncompressed".parse::<Compression>().unwrap(), Compression::None);
        assert!("lzma".parse::<Compression>().is_err());
    }

    #[test]
    fn test_geoparquet_version() {
        assert_eq!("1.0".parse::<GeoParquetVersion>().unwrap(), GeoParquetVersion::V1_0);
        assert!(GeoParquetVersion::V1_1.writes_bbox());
        assert!(!GeoParquetVersion::V1_0.writes_bbox());
        assert!("2.0".parse::<GeoParquetVersion>().is_err());
    }

    #[test]
    fn test_schema_map_pairs() {
        let map = SchemaMap::from_pairs(["https://example.com/a.yaml,./a.yaml"]).unwrap();
        assert_eq!(map.get("https://example.com/a.yaml"), Some(&PathBuf::from("./a.yaml")));
        assert!(SchemaMap::from_pairs(["no-comma"]).is_err());
    }
}

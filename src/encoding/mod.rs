//! File encodings of a dataset: GeoParquet and GeoJSON.
//!
//! The encoding is picked from the file extension. Reading returns the
//! stored (dehydrated) view unless [`ReadOptions::hydrate`] is set.

pub mod geojson;
pub mod geoparquet;

use std::fmt;
use std::path::Path;

use crate::config::ReadOptions;
use crate::error::{Result, VecorelError};
use crate::frame::Dataset;
use crate::hydration::hydrate;
use crate::schema::{ResolveOptions, SchemaStore};
use crate::utils::logging::log_warning;

/// Supported file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    GeoParquet,
    GeoJson,
}

impl Encoding {
    /// Detect the encoding from a file extension.
    ///
    /// Directories are read as per-feature GeoJSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Self::GeoJson);
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("parquet" | "geoparquet") => Ok(Self::GeoParquet),
            Some("json" | "geojson") => Ok(Self::GeoJson),
            _ => Err(VecorelError::Other(format!(
                "Cannot detect the encoding of {}, expected .parquet or .json/.geojson",
                path.display()
            ))),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GeoParquet => "GeoParquet",
            Self::GeoJson => "GeoJSON",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read a dataset in whatever encoding the path has.
///
/// GeoJSON columns take their types from the resolved schemas. With
/// `hydrate` set, collection-level values are broadcast back into columns;
/// if the schemas cannot be resolved the types are inferred instead.
pub fn read_dataset(path: &Path, options: &ReadOptions, store: &SchemaStore) -> Result<Dataset> {
    let dataset = match Encoding::from_path(path)? {
        Encoding::GeoParquet => geoparquet::read(path, options)?,
        Encoding::GeoJson => geojson::read(path, options, Some(store))?,
    };
    if !options.hydrate {
        return Ok(dataset);
    }

    let resolved = match dataset.collection.resolve(store, ResolveOptions::default()) {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            log_warning(
                &format!("Hydrating without schemas, column types are inferred ({e})"),
                Some(path),
            );
            None
        }
    };
    hydrate(dataset, resolved.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_encoding_from_extension() {
        assert_eq!(
            Encoding::from_path(&PathBuf::from("fields.parquet")).unwrap(),
            Encoding::GeoParquet
        );
        assert_eq!(
            Encoding::from_path(&PathBuf::from("fields.GeoJSON")).unwrap(),
            Encoding::GeoJson
        );
        assert!(Encoding::from_path(&PathBuf::from("fields.csv")).is_err());
    }
}

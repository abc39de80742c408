//! Generic converter for local GeoJSON and GeoParquet files.

use super::{Converter, ConverterConfig};

/// Converts any GeoJSON or GeoParquet input given with `--input`, keeping
/// all columns as they are
pub struct GeoJsonConverter {
    config: ConverterConfig,
}

impl GeoJsonConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ConverterConfig {
                id: "geojson".to_string(),
                short_name: "GeoJSON".to_string(),
                title: "Generic GeoJSON/GeoParquet".to_string(),
                description: "Converts local GeoJSON or GeoParquet files without renaming \
                              any property. Pass the files with --input."
                    .to_string(),
                ..ConverterConfig::default()
            },
        }
    }
}

impl Default for GeoJsonConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for GeoJsonConverter {
    fn config(&self) -> &ConverterConfig {
        &self.config
    }
}

//! A Rust library for Vecorel vector datasets: schema resolution,
//! GeoParquet and GeoJSON encodings, validation, conversion and merging.

pub mod async_io;
pub mod collection;
pub mod commands;
pub mod config;
pub mod converters;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hydration;
pub mod jsonschema;
pub mod ops;
pub mod schema;
pub mod types;
pub mod utils;
pub mod validator;

// Re-export the most common types for easier use
pub use collection::Collection;
pub use config::{Compression, GeoJsonOptions, GeoParquetVersion, ReadOptions, SchemaMap, WriteOptions};
pub use error::{Result, VecorelError};
pub use frame::Dataset;
pub use schema::{ResolvedSchemas, SchemaStore, VecorelSchema};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Reading, writing and validating
pub use encoding::{read_dataset, Encoding};
pub use hydration::{dehydrate, hydrate};
pub use validator::{validate, ValidatorConfig};

// Async functionality
pub use async_io::{read_dataset_async, read_datasets_async};

//! Schema documents: typed model, cached store and resolution.

pub mod model;
pub mod resolver;
pub mod store;

pub use model::{AdditionalProperties, PropertySchema, VecorelSchema};
pub use resolver::{
    core_version, is_core_schema, is_supported_version, resolve, ResolveOptions, ResolvedSchemas, Schemas,
    DEFAULT_COLLECTION_ID, VECOREL_SCHEMA, VECOREL_VERSION,
};
pub use store::{Document, SchemaStore};

//! Resolution of a collection's schema list into effective schemas.
//!
//! Each collection id lists exactly one core schema (whose URI carries the
//! format version) and any number of extensions. Schemas are merged in list
//! order and the inline custom schema is merged last.

use std::sync::LazyLock;

use indexmap::IndexMap;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VecorelError};
use crate::schema::model::VecorelSchema;
use crate::schema::store::SchemaStore;

/// Format version implemented by this crate
pub const VECOREL_VERSION: &str = "0.1.0";

/// URI of the core schema for [`VECOREL_VERSION`]
pub const VECOREL_SCHEMA: &str = "https://vecorel.org/specification/v0.1.0/schema.yaml";

/// Collection id used when a dataset does not name one
pub const DEFAULT_COLLECTION_ID: &str = "default";

static CORE_SCHEMA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://.+/specification/v(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)/schema\.yaml$")
        .expect("core schema pattern is valid")
});

/// Whether the URI names a core schema
#[must_use]
pub fn is_core_schema(uri: &str) -> bool {
    CORE_SCHEMA_PATTERN.is_match(uri)
}

/// Extract the format version from a core schema URI
#[must_use]
pub fn core_version(uri: &str) -> Option<&str> {
    CORE_SCHEMA_PATTERN
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Compare versions on major.minor, which is what schema compatibility hinges on
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    fn major_minor(v: &str) -> Option<(&str, &str)> {
        let mut parts = v.split('.');
        Some((parts.next()?, parts.next()?))
    }
    major_minor(version).is_some() && major_minor(version) == major_minor(VECOREL_VERSION)
}

/// Mapping from collection id to its ordered list of schema URIs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schemas(IndexMap<String, Vec<String>>);

impl Schemas {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single collection using the core schema of this crate's version
    #[must_use]
    pub fn with_core(collection_id: &str) -> Self {
        let mut schemas = Self::new();
        schemas.add(collection_id, VECOREL_SCHEMA);
        schemas
    }

    /// Append a schema URI to a collection, ignoring duplicates
    pub fn add(&mut self, collection_id: &str, uri: &str) {
        let uris = self.0.entry(collection_id.to_string()).or_default();
        if !uris.iter().any(|u| u == uri) {
            uris.push(uri.to_string());
        }
    }

    #[must_use]
    pub fn get(&self, collection_id: &str) -> Option<&[String]> {
        self.0.get(collection_id).map(Vec::as_slice)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(id, uris)| (id.as_str(), uris.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The only collection id, if exactly one exists
    #[must_use]
    pub fn single_id(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.0.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Union with another mapping, per collection id
    pub fn merge(&mut self, other: &Schemas) {
        for (id, uris) in other.iter() {
            for uri in uris {
                self.add(id, uri);
            }
        }
    }

    /// Rename a collection id, keeping its position
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(index) = self.0.get_index_of(old) {
            if let Some((_, uris)) = self.0.shift_remove_index(index) {
                self.0.shift_insert(index, new.to_string(), uris);
            }
        }
    }

    /// Every distinct URI over all collections
    #[must_use]
    pub fn all_uris(&self) -> Vec<&str> {
        self.0.values().flatten().map(String::as_str).unique().collect()
    }
}

/// Split a schema list into the core schema URI, its version and the extensions
pub fn split_core(collection_id: &str, uris: &[String]) -> Result<(String, String, Vec<String>)> {
    let (cores, extensions): (Vec<&String>, Vec<&String>) =
        uris.iter().partition(|uri| is_core_schema(uri));

    match cores.as_slice() {
        [core] => {
            let version = core_version(core).unwrap_or_default().to_string();
            Ok((
                (*core).clone(),
                version,
                extensions.into_iter().cloned().collect(),
            ))
        }
        [] => Err(VecorelError::schema(format!(
            "Collection '{collection_id}' does not list a core schema"
        ))),
        _ => Err(VecorelError::schema(format!(
            "Collection '{collection_id}' lists more than one core schema: {}",
            cores.iter().join(", ")
        ))),
    }
}

/// Options controlling schema resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Accept collections that use different core versions
    pub allow_mixed_versions: bool,
}

/// Effective schemas of a dataset, one per collection id
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchemas {
    version: String,
    collections: IndexMap<String, VecorelSchema>,
    extensions: IndexMap<String, Vec<String>>,
}

impl ResolvedSchemas {
    /// Format version of the core schema(s)
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn get(&self, collection_id: &str) -> Option<&VecorelSchema> {
        self.collections.get(collection_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VecorelSchema)> {
        self.collections.iter().map(|(id, s)| (id.as_str(), s))
    }

    /// Extension URIs per collection (the core schema excluded)
    #[must_use]
    pub fn extensions(&self, collection_id: &str) -> &[String] {
        self.extensions
            .get(collection_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_multi_collection(&self) -> bool {
        self.collections.len() > 1
    }

    /// Combined view over all collections.
    ///
    /// Properties and collection flags are merged in collection order. A
    /// property stays required only if every collection requires it, since a
    /// property required by one collection may be absent from another's rows.
    #[must_use]
    pub fn merged(&self) -> VecorelSchema {
        let mut merged = VecorelSchema::new();
        for schema in self.collections.values() {
            merged.merge(schema);
        }
        if self.collections.len() > 1 {
            merged
                .required
                .retain(|p| self.collections.values().all(|s| s.is_required(p)));
        }
        merged
    }
}

/// Resolve every collection's schema list into an effective schema
pub fn resolve(
    store: &SchemaStore,
    schemas: &Schemas,
    custom: Option<&VecorelSchema>,
    options: ResolveOptions,
) -> Result<ResolvedSchemas> {
    if schemas.is_empty() {
        return Err(VecorelError::schema("No schemas declared for the collection"));
    }

    let mut resolved = ResolvedSchemas::default();
    for (id, uris) in schemas.iter() {
        let (core, version, extensions) = split_core(id, uris)?;

        if resolved.version.is_empty() {
            resolved.version = version;
        } else if resolved.version != version && !options.allow_mixed_versions {
            return Err(VecorelError::schema(format!(
                "Collection '{id}' uses version {version}, but another collection uses {}",
                resolved.version
            )));
        }

        let mut schema = store.load_schema(&core)?;
        for uri in &extensions {
            let extension = store.load_schema(uri)?;
            schema.merge(&extension);
        }
        if let Some(custom) = custom {
            schema.merge(custom);
        }

        log::debug!(
            "Resolved collection '{id}' with {} properties from {} schemas",
            schema.properties.len(),
            extensions.len() + 1
        );
        resolved.collections.insert(id.to_string(), schema);
        resolved.extensions.insert(id.to_string(), extensions);
    }

    Ok(resolved)
}

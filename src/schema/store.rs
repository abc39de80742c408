//! Read-through cache for schema documents.
//!
//! Documents are keyed by absolute URI. Local paths, `file://`, `http(s)://`,
//! `s3://` and `gs://` are accepted. A [`SchemaMap`] overlay is consulted
//! before anything is fetched, which keeps tests and offline runs away from
//! the network. Entries live for the lifetime of the store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::Value;
use url::Url;

use crate::config::SchemaMap;
use crate::error::{Result, VecorelError};
use crate::schema::model::VecorelSchema;

/// A fetched document after content negotiation
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Parsed YAML or JSON
    Structured(Value),
    /// Anything that is not recognised by its extension
    Raw(Vec<u8>),
}

impl Document {
    /// Parse raw bytes according to the extension of `uri`
    pub fn parse(uri: &str, bytes: Vec<u8>) -> Result<Self> {
        match extension_of(uri).as_deref() {
            Some("yaml" | "yml") => serde_yaml::from_slice::<Value>(&bytes)
                .map(Self::Structured)
                .map_err(|e| VecorelError::fetch(uri, format!("invalid YAML: {e}"))),
            Some("json" | "geojson") => serde_json::from_slice::<Value>(&bytes)
                .map(Self::Structured)
                .map_err(|e| VecorelError::fetch(uri, format!("invalid JSON: {e}"))),
            _ => Ok(Self::Raw(bytes)),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

fn extension_of(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Where a URI is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Remote(String),
}

/// Schema document cache shared by the resolver, validator and writers
#[derive(Debug, Default)]
pub struct SchemaStore {
    schema_map: SchemaMap,
    cache: RwLock<FxHashMap<String, Arc<Document>>>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl SchemaStore {
    #[must_use]
    pub fn new(schema_map: SchemaMap) -> Self {
        Self {
            schema_map,
            cache: RwLock::new(FxHashMap::default()),
            client: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn schema_map(&self) -> &SchemaMap {
        &self.schema_map
    }

    /// Whether a document is already cached
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.cache
            .read()
            .map(|cache| cache.contains_key(uri))
            .unwrap_or(false)
    }

    /// Seed the cache with an in-memory document
    pub fn insert(&self, uri: impl Into<String>, document: Document) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(uri.into(), Arc::new(document));
        }
    }

    /// Load a document, fetching it on first access
    pub fn load(&self, uri: &str) -> Result<Arc<Document>> {
        if let Some(doc) = self.cache.read().ok().and_then(|c| c.get(uri).cloned()) {
            return Ok(doc);
        }

        let bytes = match self.locate(uri)? {
            Location::Local(path) => {
                log::debug!("Loading {uri} from {}", path.display());
                std::fs::read(&path).map_err(|e| {
                    VecorelError::fetch(uri, format!("cannot read {}: {e}", path.display()))
                })?
            }
            Location::Remote(url) => {
                log::debug!("Fetching {uri} from {url}");
                self.fetch(uri, &url)?
            }
        };

        let document = Arc::new(Document::parse(uri, bytes)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| VecorelError::fetch(uri, "schema cache lock poisoned"))?;
        Ok(cache.entry(uri.to_string()).or_insert(document).clone())
    }

    /// Load a structured (YAML/JSON) document
    pub fn load_value(&self, uri: &str) -> Result<Value> {
        let document = self.load(uri)?;
        document
            .as_value()
            .cloned()
            .ok_or_else(|| VecorelError::fetch(uri, "document is neither YAML nor JSON"))
    }

    /// Load and parse a schema document
    pub fn load_schema(&self, uri: &str) -> Result<VecorelSchema> {
        let value = self.load_value(uri)?;
        VecorelSchema::from_value(value).map_err(|e| VecorelError::fetch(uri, e))
    }

    fn locate(&self, uri: &str) -> Result<Location> {
        if let Some(path) = self.schema_map.get(uri) {
            return Ok(Location::Local(path.clone()));
        }

        match Url::parse(uri) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Location::Remote(url.to_string())),
                "file" => url
                    .to_file_path()
                    .map(Location::Local)
                    .map_err(|()| VecorelError::fetch(uri, "invalid file URL")),
                "s3" => Ok(Location::Remote(object_store_url(
                    &url,
                    |bucket| format!("https://{bucket}.s3.amazonaws.com"),
                )?)),
                "gs" => Ok(Location::Remote(object_store_url(
                    &url,
                    |bucket| format!("https://storage.googleapis.com/{bucket}"),
                )?)),
                // Windows drive letters parse as a one-letter scheme
                scheme if scheme.len() == 1 => Ok(Location::Local(PathBuf::from(uri))),
                scheme => Err(VecorelError::fetch(uri, format!("unsupported scheme '{scheme}'"))),
            },
            Err(_) => Ok(Location::Local(Path::new(uri).to_path_buf())),
        }
    }

    fn fetch(&self, uri: &str, url: &str) -> Result<Vec<u8>> {
        let client = match self.client.get() {
            Some(client) => client,
            None => {
                let client = reqwest::blocking::Client::builder()
                    .timeout(Duration::from_secs(60))
                    .build()
                    .map_err(|e| VecorelError::fetch(uri, e))?;
                self.client.get_or_init(|| client)
            }
        };

        let response = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| VecorelError::fetch(uri, e))?;
        let bytes = response.bytes().map_err(|e| VecorelError::fetch(uri, e))?;
        Ok(bytes.to_vec())
    }
}

fn object_store_url(url: &Url, base: impl Fn(&str) -> String) -> Result<String> {
    let bucket = url
        .host_str()
        .ok_or_else(|| VecorelError::fetch(url.as_str(), "missing bucket name"))?;
    Ok(format!("{}{}", base(bucket), url.path()))
}

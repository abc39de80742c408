//! Validation of GeoParquet and GeoJSON datasets against their schemas.
//!
//! The validator never stops at the first problem: everything it finds is
//! collected into a [`Report`]. Only failures that make further checks
//! impossible (an unreadable file, say) end a run early, and those are
//! recorded as errors too.

pub mod columnar;
pub mod feature;
pub mod report;
pub mod values;

use std::path::Path;

use regex::Regex;

pub use report::{Issue, Level, Report};

use crate::collection::Collection;
use crate::encoding::Encoding;
use crate::schema::{is_supported_version, PropertySchema, ResolveOptions, ResolvedSchemas, SchemaStore, VecorelSchema, VECOREL_VERSION};
use crate::types::DataType;
use crate::utils::logging::log_operation_start;

/// What to check and how strictly
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Also check every row value, not only the file structure
    pub data: bool,
    /// Only check the first `num` rows
    pub num: Option<usize>,
    /// Schemas that must be declared, as URIs or regular expressions
    pub required_schemas: Vec<String>,
    /// Accept collections that use different core versions
    pub allow_mixed_versions: bool,
}

/// Validate one file, picking the checks from its encoding
#[must_use]
pub fn validate(path: &Path, config: &ValidatorConfig, store: &SchemaStore) -> Report {
    log_operation_start("Validating", path);
    let mut report = Report::new(path);
    let result = Encoding::from_path(path).and_then(|encoding| match encoding {
        Encoding::GeoParquet => columnar::validate(path, config, store, &mut report),
        Encoding::GeoJson => feature::validate(path, config, store, &mut report),
    });
    if let Err(e) = result {
        report.error(e.to_string());
    }
    report
}

/// Whether a schema URI satisfies a required-schema pattern.
///
/// A pattern matches if it equals the URI or, read as a regular expression,
/// matches the whole URI.
#[must_use]
pub fn schema_matches(pattern: &str, uri: &str) -> bool {
    pattern == uri
        || Regex::new(&format!("^(?:{pattern})$")).is_ok_and(|re| re.is_match(uri))
}

/// Shared first steps of both validators: the collection must exist and its
/// schemas must resolve. Returns `None` when nothing else can be checked.
pub(crate) fn resolve_collection(
    collection: &Collection,
    config: &ValidatorConfig,
    store: &SchemaStore,
    report: &mut Report,
) -> Option<ResolvedSchemas> {
    if collection.is_empty() {
        report.error("No collection metadata found");
        return None;
    }
    if let Err(e) = collection.check() {
        report.error(e.to_string());
        return None;
    }

    let options = ResolveOptions {
        allow_mixed_versions: config.allow_mixed_versions,
    };
    let resolved = match collection.resolve(store, options) {
        Ok(resolved) => resolved,
        Err(e) => {
            report.error(e.to_string());
            return None;
        }
    };

    if !is_supported_version(resolved.version()) {
        report.warning(format!(
            "Vecorel version {} differs from the supported version {VECOREL_VERSION}",
            resolved.version()
        ));
    }
    for (id, _) in resolved.iter() {
        let extensions = resolved.extensions(id);
        if !extensions.is_empty() {
            report.info(format!(
                "Collection '{id}' uses extensions: {}",
                extensions.join(", ")
            ));
        }
    }

    check_required_schemas(collection, &config.required_schemas, report);
    Some(resolved)
}

fn check_required_schemas(collection: &Collection, patterns: &[String], report: &mut Report) {
    if patterns.is_empty() {
        return;
    }
    let schemas = match collection.get_schemas() {
        Ok(schemas) => schemas,
        Err(e) => {
            report.error(e.to_string());
            return;
        }
    };
    let uris = schemas.all_uris();
    for pattern in patterns {
        if !uris.iter().any(|uri| schema_matches(pattern, uri)) {
            report.error(format!("Required schema '{pattern}' is not declared"));
        }
    }
}

/// Drop `uniqueItems` wherever the items are not scalar.
///
/// Returns true if anything was dropped.
pub(crate) fn strip_unsupported_unique(prop: &mut PropertySchema) -> bool {
    let mut stripped = false;
    if prop.unique_items == Some(true) {
        let scalar_items = prop
            .items
            .as_ref()
            .and_then(|items| items.data_type)
            .is_some_and(DataType::is_scalar);
        if !scalar_items {
            prop.unique_items = None;
            stripped = true;
        }
    }
    if let Some(items) = prop.items.as_deref_mut() {
        stripped |= strip_unsupported_unique(items);
    }
    if let Some(fields) = prop.properties.as_mut() {
        for field in fields.values_mut() {
            stripped |= strip_unsupported_unique(field);
        }
    }
    stripped
}

/// Copy of a schema without unsupported `uniqueItems`, noting every
/// property that was affected
pub(crate) fn without_unsupported_unique(schema: &VecorelSchema, report: &mut Report) -> VecorelSchema {
    let mut schema = schema.clone();
    for (name, prop) in &mut schema.properties {
        if strip_unsupported_unique(prop) {
            report.info(unique_items_note(name));
        }
    }
    schema
}

pub(crate) fn unique_items_note(property: &str) -> String {
    format!("{property}: uniqueItems is only checked for arrays of scalar values, skipped")
}

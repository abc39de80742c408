//! The fixed conversion pipeline every converter runs through.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowType, Field};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use url::Url;
use walkdir::WalkDir;

use crate::collection::Collection;
use crate::config::{ReadOptions, WriteOptions};
use crate::encoding::{geojson, geoparquet, Encoding};
use crate::error::{Result, VecorelError};
use crate::frame::json::{build_array, column_values, infer_type};
use crate::frame::{
    batch_from_columns, batch_geometries, concat_union, filter_rows, with_column, Dataset,
    GEOMETRY_COLUMN,
};
use crate::geometry::ops::is_polygon;
use crate::ops::improve::{explode_geometries, fix_geometries};
use crate::ops::reproject;
use crate::schema::{SchemaStore, Schemas};
use crate::utils::logging::{
    create_spinner, finish_and_clear, log_operation_complete, log_operation_start, log_warning,
};

use super::archive::InputToken;
use super::{ColumnFilter, Converter, ConverterConfig};

/// Directory for downloads when no cache is given
const DEFAULT_CACHE_DIR: &str = "vecorel-cache";

/// Options of a single conversion run
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Input tokens replacing the converter's sources
    pub inputs: Vec<String>,
    pub variant: Option<String>,
    /// Where downloaded sources are kept between runs
    pub cache: Option<PathBuf>,
    /// Keep geometries as they are instead of repairing and exploding them
    pub original_geometries: bool,
    pub write: WriteOptions,
}

/// Run a converter and write the result as GeoParquet
pub fn convert(
    converter: &dyn Converter,
    out: &Path,
    options: &ConvertOptions,
    store: &SchemaStore,
) -> Result<usize> {
    let start = Instant::now();
    let dataset = prepare(converter, options)?;
    let rows = dataset.num_rows();
    geoparquet::write(dataset, out, None, &options.write, store)?;
    log_operation_complete("converted", out, rows, start.elapsed());
    Ok(rows)
}

/// Everything up to writing: read, migrate, filter, map and describe
pub fn prepare(converter: &dyn Converter, options: &ConvertOptions) -> Result<Dataset> {
    let config = converter.config();
    let tokens = if options.inputs.is_empty() {
        config.sources_for(options.variant.as_deref())?.to_vec()
    } else {
        options.inputs.clone()
    };
    let files = collect_files(converter, &tokens, options.cache.as_deref())?;
    if files.is_empty() {
        return Err(VecorelError::Converter(format!(
            "Converter '{}' has no input files, pass them with --input",
            config.id
        )));
    }

    let mut datasets = Vec::with_capacity(files.len());
    for (path, source) in &files {
        log_operation_start("Reading source", path);
        let dataset = read_source(path)?;
        datasets.push(converter.file_migration(dataset, path, source)?);
    }
    let mut dataset = concat_sources(datasets)?;

    dataset = converter.migrate(dataset)?;
    dataset.batch = apply_filters(&dataset.batch, &config.column_filters)?;
    dataset.batch = map_columns(&dataset.batch, config)?;
    dataset.batch = add_columns(&dataset.batch, config)?;
    dataset.batch = ensure_id(&dataset.batch, config.index_as_id)?;
    if !options.original_geometries {
        dataset = polygons_only(dataset)?;
    }
    dataset.collection = describe(config)?;
    converter.post_migrate(dataset)
}

fn collect_files(
    converter: &dyn Converter,
    tokens: &[String],
    cache: Option<&Path>,
) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for raw in tokens {
        let token = InputToken::parse(raw);
        if token.is_archive() {
            return Err(VecorelError::Converter(format!(
                "Cannot read {token}: archives are not extracted, extract it and pass the members with --input"
            )));
        }
        let path = if token.is_remote() {
            download(&token.path, cache)?
        } else {
            PathBuf::from(&token.path)
        };

        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(&path)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .filter(|p| Encoding::from_path(p).is_ok())
                .filter(|p| {
                    let layer = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    converter.layer_filter(&layer, raw)
                })
                .collect();
            found.sort();
            files.extend(found.into_iter().map(|p| (p, raw.clone())));
        } else {
            files.push((path, raw.clone()));
        }
    }
    Ok(files)
}

/// Download a remote source once into the cache directory
pub fn download(url: &str, cache: Option<&Path>) -> Result<PathBuf> {
    let parsed = Url::parse(url).map_err(|e| VecorelError::fetch(url, e))?;
    let file_name = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
        .to_string();
    let dir = cache.map_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR), Path::to_path_buf);
    fs::create_dir_all(&dir).map_err(|e| VecorelError::io(&dir, e))?;
    let target = dir.join(file_name);
    if target.is_file() {
        log::info!("Using cached {}", target.display());
        return Ok(target);
    }

    let spinner = create_spinner(Some(&format!("Downloading {url}")));
    let bytes = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::bytes)
        .map_err(|e| VecorelError::fetch(url, e));
    finish_and_clear(&spinner);
    fs::write(&target, bytes?).map_err(|e| VecorelError::io(&target, e))?;
    Ok(target)
}

fn read_source(path: &Path) -> Result<Dataset> {
    let options = ReadOptions::default();
    match Encoding::from_path(path)? {
        Encoding::GeoParquet => geoparquet::read(path, &options),
        Encoding::GeoJson => geojson::read(path, &options, None),
    }
}

/// Concatenate sources in the CRS of the first one
fn concat_sources(datasets: Vec<Dataset>) -> Result<Dataset> {
    let crs = datasets.first().map(|d| d.crs.clone()).unwrap_or_default();
    let batches = datasets
        .into_iter()
        .map(|d| reproject(d, &crs).map(|d| d.batch))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::new(Collection::new(), concat_union(&batches)?).with_crs(crs))
}

fn apply_filters(
    batch: &RecordBatch,
    filters: &indexmap::IndexMap<String, ColumnFilter>,
) -> Result<RecordBatch> {
    let mut batch = batch.clone();
    for (name, filter) in filters {
        let column = batch.column_by_name(name).ok_or_else(|| {
            VecorelError::Converter(format!("Filter column '{name}' not found in the source"))
        })?;
        let mask: Vec<bool> = column_values(column.as_ref())?
            .iter()
            .map(|v| filter.keep(v))
            .collect();
        let before = batch.num_rows();
        batch = filter_rows(&batch, &mask)?;
        log::info!(
            "Filter {name} {filter} removed {} rows",
            before - batch.num_rows()
        );
    }
    Ok(batch)
}

/// Keep and rename the mapped columns; the geometry always stays
fn map_columns(batch: &RecordBatch, config: &ConverterConfig) -> Result<RecordBatch> {
    if config.columns.is_empty() {
        return Ok(batch.clone());
    }
    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(config.columns.len() + 1);
    if !config.columns.contains_key(GEOMETRY_COLUMN) {
        if let Some(geometry) = batch.column_by_name(GEOMETRY_COLUMN) {
            columns.push((GEOMETRY_COLUMN.to_string(), geometry.clone()));
        }
    }
    for (source, target) in &config.columns {
        match batch.column_by_name(source) {
            Some(column) => columns.push((target.clone(), column.clone())),
            None => log_warning(&format!("Source column '{source}' not found"), None),
        }
    }
    let mapped = batch_from_columns(columns)?;
    if mapped.num_rows() != batch.num_rows() {
        return Err(VecorelError::Converter("No source columns matched the column map".to_string()));
    }
    Ok(mapped)
}

fn add_columns(batch: &RecordBatch, config: &ConverterConfig) -> Result<RecordBatch> {
    let mut batch = batch.clone();
    for (name, value) in &config.column_additions {
        let values: Vec<&Value> = vec![value; batch.num_rows()];
        let field = Field::new(name, infer_type(&values), true);
        let array = build_array(&field, &values)?;
        batch = with_column(&batch, field, array)?;
    }
    Ok(batch)
}

/// The core schema wants string ids
fn ensure_id(batch: &RecordBatch, index_as_id: bool) -> Result<RecordBatch> {
    let ids: ArrayRef = if index_as_id {
        Arc::new(StringArray::from_iter_values(
            (0..batch.num_rows()).map(|i| i.to_string()),
        ))
    } else {
        match batch.column_by_name("id") {
            Some(ids) if ids.data_type() != &ArrowType::Utf8 => cast(ids, &ArrowType::Utf8)?,
            _ => return Ok(batch.clone()),
        }
    };
    with_column(batch, Field::new("id", ArrowType::Utf8, true), ids)
}

/// Repair, explode and keep only polygons. Decoding already reduced every
/// geometry to two dimensions.
fn polygons_only(dataset: Dataset) -> Result<Dataset> {
    let dataset = explode_geometries(fix_geometries(dataset)?)?;
    let mask: Vec<bool> = batch_geometries(&dataset.batch)?
        .iter()
        .map(|g| g.as_ref().is_some_and(is_polygon))
        .collect();
    let dropped = mask.iter().filter(|keep| !**keep).count();
    if dropped > 0 {
        log_warning(&format!("Removed {dropped} rows without a polygon geometry"), None);
    }
    let batch = filter_rows(&dataset.batch, &mask)?;
    Ok(Dataset { batch, ..dataset })
}

/// Collection metadata of the converter output
fn describe(config: &ConverterConfig) -> Result<Collection> {
    let mut schemas = Schemas::with_core(&config.id);
    for extension in &config.extensions {
        schemas.add(&config.id, extension);
    }
    let mut collection = Collection::with_schemas(&schemas);
    collection.insert("title", Value::from(config.title.clone()));
    if !config.description.is_empty() {
        collection.insert("description", Value::from(config.description.clone()));
    }
    if let Some(license) = &config.license {
        collection.insert("license", Value::from(license.clone()));
    }
    if let Some(attribution) = &config.attribution {
        collection.insert("attribution", Value::from(attribution.clone()));
    }
    if !config.providers.is_empty() {
        collection.insert("providers", serde_json::to_value(&config.providers)?);
    }
    collection.set_custom_schemas(&config.missing_schemas)?;
    Ok(collection)
}

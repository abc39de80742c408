//! Dataset transformations behind `improve`, `merge` and `rename-extension`.

pub mod improve;
pub mod merge;
pub mod rename_extension;

use arrow::datatypes::{DataType as ArrowType, Field};
use geo_types::Geometry;

use crate::error::Result;
use crate::frame::{batch_geometries, drop_columns, geometry_array, with_column, Dataset, BBOX_COLUMN, GEOMETRY_COLUMN};
use crate::geometry::crs::Transformer;
use crate::geometry::Crs;

pub use improve::{improve, ImproveOptions};
pub use merge::{merge, MergeOptions};
pub use rename_extension::{rename_extension, ExtensionNames};

/// Replace the primary geometries, dropping the now stale bbox column
pub(crate) fn set_geometries(dataset: Dataset, geometries: &[Option<Geometry<f64>>]) -> Result<Dataset> {
    let schema = dataset.batch.schema();
    let nullable = schema
        .field_with_name(GEOMETRY_COLUMN)
        .map_or(true, |f| f.is_nullable());
    let batch = with_column(
        &dataset.batch,
        Field::new(GEOMETRY_COLUMN, ArrowType::Binary, nullable),
        geometry_array(geometries),
    )?;
    let batch = drop_columns(&batch, &[BBOX_COLUMN])?;
    Ok(Dataset { batch, ..dataset })
}

/// Transform the primary geometries into another CRS
pub fn reproject(dataset: Dataset, crs: &Crs) -> Result<Dataset> {
    let Some(transformer) = Transformer::new(&dataset.crs, crs)? else {
        return Ok(dataset);
    };
    if dataset.column(GEOMETRY_COLUMN).is_none() {
        return Ok(dataset.with_crs(crs.clone()));
    }
    log::debug!("Reprojecting from {} to {crs}", dataset.crs);
    let mut geometries = batch_geometries(&dataset.batch)?;
    for geom in geometries.iter_mut().flatten() {
        transformer.transform(geom)?;
    }
    Ok(set_geometries(dataset, &geometries)?.with_crs(crs.clone()))
}

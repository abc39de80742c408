//! Concurrent loading of many input files.
//!
//! Decoding a dataset is blocking, CPU-heavy work, so every file is read on
//! a tokio blocking task while a bounded number of reads run at once.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use itertools::Itertools;

use crate::config::ReadOptions;
use crate::encoding::read_dataset;
use crate::error::{Result, VecorelError};
use crate::frame::Dataset;
use crate::schema::SchemaStore;

/// Read one dataset on a blocking task
pub async fn read_dataset_async(
    path: PathBuf,
    options: ReadOptions,
    store: Arc<SchemaStore>,
) -> Result<Dataset> {
    tokio::task::spawn_blocking(move || read_dataset(&path, &options, &store))
        .await
        .map_err(|e| VecorelError::Other(format!("Task join error: {e}")))?
}

/// Read datasets concurrently, returned in the order of `paths`
///
/// # Errors
/// Returns the first error of any file; all reads are awaited first
pub async fn read_datasets_async(
    paths: &[PathBuf],
    options: &ReadOptions,
    store: Arc<SchemaStore>,
) -> Result<Vec<(PathBuf, Dataset)>> {
    let parallelism = num_cpus::get().min(paths.len()).max(1);
    log::info!(
        "Reading {} files with up to {parallelism} concurrent reads",
        paths.len()
    );

    let results = stream::iter(paths.iter().cloned().enumerate())
        .map(|(index, path)| {
            let options = options.clone();
            let store = Arc::clone(&store);
            async move {
                let result = read_dataset_async(path.clone(), options, store).await;
                (index, path, result)
            }
        })
        .buffer_unordered(parallelism)
        .collect::<Vec<_>>()
        .await;

    results
        .into_iter()
        .sorted_by_key(|(index, _, _)| *index)
        .map(|(_, path, result)| match result {
            Ok(dataset) => Ok((path, dataset)),
            Err(e) => {
                log::error!("Error loading {}: {e}", path.display());
                Err(e.context(path.display()))
            }
        })
        .collect()
}

//! Log lines shared by the encodings, the conversion pipeline and commands.

use std::path::Path;
use std::time::Duration;

/// `"{operation} {path}"` at info level, e.g. `Reading GeoJSON data.json`
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{operation} {}", path.display());
}

/// Report how many features an operation handled and how long it took
///
/// `operation` is past tense: `read`, `wrote`, `merged`.
pub fn log_operation_complete(operation: &str, path: &Path, rows: usize, elapsed: Duration) {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 && rows > 0 {
        log::info!(
            "Successfully {operation} {rows} features for {} in {elapsed:.2?} ({:.0} features/s)",
            path.display(),
            rows as f64 / seconds
        );
    } else {
        log::info!("Successfully {operation} {rows} features for {}", path.display());
    }
}

/// Warning, optionally tagged with the file it concerns
pub fn log_warning(message: &str, path: Option<&Path>) {
    match path {
        Some(path) => log::warn!("{}: {message}", path.display()),
        None => log::warn!("{message}"),
    }
}

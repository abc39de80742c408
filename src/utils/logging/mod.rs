//! Log lines, console summaries and progress bars used by the commands.

pub mod console;
pub mod log;
pub mod progress;

pub use self::log::{log_operation_complete, log_operation_start, log_warning};
pub use self::progress::{create_main_progress_bar, create_spinner, finish_and_clear};

//! Logging, progress reporting and shared test fixtures

pub mod logging;

#[cfg(test)]
pub mod test;

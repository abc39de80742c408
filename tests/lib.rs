//! Main test module that includes all sub-modules
//! Run specific tests with `cargo test <module>::<submodule>`
//! For example: `cargo test integration::validate_test`

// Utility modules
pub mod utils;

// Integration tests
pub mod integration {
    pub mod async_test;
    pub mod cli_test;
    pub mod convert_test;
    pub mod merge_test;
    pub mod roundtrip_test;
    pub mod validate_test;
}

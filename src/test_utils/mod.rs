//! Test utilities for stackbuild
//!
//! Helpers for unit and integration tests: one-time logging setup and a scratch
//! directory holding a stack document, a settings file and a secrets file.
//!
//! # Example
//!
//! ```rust,no_run
//! use stackbuild_cli::test_utils::{StackFixture, SAMPLE_DOCUMENT};
//!
//! let fixture = StackFixture::new().unwrap();
//! let document = fixture.write_document(SAMPLE_DOCUMENT).unwrap();
//! assert!(document.exists());
//! ```

mod fixtures;

pub use fixtures::{SAMPLE_DOCUMENT, StackFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays off.
/// Only the first call has any effect.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

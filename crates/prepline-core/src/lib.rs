//! Prepline Core - Common infrastructure for the preprint migration pipeline
//!
//! This crate provides the pieces shared by the OSF API walker and the
//! import document generator: the HTTP client and runtime, error
//! classification, bounded retry, logging, progress and shutdown handling.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use error::ApiError;
pub use http::{http_client, http_config, set_http_config, HttpConfig, SHARED_RUNTIME};
pub use logging::{init_logging, IndicatifLogger};
pub use progress::ProgressContext;
pub use retry::{run_with_retry, RetryOutcome};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};

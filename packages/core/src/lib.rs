// Library root. `main.rs` and the integration tests in `tests/` both
// build on these modules.

pub mod alerts;
pub mod metrics;
pub mod monitor;
pub mod scheduler;
pub mod services;

// Binary plumbing. Public so `main.rs` can share it with the tests.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

//! Target Monitoring Module
//!
//! Building blocks of a monitoring loop: target validation, time-window
//! gating, retry with backoff, check execution, and alert deduplication.
//! The loops themselves live in [`crate::scheduler`].

pub mod config;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod types;
pub mod window;

pub use config::{CheckTimeouts, MonitorConfig, RetryPolicy};
pub use dedup::AlertState;
pub use error::{MonitorError, MonitorResult, Retryable};
pub use executor::CheckExecutor;
pub use provider::{Analyzer, DeliveryReport, FailedDelivery, Fetcher, Notifier};
pub use registry::{RawTarget, RegistryLoad};
pub use types::*;

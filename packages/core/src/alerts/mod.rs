//! Alert formatting.

pub mod message;

pub use message::{render, AlertPayload, DEFAULT_TEMPLATE};

//! Domain layer for wayfind.
//!
//! Geometry, the query/result model, the client traits behind which the
//! external geocoding and feature services sit, and the small stateful
//! pieces the workflow is built from: debouncer, status reporter, selection
//! manager and operation tracking.

pub mod config;
pub mod debounce;
pub mod error;
pub mod geometry;
pub mod operation;
pub mod search;
pub mod selection;
pub mod status;

// Re-export common error type
pub use error::{Result, WayfindError};

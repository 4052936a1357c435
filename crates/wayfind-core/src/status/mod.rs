//! Progress status of long-running operations.

pub mod model;
pub mod reporter;

pub use model::{OperationStatus, StatusChange};
pub use reporter::StatusReporter;

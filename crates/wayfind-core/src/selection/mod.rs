//! Selection / highlight tracking.

pub mod manager;

pub use manager::SelectionManager;

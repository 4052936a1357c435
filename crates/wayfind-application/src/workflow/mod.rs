//! Search-and-display workflow.
//!
//! Wires the debouncer, geocode client, selection manager and status
//! reporters into one coordinator with a single serialized update path.

mod command;
mod event;
mod handle;
mod operations;
mod runner;
mod state;

pub use command::{InputField, SearchRequest};
pub use event::{DisplayEvent, ResultStream, SuggestLookup, WorkflowSnapshot};
pub use handle::{SearchWorkflow, WorkflowBuilder};

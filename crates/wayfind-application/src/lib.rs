//! Application layer for wayfind.
//!
//! Coordinates type-ahead suggestions, forward search, feature queries,
//! selection and status reporting behind a single handle,
//! [`SearchWorkflow`].

pub mod workflow;

pub use workflow::{
    DisplayEvent, InputField, ResultStream, SearchRequest, SearchWorkflow, SuggestLookup,
    WorkflowBuilder, WorkflowSnapshot,
};

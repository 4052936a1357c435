//! Search, geocode and feature-query domain.
//!
//! This module holds the query/result data model and the traits behind which
//! the external services sit:
//! - forward geocoding, reverse lookup and suggestions (`GeocodeClient`)
//! - attribute queries on feature tables (`FeatureSource`)

pub mod model;
pub mod service;

pub use model::{
    ATTR_MATCH_ADDRESS, ATTR_MATCH_TITLE, FeatureQuery, Query, ResultItem, ResultSet,
    SearchParams, SuggestParams, Suggestion,
};
pub use service::{FeatureSource, GeocodeClient};

//! Data types shared between the core and the API

/// Model asset format: extractor settings and reference embeddings.
pub mod catalog;
/// Distance vectors and ranking results.
pub mod ranking;

//! Core functionality: feature extraction, inference and ranking

/// Image embedding extractors.
pub mod embeddings;
/// Histogram features and distance metrics.
pub mod features;
/// Fingerprints for model assets.
pub mod hash;
pub mod inference;
pub mod ranker;
pub mod registry;

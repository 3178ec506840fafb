#![doc(html_root_url = "https://docs.rs/imagerank/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # ImageRank
//!
//! Ranks a fixed reference image set by embedding distance to a query image.
//!
//! ## Features
//!
//! - **Top-k ranking**: stable nearest-first selection over a distance vector
//! - **Feature extraction**: colour-histogram embeddings, or ResNet-50 with `torch`
//! - **Model assets**: versioned JSON catalogs of reference embeddings, reloadable at runtime
//! - **Web API**: HTTP endpoints for ranking uploads and raw distance vectors
//!
//! ## Quick Start
//!
//! ```rust
//! use imagerank::rank;
//!
//! let ranking = rank(&[0.9, 0.1, 0.5, 0.1], 3);
//! assert_eq!(ranking.indices(), vec![1, 3, 2]);
//! print!("{}", ranking);
//! ```

// Internal modules
pub mod api;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod models;
mod state;
mod utils;

/// Build-time information generated by `build.rs`.
#[allow(dead_code, missing_docs, unreachable_pub)]
pub(crate) mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

use image::DynamicImage;
use std::sync::Arc;

// Public API exports
pub use crate::{
    core::{
        inference::{query_distances, CatalogModel, SimilarityModel},
        ranker::{rank, rank_bounded},
        registry::{ModelEvent, ModelInfo, ModelRegistry},
    },
    error::{AppError, Result, ResultExt},
    models::{
        catalog::{DistanceMetric, ExtractorConfig, ReferenceCatalog, ReferenceImage},
        ranking::{DistanceVector, RankedMatch, RankingResult},
    },
    state::{AppState, Config},
};

#[cfg(feature = "web")]
pub use crate::api::create_router;

/// Initialize the application with default settings
///
/// Sets up `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
/// Calling it more than once is harmless.
///
/// # Example
///
/// ```no_run
/// use imagerank::init;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    let initialized = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    if initialized.is_ok() {
        log::info!("Initializing ImageRank {}", built_info::PKG_VERSION);
    }
    Ok(())
}

/// Runs the model on `image` and returns its `k` nearest references
///
/// Inference happens on the blocking thread pool. A failed inference is
/// reported as [`AppError::NoDistances`].
pub async fn rank_image(
    model: Arc<dyn SimilarityModel>,
    image: DynamicImage,
    k: i64,
) -> Result<RankingResult> {
    let distances = query_distances(model, image).await?;
    Ok(rank(&distances, k))
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// How distances between embeddings are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// One minus cosine similarity.
    Cosine,
}

/// The feature extractor a catalog's embeddings were produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
    /// Per-channel RGB histogram of a centre crop.
    ColorHistogram {
        /// Buckets per channel.
        bins: usize,
        /// Side length the crop is resized to before counting.
        input_size: u32,
    },
    /// ResNet-50 without its classification layer.
    Resnet50 {
        /// Path to the saved weights, relative to the asset file.
        weights: PathBuf,
    },
}

impl ExtractorConfig {
    /// Length of the embeddings this extractor produces.
    pub fn dimension(&self) -> usize {
        match self {
            Self::ColorHistogram { bins, .. } => 3 * bins,
            Self::Resnet50 { .. } => 2048,
        }
    }
}

/// One entry of the reference image set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Display label, if the asset carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Precomputed embedding.
    pub embedding: Vec<f32>,
}

/// A model asset: extractor settings plus the reference embeddings.
///
/// The position of a reference in `references` is its identifier in every
/// distance vector computed against this catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    /// Asset name.
    pub name: String,
    /// Distance metric used at query time.
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Feature extractor settings.
    pub extractor: ExtractorConfig,
    /// The reference image set.
    pub references: Vec<ReferenceImage>,
}

impl ReferenceCatalog {
    /// Parses and validates a catalog from JSON.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json_str)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serializes the catalog to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of reference images.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether the catalog has no references.
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Label of reference `index`, if any.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.references.get(index)?.label.as_deref()
    }

    /// Checks the reference set against the extractor's shape.
    pub fn validate(&self) -> Result<()> {
        if let ExtractorConfig::ColorHistogram { bins, input_size } = self.extractor {
            if bins == 0 || bins > 256 {
                return Err(AppError::Validation(format!(
                    "histogram bins must be in 1..=256, got {}",
                    bins
                )));
            }
            if input_size == 0 {
                return Err(AppError::Validation("input_size must be positive".into()));
            }
        }

        if self.references.is_empty() {
            return Err(AppError::Validation(format!(
                "catalog '{}' has no reference images",
                self.name
            )));
        }

        let dim = self.extractor.dimension();
        for (i, reference) in self.references.iter().enumerate() {
            if reference.embedding.len() != dim {
                return Err(AppError::Validation(format!(
                    "reference {} has dimension {}, expected {}",
                    i,
                    reference.embedding.len(),
                    dim
                )));
            }
            if reference.embedding.iter().any(|v| !v.is_finite()) {
                return Err(AppError::Validation(format!(
                    "reference {} contains a non-finite value",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Resolves an extractor-relative path against the asset's directory.
    pub fn resolve_path(&self, asset_path: &Path, relative: &Path) -> PathBuf {
        match asset_path.parent() {
            Some(dir) if relative.is_relative() => dir.join(relative),
            _ => relative.to_path_buf(),
        }
    }
}

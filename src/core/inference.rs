//! The inference boundary: image in, distance vector out.

use image::DynamicImage;
use ndarray::Array1;
use std::{fmt, path::Path, sync::Arc};

use super::embeddings::Embedder;
use super::features::{self, ColorHistogramEmbedder};
use crate::{
    error::{AppError, Result},
    models::{
        catalog::{DistanceMetric, ExtractorConfig, ReferenceCatalog},
        ranking::DistanceVector,
    },
};

/// A model that scores a query image against a fixed reference set.
pub trait SimilarityModel: Send + Sync + fmt::Debug {
    /// Size of the reference set; every distance vector has this length.
    fn reference_count(&self) -> usize;

    /// Label of reference `index`, if known.
    fn label(&self, _index: usize) -> Option<&str> {
        None
    }

    /// Computes one distance per reference image.
    fn distances(&self, image: &DynamicImage) -> Result<DistanceVector>;
}

/// A [`SimilarityModel`] backed by a catalog of precomputed embeddings.
#[derive(Debug)]
pub struct CatalogModel {
    catalog: ReferenceCatalog,
    references: Vec<Array1<f32>>,
    embedder: Box<dyn Embedder>,
}

impl CatalogModel {
    /// Pairs a catalog with an embedder, checking that their dimensions agree.
    pub fn new(catalog: ReferenceCatalog, embedder: Box<dyn Embedder>) -> Result<Self> {
        catalog.validate()?;
        if embedder.dimension() != catalog.extractor.dimension() {
            return Err(AppError::Validation(format!(
                "embedder produces {} values, catalog expects {}",
                embedder.dimension(),
                catalog.extractor.dimension()
            )));
        }

        let references = catalog
            .references
            .iter()
            .map(|r| Array1::from(r.embedding.clone()))
            .collect();

        Ok(Self {
            catalog,
            references,
            embedder,
        })
    }

    /// Builds the embedder the catalog names.
    ///
    /// `asset_path` is used to resolve relative weight files.
    pub fn from_catalog(catalog: ReferenceCatalog, asset_path: &Path) -> Result<Self> {
        let embedder: Box<dyn Embedder> = match &catalog.extractor {
            ExtractorConfig::ColorHistogram { bins, input_size } => {
                Box::new(ColorHistogramEmbedder::new(*bins, *input_size)?)
            }
            #[cfg(feature = "torch")]
            ExtractorConfig::Resnet50 { weights } => {
                let weights = catalog.resolve_path(asset_path, weights);
                Box::new(super::embeddings::ResNetEmbedder::load(weights)?)
            }
            #[cfg(not(feature = "torch"))]
            ExtractorConfig::Resnet50 { .. } => {
                let _ = asset_path;
                return Err(AppError::Config(
                    "the resnet50 extractor requires the `torch` feature".to_string(),
                ));
            }
        };
        Self::new(catalog, embedder)
    }

    /// The catalog this model scores against.
    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// The metric distances are computed with.
    pub fn metric(&self) -> DistanceMetric {
        self.catalog.metric
    }
}

impl SimilarityModel for CatalogModel {
    fn reference_count(&self) -> usize {
        self.references.len()
    }

    fn label(&self, index: usize) -> Option<&str> {
        self.catalog.label(index)
    }

    fn distances(&self, image: &DynamicImage) -> Result<DistanceVector> {
        let query = self.embedder.embed(image)?;
        if query.len() != self.embedder.dimension() {
            return Err(AppError::NoDistances(format!(
                "embedding has {} values, expected {}",
                query.len(),
                self.embedder.dimension()
            )));
        }

        let metric = self.metric();
        let distances = self
            .references
            .iter()
            .map(|reference| features::distance(metric, &query, reference))
            .collect::<Vec<_>>();
        Ok(DistanceVector::new(distances))
    }
}

/// Runs inference on the blocking pool and hands back the distance vector.
///
/// Any failure, including a panicking model or a vector whose length does not
/// match the reference set, is reported as [`AppError::NoDistances`].
pub async fn query_distances(
    model: Arc<dyn SimilarityModel>,
    image: DynamicImage,
) -> Result<DistanceVector> {
    let expected = model.reference_count();
    let outcome = tokio::task::spawn_blocking(move || model.distances(&image))
        .await
        .map_err(|e| AppError::NoDistances(format!("inference task failed: {}", e)))?;

    let distances = match outcome {
        Ok(distances) => distances,
        Err(AppError::NoDistances(cause)) => return Err(AppError::NoDistances(cause)),
        Err(e) => return Err(AppError::NoDistances(e.to_string())),
    };

    if distances.len() != expected {
        return Err(AppError::NoDistances(format!(
            "model returned {} distances for {} reference images",
            distances.len(),
            expected
        )));
    }
    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ReferenceImage;
    use image::RgbImage;

    fn solid(color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 12, image::Rgb(color)))
    }

    fn catalog_for(colors: &[[u8; 3]]) -> ReferenceCatalog {
        let embedder = ColorHistogramEmbedder::new(4, 8).unwrap();
        ReferenceCatalog {
            name: "colors".to_string(),
            metric: DistanceMetric::Euclidean,
            extractor: ExtractorConfig::ColorHistogram {
                bins: 4,
                input_size: 8,
            },
            references: colors
                .iter()
                .map(|c| ReferenceImage {
                    label: Some(format!("{:?}", c)),
                    embedding: embedder.embed(&solid(*c)).unwrap().to_vec(),
                })
                .collect(),
        }
    }

    #[derive(Debug)]
    struct ShortModel;

    impl SimilarityModel for ShortModel {
        fn reference_count(&self) -> usize {
            3
        }

        fn distances(&self, _image: &DynamicImage) -> Result<DistanceVector> {
            Ok(DistanceVector::new(vec![0.1, 0.2]))
        }
    }

    #[derive(Debug)]
    struct CrashingModel;

    impl SimilarityModel for CrashingModel {
        fn reference_count(&self) -> usize {
            2
        }

        fn distances(&self, _image: &DynamicImage) -> Result<DistanceVector> {
            panic!("model crashed")
        }
    }

    #[test]
    fn test_identical_image_is_nearest() {
        let catalog = catalog_for(&[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
        let model = CatalogModel::from_catalog(catalog, Path::new("colors.json")).unwrap();

        let distances = model.distances(&solid([0, 255, 0])).unwrap();
        assert_eq!(distances.len(), 3);
        assert!(distances[1] < 1e-6);
        assert!(distances[0] > 0.5);
        assert_eq!(model.label(1), Some("[0, 255, 0]"));
    }

    #[test]
    fn test_resnet_without_torch_is_config_error() {
        let mut catalog = catalog_for(&[[1, 2, 3]]);
        catalog.extractor = ExtractorConfig::Resnet50 {
            weights: "resnet50.ot".into(),
        };
        catalog.references[0].embedding = vec![0.0; 2048];
        let err = CatalogModel::from_catalog(catalog, Path::new("a.json")).unwrap_err();
        if cfg!(feature = "torch") {
            assert!(!matches!(err, AppError::Validation(_)));
        } else {
            assert!(matches!(err, AppError::Config(_)));
        }
    }

    #[tokio::test]
    async fn test_query_runs_off_thread() {
        let catalog = catalog_for(&[[10, 10, 10], [200, 200, 200]]);
        let model: Arc<dyn SimilarityModel> =
            Arc::new(CatalogModel::from_catalog(catalog, Path::new("c.json")).unwrap());

        let distances = query_distances(model, solid([200, 200, 200])).await.unwrap();
        assert_eq!(distances.len(), 2);
        assert!(distances[1] < distances[0]);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_no_distances() {
        let err = query_distances(Arc::new(ShortModel), solid([0, 0, 0]))
            .await
            .unwrap_err();
        match err {
            AppError::NoDistances(cause) => assert!(cause.contains("2 distances for 3")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_model_is_no_distances() {
        let err = query_distances(Arc::new(CrashingModel), solid([0, 0, 0]))
            .await
            .unwrap_err();
        match err {
            AppError::NoDistances(cause) => assert!(cause.contains("panicked")),
            other => panic!("unexpected error: {}", other),
        }
    }
}

use std::sync::Arc;

use assert_fs::prelude::*;
use image::{DynamicImage, RgbImage};
use predicates::prelude::*;

use imagerank::core::embeddings::Embedder;
use imagerank::core::features::ColorHistogramEmbedder;
use imagerank::{
    rank, rank_bounded, rank_image, AppError, DistanceMetric, ExtractorConfig, ModelRegistry,
    ReferenceCatalog, ReferenceImage, SimilarityModel,
};

fn solid(color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 16, image::Rgb(color)))
}

fn catalog_json(colors: &[(&str, [u8; 3])]) -> String {
    let embedder = ColorHistogramEmbedder::new(8, 16).unwrap();
    let catalog = ReferenceCatalog {
        name: "ImageSimilarity".to_string(),
        metric: DistanceMetric::Cosine,
        extractor: ExtractorConfig::ColorHistogram {
            bins: 8,
            input_size: 16,
        },
        references: colors
            .iter()
            .map(|(label, color)| ReferenceImage {
                label: Some(label.to_string()),
                embedding: embedder.embed(&solid(*color)).unwrap().to_vec(),
            })
            .collect(),
    };
    catalog.to_json().unwrap()
}

fn pairs(distances: &[f64], k: i64) -> Vec<(usize, f64)> {
    rank(distances, k)
        .iter()
        .map(|m| (m.index, m.distance))
        .collect()
}

#[test]
fn test_rank_examples() {
    assert_eq!(
        pairs(&[0.9, 0.1, 0.5, 0.1], 3),
        vec![(1, 0.1), (3, 0.1), (2, 0.5)]
    );
    assert!(pairs(&[], 5).is_empty());
    assert!(pairs(&[0.3, 0.2], 0).is_empty());
}

#[test]
fn test_full_ranking_is_a_permutation() {
    let distances = [0.42, 0.0, 0.42, 3.5, 0.17, 0.42, 1.0];
    for k in [distances.len() as i64, 100, i64::MAX] {
        let ranking = rank(&distances, k);
        let mut indices = ranking.indices();
        assert_eq!(indices, vec![1, 4, 0, 2, 5, 6, 3]);
        indices.sort_unstable();
        assert_eq!(indices, (0..distances.len()).collect::<Vec<_>>());
        assert!(ranking
            .windows(2)
            .all(|w| w[0].distance < w[1].distance
                || (w[0].distance == w[1].distance && w[0].index < w[1].index)));
    }
}

#[test]
fn test_prefix_property_holds_for_both_strategies() {
    let distances: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64 / 10.0).collect();
    let full = rank(&distances, distances.len() as i64);
    for k in 0..distances.len() {
        let partial = rank_bounded(&distances, k as i64);
        assert_eq!(&full[..k], &partial[..]);
    }
}

#[test]
fn test_pipeline_ranks_closest_reference_first() {
    let dir = assert_fs::TempDir::new().unwrap();
    let asset = dir.child("ImageSimilarity.json");
    asset
        .write_str(&catalog_json(&[
            ("red", [250, 10, 10]),
            ("green", [10, 250, 10]),
            ("blue", [10, 10, 250]),
            ("dark red", [120, 5, 5]),
        ]))
        .unwrap();
    asset.assert(predicate::str::contains("\"kind\": \"color_histogram\""));

    let registry = ModelRegistry::new(dir.path(), "ImageSimilarity");
    let info = registry.load().unwrap();
    assert_eq!(info.reference_count, 4);

    let loaded = registry.current().unwrap();
    let model: Arc<dyn SimilarityModel> = Arc::clone(&loaded.model);
    let ranking = tokio_test::block_on(rank_image(model, solid([10, 250, 10]), 2)).unwrap();

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].index, 1);
    assert!(ranking[0].distance < 1e-6);
    assert_eq!(loaded.model.label(ranking[0].index), Some("green"));
    assert!(ranking.listing().starts_with("Results\n\nElement: "));
    assert!(ranking.listing().contains("Offset: 1\n"));
}

#[test]
fn test_invalid_asset_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("Broken.json")
        .write_str(
            r#"{
                "name": "Broken",
                "extractor": { "kind": "color_histogram", "bins": 4, "input_size": 8 },
                "references": [ { "embedding": [1.0, 2.0] } ]
            }"#,
        )
        .unwrap();

    let registry = ModelRegistry::new(dir.path(), "Broken");
    match registry.load() {
        Err(AppError::Validation(msg)) => assert!(msg.contains("expected 12")),
        other => panic!("unexpected result: {:?}", other.map(|i| i.version)),
    }
    assert!(registry.current_version().is_none());
}

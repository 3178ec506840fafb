use anyhow::{ensure, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array1;

use super::embeddings::Embedder;
use crate::models::catalog::DistanceMetric;

/// Crops the largest centred square out of an image.
pub fn center_crop(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    img.crop_imm(x, y, side, side)
}

/// Per-channel RGB histogram over a centre crop, L2-normalised.
#[derive(Debug, Clone)]
pub struct ColorHistogramEmbedder {
    bins: usize,
    input_size: u32,
}

impl ColorHistogramEmbedder {
    /// Creates an extractor with `bins` buckets per channel.
    pub fn new(bins: usize, input_size: u32) -> Result<Self> {
        ensure!(
            (1..=256).contains(&bins),
            "histogram bins must be in 1..=256, got {}",
            bins
        );
        ensure!(input_size > 0, "input_size must be positive");
        Ok(Self { bins, input_size })
    }
}

impl Embedder for ColorHistogramEmbedder {
    fn dimension(&self) -> usize {
        3 * self.bins
    }

    fn embed(&self, img: &DynamicImage) -> Result<Array1<f32>> {
        let (width, height) = img.dimensions();
        ensure!(width > 0 && height > 0, "image has no pixels");

        let img = center_crop(img).resize_exact(
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        );
        let rgb = img.to_rgb8();

        let mut histogram = Array1::<f32>::zeros(self.dimension());
        for pixel in rgb.pixels() {
            for (channel, &value) in pixel.0.iter().enumerate() {
                let bucket = value as usize * self.bins / 256;
                histogram[channel * self.bins + bucket] += 1.0;
            }
        }

        Ok(l2_normalize(histogram))
    }
}

/// Scales a vector to unit length; zero vectors are returned as-is.
pub fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

/// Cosine similarity between two embeddings, in `[-1, 1]`.
pub fn cosine_similarity(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    let dot_product = a.dot(b);
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Distance between two embeddings under `metric`. Never negative.
pub fn distance(metric: DistanceMetric, a: &Array1<f32>, b: &Array1<f32>) -> f64 {
    match metric {
        DistanceMetric::Euclidean => {
            let diff = a - b;
            f64::from(diff.dot(&diff)).sqrt()
        }
        DistanceMetric::Cosine => f64::from(1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0),
    }
}

use anyhow::Result;
use image::DynamicImage;
use ndarray::Array1;
use std::fmt;

#[cfg(feature = "torch")]
pub use self::resnet::ResNetEmbedder;

/// Turns an image into a fixed-length embedding.
pub trait Embedder: Send + Sync + fmt::Debug {
    /// Length of every embedding this extractor returns.
    fn dimension(&self) -> usize;

    /// Computes the embedding of one image.
    fn embed(&self, img: &DynamicImage) -> Result<Array1<f32>>;
}

#[cfg(feature = "torch")]
mod resnet {
    use anyhow::{Context, Result};
    use image::DynamicImage;
    use ndarray::Array1;
    use std::{fmt, path::Path, sync::Mutex};
    use tch::{
        nn::{self, FuncT, ModuleT},
        vision::resnet,
        Device, Kind, Tensor,
    };

    use super::Embedder;
    use crate::core::features::{center_crop, l2_normalize};

    /// ResNet-50 with the classifier removed, producing 2048-d embeddings.
    pub struct ResNetEmbedder {
        // Keeps the weights alive for `net`.
        _vs: nn::VarStore,
        // FuncT is Send but not Sync
        net: Mutex<FuncT<'static>>,
        device: Device,
    }

    impl fmt::Debug for ResNetEmbedder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ResNetEmbedder")
                .field("device", &self.device)
                .finish()
        }
    }

    impl ResNetEmbedder {
        /// Loads pre-trained weights from `weights`.
        pub fn load<P: AsRef<Path>>(weights: P) -> Result<Self> {
            let device = Device::cuda_if_available();
            let mut vs = nn::VarStore::new(device);
            let net = resnet::resnet50_no_final_layer(&vs.root());
            vs.load(weights.as_ref()).with_context(|| {
                format!("loading ResNet-50 weights from {}", weights.as_ref().display())
            })?;
            Ok(Self {
                _vs: vs,
                net: Mutex::new(net),
                device,
            })
        }

        fn preprocess_image(&self, img: &DynamicImage) -> Tensor {
            let img = center_crop(img).resize_exact(224, 224, image::imageops::FilterType::Triangle);
            let rgb_img = img.to_rgb8();
            let (width, height) = rgb_img.dimensions();

            // Planar CHW layout in [0, 1]
            let plane = (width * height) as usize;
            let mut data = vec![0f32; plane * 3];
            for (i, pixel) in rgb_img.pixels().enumerate() {
                for c in 0..3 {
                    data[c * plane + i] = pixel[c] as f32 / 255.0;
                }
            }

            let tensor = Tensor::of_slice(&data)
                .reshape(&[3, height as i64, width as i64])
                .to_kind(Kind::Float);

            let mean = Tensor::of_slice(&[0.485f32, 0.456, 0.406]).view([3, 1, 1]);
            let std = Tensor::of_slice(&[0.229f32, 0.224, 0.225]).view([3, 1, 1]);

            ((tensor - &mean) / &std).unsqueeze(0)
        }
    }

    impl Embedder for ResNetEmbedder {
        fn dimension(&self) -> usize {
            2048
        }

        fn embed(&self, img: &DynamicImage) -> Result<Array1<f32>> {
            let input = self.preprocess_image(img).to(self.device);
            let net = self
                .net
                .lock()
                .map_err(|_| anyhow::anyhow!("ResNet embedder lock poisoned"))?;
            let output = tch::no_grad(|| input.apply_t(&*net, false))
                .flatten(0, -1)
                .to_device(Device::Cpu);
            let embedding = Vec::<f32>::try_from(output)?;
            Ok(l2_normalize(Array1::from(embedding)))
        }
    }
}

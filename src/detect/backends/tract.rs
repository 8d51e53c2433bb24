#![cfg(feature = "backend-tract")]

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::LandmarkDetector;
use crate::detect::result::{FaceLandmarks, Landmark};

/// Face mesh input side length (square RGB input).
pub const FACE_MESH_INPUT: u32 = 192;

/// Tract-based face mesh backend.
///
/// Loads a local face-mesh ONNX model with a `1x3xNxN` float input and two outputs:
/// flattened `(x, y, z)` landmarks in input pixel space, and a face-presence logit.
/// Frames are nearest-neighbour resampled to the model input. The model does not
/// produce a pose matrix, so sessions on this backend only track eye closure and
/// absence.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    presence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = FACE_MESH_INPUT as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size: FACE_MESH_INPUT,
            presence_threshold: 0.5,
        })
    }

    /// Override the default face-presence threshold (probability, 0..1).
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.presence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width == 0 || height == 0 {
            return Err(anyhow!("empty frame {}x{}", width, height));
        }
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let side = self.input_size as usize;
        let (src_w, src_h) = (width as usize, height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let sx = x * src_w / side;
            let sy = y * src_h / side;
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>) -> Result<Option<FaceLandmarks>> {
        let coords = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no landmark output"))?
            .to_array_view::<f32>()
            .context("landmark tensor was not f32")?;
        let presence = outputs
            .get(1)
            .ok_or_else(|| anyhow!("model produced no presence output"))?
            .to_array_view::<f32>()
            .context("presence tensor was not f32")?
            .iter()
            .next()
            .copied()
            .unwrap_or(f32::NEG_INFINITY);

        let probability = 1.0 / (1.0 + (-presence).exp());
        if !(probability >= self.presence_threshold) {
            return Ok(None);
        }

        let side = self.input_size as f64;
        let values: Vec<f32> = coords.iter().copied().collect();
        if values.len() % 3 != 0 {
            return Err(anyhow!("landmark tensor length {} is not a multiple of 3", values.len()));
        }
        let landmarks = values
            .chunks_exact(3)
            .map(|p| Landmark::new(p[0] as f64 / side, p[1] as f64 / side, p[2] as f64 / side))
            .collect();

        Ok(Some(FaceLandmarks {
            landmarks,
            pose: None,
        }))
    }
}

impl LandmarkDetector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        _timestamp: Duration,
    ) -> Result<Option<FaceLandmarks>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs)
    }
}

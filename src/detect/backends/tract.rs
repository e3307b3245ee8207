#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{InferenceBackend, Observation};
use crate::frame::ImageFrame;
use crate::geometry::Rect;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Default model input edge for the packaged spoof device models.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Tract-based backend for ONNX object-detection models.
///
/// Model contract: one `[1, 3, H, W]` f32 RGB input scaled to 0..1, and two
/// outputs, `confidence` (`[N, C]`) and `coordinates` (`[N, 4]`, centre x/y
/// plus width/height normalized to the model input, top-left origin). A
/// leading batch axis of 1 on either output is accepted. When the outputs are
/// not named, the first is taken as `confidence`.
///
/// Images are letterboxed into the input ("scale fit": aspect preserved, no
/// cropping, centred padding) and the letterbox is undone on the way out.
pub struct TractBackend {
    model: Plan,
    width: u32,
    height: u32,
    confidence_output: usize,
    coordinates_output: usize,
}

impl TractBackend {
    /// Compile an ONNX model package into an optimized runnable plan.
    pub fn compile<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if width == 0 || height == 0 {
            return Err(anyhow!("model input size must be non-zero"));
        }
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?;

        let (confidence_output, coordinates_output) = resolve_outputs(&model)?;

        let model = model
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_output,
            coordinates_output,
        })
    }

    fn build_input(&self, image: &RgbImage) -> Result<(Tensor, Letterbox)> {
        let letterbox = Letterbox::fit(image.width(), image.height(), self.width, self.height);
        let resized = imageops::resize(
            image,
            letterbox.content_width,
            letterbox.content_height,
            FilterType::Triangle,
        );
        let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
        let content_w = letterbox.content_width as usize;
        let content_h = letterbox.content_height as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, channel, y, x)| {
                if x < pad_x || y < pad_y || x >= pad_x + content_w || y >= pad_y + content_h {
                    return 0.0;
                }
                let px = resized.get_pixel((x - pad_x) as u32, (y - pad_y) as u32);
                px.0[channel] as f32 / 255.0
            },
        );
        Ok((input.into_tensor(), letterbox))
    }

    fn decode(
        &self,
        outputs: TVec<TValue>,
        letterbox: &Letterbox,
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<Observation>> {
        let confidence = outputs
            .get(self.confidence_output)
            .ok_or_else(|| anyhow!("model produced no confidence output"))?
            .to_array_view::<f32>()
            .context("confidence output tensor was not f32")?;
        let coordinates = outputs
            .get(self.coordinates_output)
            .ok_or_else(|| anyhow!("model produced no coordinates output"))?
            .to_array_view::<f32>()
            .context("coordinates output tensor was not f32")?;

        let confidence = as_matrix(confidence).context("unexpected confidence shape")?;
        let coordinates = as_matrix(coordinates).context("unexpected coordinates shape")?;
        if coordinates.ncols() != 4 {
            return Err(anyhow!(
                "coordinates output has {} columns, expected 4",
                coordinates.ncols()
            ));
        }
        if confidence.nrows() != coordinates.nrows() {
            return Err(anyhow!(
                "confidence rows ({}) do not match coordinate rows ({})",
                confidence.nrows(),
                coordinates.nrows()
            ));
        }

        let mut observations = Vec::with_capacity(coordinates.nrows());
        for (scores, coords) in confidence.outer_iter().zip(coordinates.outer_iter()) {
            let score = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            if !score.is_finite() {
                continue;
            }
            let row = [coords[0], coords[1], coords[2], coords[3]];
            let normalized = observation_box(
                row,
                letterbox,
                (self.width, self.height),
                (image_width, image_height),
            );
            observations.push(Observation::new(normalized, score));
        }
        Ok(observations)
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &ImageFrame) -> Result<Vec<Observation>> {
        let upright = frame.upright();
        let (input, letterbox) = self.build_input(&upright)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, &letterbox, upright.width(), upright.height())
    }
}

/// Convert one `coordinates` row (centre x/y, width, height normalized to the
/// model input, top-left origin) into a box normalized to the image with a
/// bottom-left origin.
fn observation_box(
    coords: [f32; 4],
    letterbox: &Letterbox,
    input: (u32, u32),
    image: (u32, u32),
) -> Rect {
    let [cx, cy, w, h] = coords.map(f64::from);
    let (input_w, input_h) = (input.0 as f64, input.1 as f64);
    let top_left = letterbox.map_to_image(
        (cx - w / 2.0) * input_w,
        (cy - h / 2.0) * input_h,
        w * input_w,
        h * input_h,
    );
    let (image_w, image_h) = (image.0 as f64, image.1 as f64);
    Rect::new(
        top_left.x / image_w,
        1.0 - top_left.max_y() / image_h,
        top_left.width / image_w,
        top_left.height / image_h,
    )
}

fn resolve_outputs(model: &TypedModel) -> Result<(usize, usize)> {
    let outlets = model.output_outlets().context("model has no outputs")?;
    if outlets.len() < 2 {
        return Err(anyhow!(
            "model has {} outputs, expected confidence and coordinates",
            outlets.len()
        ));
    }
    let label = |i: usize| -> String {
        let outlet = outlets[i];
        model
            .outlet_label(outlet)
            .map(|l| l.to_string())
            .unwrap_or_else(|| model.node(outlet.node).name.clone())
    };
    let confidence = (0..outlets.len()).find(|&i| label(i) == "confidence");
    let coordinates = (0..outlets.len()).find(|&i| label(i) == "coordinates");
    match (confidence, coordinates) {
        (Some(conf), Some(coords)) => Ok((conf, coords)),
        _ => Ok((0, 1)),
    }
}

fn as_matrix(
    view: tract_ndarray::ArrayViewD<'_, f32>,
) -> Result<tract_ndarray::ArrayView2<'_, f32>> {
    let view = match view.ndim() {
        3 if view.shape()[0] == 1 => view.index_axis_move(tract_ndarray::Axis(0), 0),
        _ => view,
    };
    view.into_dimensionality::<tract_ndarray::Ix2>()
        .map_err(|e| anyhow!("{}", e))
}

/// Placement of an image inside the model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    content_width: u32,
    content_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(image_width: u32, image_height: u32, input_width: u32, input_height: u32) -> Self {
        let scale = (input_width as f64 / image_width as f64)
            .min(input_height as f64 / image_height as f64);
        let content_width = ((image_width as f64 * scale).round() as u32).clamp(1, input_width);
        let content_height = ((image_height as f64 * scale).round() as u32).clamp(1, input_height);
        Self {
            scale,
            content_width,
            content_height,
            pad_x: (input_width - content_width) / 2,
            pad_y: (input_height - content_height) / 2,
        }
    }

    /// Map a top-left-origin rectangle in model input pixels to image pixels.
    fn map_to_image(&self, x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect::new(
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
            width / self.scale,
            height / self.scale,
        )
    }
}

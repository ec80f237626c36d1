//! Image transform operations and their interpreter.
//!
//! A [`Normaliser`](crate::Normaliser) is an ordered list of [`TransformOp`]s.
//! Each op is applied to a `[N, C, H, W]` `f32` tensor. Random parameters
//! (crop offsets, rotation angle, the branch of a random choice) are drawn
//! once per application and shared by every image in the batch, so a stack
//! of sampled frames stays spatially aligned after augmentation.

use std::f32::consts::PI;

use ndarray::{Array4, Axis, s};
use rand::Rng;

use crate::{
    error::{Result, SampleError},
    normalise::Normaliser,
};

/// ITU-R 601-2 luma weights for R, G and B.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// One step in a normalisation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    /// Scale raw 8-bit values to `[0, 1]`.
    ToFloat,
    /// Collapse three colour channels to one luma channel.
    Grayscale,
    /// Bilinear resize to exactly `height` × `width`.
    Resize {
        /// Output height.
        height: usize,
        /// Output width.
        width: usize,
    },
    /// Zero rows added above and below the image.
    Pad {
        /// Rows added above.
        top: usize,
        /// Rows added below.
        bottom: usize,
    },
    /// Crop the centre `height` × `width` region, zero-padding images
    /// smaller than the crop.
    CentreCrop {
        /// Crop height.
        height: usize,
        /// Crop width.
        width: usize,
    },
    /// Crop a `height` × `width` region at a random offset.
    ///
    /// Images smaller than the crop are zero-padded evenly first instead of
    /// being rejected, so the output is always `height` × `width`.
    RandomCrop {
        /// Crop height.
        height: usize,
        /// Crop width.
        width: usize,
    },
    /// Mirror left to right.
    FlipHorizontal,
    /// Mirror top to bottom.
    FlipVertical,
    /// Rotate about the centre by an angle drawn from `[-degrees, degrees]`.
    RandomRotation {
        /// Maximum absolute angle.
        degrees: f32,
    },
    /// Add Gaussian noise and clamp to `[0, 1]`.
    GaussianNoise {
        /// Noise mean.
        mean: f32,
        /// Noise standard deviation.
        sigma: f32,
    },
    /// Apply one of the given normalisers, chosen uniformly on every
    /// application.
    RandomChoice(Vec<Normaliser>),
}

impl TransformOp {
    /// Apply this op to a `[N, C, H, W]` tensor.
    pub fn apply<R: Rng + ?Sized>(&self, tensor: Array4<f32>, rng: &mut R) -> Result<Array4<f32>> {
        match self {
            TransformOp::ToFloat => Ok(tensor.mapv_into(|value| value / 255.0)),
            TransformOp::Grayscale => grayscale(tensor),
            TransformOp::Resize { height, width } => Ok(resize_bilinear(&tensor, *height, *width)),
            TransformOp::Pad { top, bottom } => Ok(pad(&tensor, *top, *bottom, 0, 0)),
            TransformOp::CentreCrop { height, width } => {
                let tensor = pad_to_fit(tensor, *height, *width);
                let (_, _, h, w) = tensor.dim();
                let top = ((h - height) as f64 / 2.0).round() as usize;
                let left = ((w - width) as f64 / 2.0).round() as usize;
                Ok(crop(&tensor, top, left, *height, *width))
            }
            TransformOp::RandomCrop { height, width } => {
                let tensor = pad_to_fit(tensor, *height, *width);
                let (_, _, h, w) = tensor.dim();
                let top = rng.gen_range(0..=h - height);
                let left = rng.gen_range(0..=w - width);
                Ok(crop(&tensor, top, left, *height, *width))
            }
            TransformOp::FlipHorizontal => Ok(tensor.slice(s![.., .., .., ..;-1]).to_owned()),
            TransformOp::FlipVertical => Ok(tensor.slice(s![.., .., ..;-1, ..]).to_owned()),
            TransformOp::RandomRotation { degrees } => {
                let degrees = degrees.abs();
                let angle = if degrees > 0.0 {
                    rng.gen_range(-degrees..=degrees)
                } else {
                    0.0
                };
                Ok(rotate(&tensor, angle))
            }
            TransformOp::GaussianNoise { mean, sigma } => {
                let mut tensor = tensor;
                tensor.mapv_inplace(|value| {
                    (value + mean + sigma * standard_normal(&mut *rng)).clamp(0.0, 1.0)
                });
                Ok(tensor)
            }
            TransformOp::RandomChoice(choices) => {
                if choices.is_empty() {
                    return Err(SampleError::Range(
                        "random choice over an empty set of normalisers".to_string(),
                    ));
                }
                let index = rng.gen_range(0..choices.len());
                choices[index].apply_tensor_with_rng(tensor, rng)
            }
        }
    }
}

fn grayscale(tensor: Array4<f32>) -> Result<Array4<f32>> {
    let (n, c, h, w) = tensor.dim();
    match c {
        1 => Ok(tensor),
        3 => {
            let mut luma = Array4::<f32>::zeros((n, 1, h, w));
            for (channel, weight) in LUMA_WEIGHTS.iter().enumerate() {
                let plane = tensor.slice(s![.., channel..channel + 1, .., ..]);
                luma.scaled_add(*weight, &plane);
            }
            Ok(luma)
        }
        other => Err(SampleError::Format(format!(
            "Invalid image format: cannot convert {other} channels to grayscale"
        ))),
    }
}

/// Bilinear resize with half-pixel centres.
fn resize_bilinear(tensor: &Array4<f32>, out_h: usize, out_w: usize) -> Array4<f32> {
    let (n, c, h, w) = tensor.dim();
    if h == out_h && w == out_w {
        return tensor.clone();
    }
    let mut result = Array4::<f32>::zeros((n, c, out_h, out_w));
    if h == 0 || w == 0 {
        return result;
    }

    let rows: Vec<(usize, usize, f32)> = (0..out_h).map(|y| source_taps(y, h, out_h)).collect();
    let cols: Vec<(usize, usize, f32)> = (0..out_w).map(|x| source_taps(x, w, out_w)).collect();

    for ((b, ch, y, x), value) in result.indexed_iter_mut() {
        let (y0, y1, fy) = rows[y];
        let (x0, x1, fx) = cols[x];
        let top = tensor[[b, ch, y0, x0]] * (1.0 - fx) + tensor[[b, ch, y0, x1]] * fx;
        let bottom = tensor[[b, ch, y1, x0]] * (1.0 - fx) + tensor[[b, ch, y1, x1]] * fx;
        *value = top * (1.0 - fy) + bottom * fy;
    }
    result
}

fn source_taps(dst: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = src_len as f32 / dst_len as f32;
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let lower = (src.floor() as usize).min(src_len - 1);
    let upper = (lower + 1).min(src_len - 1);
    (lower, upper, src - lower as f32)
}

fn pad(tensor: &Array4<f32>, top: usize, bottom: usize, left: usize, right: usize) -> Array4<f32> {
    let (n, c, h, w) = tensor.dim();
    let mut padded = Array4::<f32>::zeros((n, c, h + top + bottom, w + left + right));
    padded
        .slice_mut(s![.., .., top..top + h, left..left + w])
        .assign(tensor);
    padded
}

/// Zero-pad evenly so the image is at least `height` × `width`.
fn pad_to_fit(tensor: Array4<f32>, height: usize, width: usize) -> Array4<f32> {
    let (_, _, h, w) = tensor.dim();
    if h >= height && w >= width {
        return tensor;
    }
    let extra_h = height.saturating_sub(h);
    let extra_w = width.saturating_sub(w);
    pad(
        &tensor,
        extra_h / 2,
        extra_h - extra_h / 2,
        extra_w / 2,
        extra_w - extra_w / 2,
    )
}

fn crop(tensor: &Array4<f32>, top: usize, left: usize, height: usize, width: usize) -> Array4<f32> {
    tensor
        .slice(s![.., .., top..top + height, left..left + width])
        .to_owned()
}

/// Rotate counter-clockwise by `degrees` about the image centre, sampling
/// the nearest source pixel and filling uncovered areas with zero.
pub(crate) fn rotate(tensor: &Array4<f32>, degrees: f32) -> Array4<f32> {
    if degrees == 0.0 {
        return tensor.clone();
    }
    let (n, c, h, w) = tensor.dim();
    let (sin, cos) = (degrees * PI / 180.0).sin_cos();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);

    let mut result = Array4::<f32>::zeros((n, c, h, w));
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let sx = (cos * dx - sin * dy + cx).floor();
            let sy = (sin * dx + cos * dy + cy).floor();
            if sx < 0.0 || sy < 0.0 || sx >= w as f32 || sy >= h as f32 {
                continue;
            }
            let source = tensor.slice(s![.., .., sy as usize, sx as usize]);
            result.slice_mut(s![.., .., y, x]).assign(&source);
        }
    }
    result
}

/// Box-Muller draw from the standard normal distribution.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = 1.0 - rng.r#gen::<f32>();
    let u2: f32 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

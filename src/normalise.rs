//! Normalisation and augmentation pipelines.
//!
//! Every pipeline turns a raw frame of a known [`Shape`] into a single-channel
//! `f32` image of the configured target resolution. The builders here only
//! *describe* pipelines as lists of [`TransformOp`]s; nothing touches pixel
//! data until a [`Normaliser`] is applied.
//!
//! [`default_normalisers`] assembles the standard set of thirteen pipelines
//! used to generate training data: a plain letterboxed resize, crops, flips,
//! rotation, and random combinations of those with extra flips or noise.
//!
//! # Example
//!
//! ```
//! use framesample::{NormaliserOptions, Shape, default_normalisers};
//! use ndarray::Array3;
//!
//! let shape = Shape::new(3, 480, 640);
//! let normalisers = default_normalisers(shape, &NormaliserOptions::new())?;
//! assert_eq!(normalisers.len(), 13);
//!
//! let frame = Array3::<u8>::zeros((3, 480, 640));
//! let image = normalisers[0].apply(frame.view())?;
//! assert_eq!(image.dim(), (1, 288, 352));
//! # Ok::<(), framesample::SampleError>(())
//! ```

use std::{fmt, sync::Arc};

use ndarray::{Array3, Array4, ArrayBase, ArrayView3, ArrayView4, Axis, Ix3, RawData};
use rand::Rng;

use crate::{
    configuration::NormaliserOptions,
    error::{Result, SampleError},
    stream::Frame,
    transform::TransformOp,
};

/// Frame geometry: `(channels, height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Colour channels; pipelines accept 1 or 3.
    pub channels: usize,
    /// Vertical resolution.
    pub height: usize,
    /// Horizontal resolution.
    pub width: usize,
}

impl Shape {
    /// Create a shape from its three dimensions.
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Shape of a `[C, H, W]` array.
    pub fn of<S: RawData>(data: &ArrayBase<S, Ix3>) -> Self {
        let (channels, height, width) = data.dim();
        Self::new(channels, height, width)
    }
}

impl From<&Frame> for Shape {
    fn from(frame: &Frame) -> Self {
        Self::of(&frame.data)
    }
}

impl From<[usize; 3]> for Shape {
    fn from([channels, height, width]: [usize; 3]) -> Self {
        Self::new(channels, height, width)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// An immutable, composed sequence of transform operations.
///
/// Cloning is cheap: the operation list is shared. A normaliser holds no
/// mutable state, so one instance can be applied from many threads as long
/// as each brings its own RNG.
#[derive(Debug, Clone, PartialEq)]
pub struct Normaliser {
    ops: Arc<[TransformOp]>,
}

impl Normaliser {
    /// Wrap an op list, applied in order.
    pub fn new(ops: Vec<TransformOp>) -> Self {
        Self { ops: ops.into() }
    }

    /// The operations applied, in order.
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// Normalise one `[C, H, W]` frame using the thread-local RNG.
    pub fn apply(&self, frame: ArrayView3<'_, u8>) -> Result<Array3<f32>> {
        self.apply_with_rng(frame, &mut rand::thread_rng())
    }

    /// Normalise one `[C, H, W]` frame.
    pub fn apply_with_rng<R: Rng + ?Sized>(
        &self,
        frame: ArrayView3<'_, u8>,
        rng: &mut R,
    ) -> Result<Array3<f32>> {
        let batch = self.apply_batch_with_rng(frame.insert_axis(Axis(0)), rng)?;
        Ok(batch.index_axis_move(Axis(0), 0))
    }

    /// Normalise a `[N, C, H, W]` stack, such as the output of
    /// [`load_frames`](crate::load_frames), using the thread-local RNG.
    pub fn apply_batch(&self, frames: ArrayView4<'_, u8>) -> Result<Array4<f32>> {
        self.apply_batch_with_rng(frames, &mut rand::thread_rng())
    }

    /// Normalise a `[N, C, H, W]` stack. Random parameters are drawn once
    /// and shared across the batch.
    pub fn apply_batch_with_rng<R: Rng + ?Sized>(
        &self,
        frames: ArrayView4<'_, u8>,
        rng: &mut R,
    ) -> Result<Array4<f32>> {
        self.apply_tensor_with_rng(frames.mapv(f32::from), rng)
    }

    /// Run every op over an already-converted `f32` tensor.
    pub fn apply_tensor_with_rng<R: Rng + ?Sized>(
        &self,
        tensor: Array4<f32>,
        rng: &mut R,
    ) -> Result<Array4<f32>> {
        self.ops
            .iter()
            .try_fold(tensor, |tensor, op| op.apply(tensor, &mut *rng))
    }
}

/// Append the dtype conversion and, for colour input, grayscale conversion.
///
/// # Errors
///
/// Returns [`SampleError::Format`] unless the shape has 1 or 3 channels.
pub fn add_channel_norm(ops: &mut Vec<TransformOp>, shape: Shape) -> Result<()> {
    ops.push(TransformOp::ToFloat);
    match shape.channels {
        3 => ops.push(TransformOp::Grayscale),
        1 => {}
        other => {
            log::warn!("Unexpected number of channels: {other}");
            return Err(SampleError::Format(format!(
                "Invalid image format: {other} channels"
            )));
        }
    }
    Ok(())
}

/// Append a width-matching resize and letterboxing to reach
/// `to_width` × `to_height`.
///
/// The resize keeps the aspect ratio, rounding the scaled height to the
/// nearest pixel. Letterbox rows are split with the smaller half on top.
///
/// # Errors
///
/// Returns [`SampleError::Format`] if the scaled image is taller than
/// `to_height`, or if the shape has no width.
pub fn add_resize_norm(
    ops: &mut Vec<TransformOp>,
    shape: Shape,
    to_width: usize,
    to_height: usize,
) -> Result<()> {
    if shape.width == 0 {
        return Err(SampleError::Format(format!("Invalid image format: {shape}")));
    }

    let mut height = shape.height;
    if shape.width != to_width {
        let scale = to_width as f64 / shape.width as f64;
        height = (shape.height as f64 * scale).round() as usize;
        log::trace!("Scaling {shape} by {:.1}% (height {height})", scale * 100.0);
        ops.push(TransformOp::Resize {
            height,
            width: to_width,
        });
    }

    if height > to_height {
        log::warn!("Image too tall! {height} > {to_height}");
        return Err(SampleError::Format(format!(
            "Invalid image format: image too tall ({height} > {to_height})"
        )));
    }
    if height < to_height {
        let letterbox = to_height - height;
        let top = letterbox / 2;
        ops.push(TransformOp::Pad {
            top,
            bottom: letterbox - top,
        });
    }
    Ok(())
}

/// Resize halfway from `shape` towards `to_width` × `to_height`.
///
/// Used ahead of a random crop so the crop keeps some surrounding context
/// instead of seeing the fully zoomed frame.
pub fn add_half_zoom_norm(
    ops: &mut Vec<TransformOp>,
    shape: Shape,
    to_width: usize,
    to_height: usize,
) -> Result<()> {
    let half_width = (shape.width + to_width) / 2;
    let half_height = (shape.height + to_height) / 2;
    add_resize_norm(ops, shape, half_width, half_height)
}

/// Grayscale, resize to the target width and letterbox to the target height.
pub fn letterbox_ops(shape: Shape, options: &NormaliserOptions) -> Result<Vec<TransformOp>> {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, shape)?;
    add_resize_norm(&mut ops, shape, options.target_width, options.target_height)?;
    Ok(ops)
}

/// Grayscale and take the centre target-sized region.
pub fn centre_crop_ops(shape: Shape, options: &NormaliserOptions) -> Result<Vec<TransformOp>> {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, shape)?;
    ops.push(TransformOp::CentreCrop {
        height: options.target_height,
        width: options.target_width,
    });
    Ok(ops)
}

/// Grayscale and take a random target-sized region.
pub fn random_crop_ops(shape: Shape, options: &NormaliserOptions) -> Result<Vec<TransformOp>> {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, shape)?;
    ops.push(random_crop(options));
    Ok(ops)
}

/// Grayscale, half zoom, then a random target-sized region.
pub fn half_zoom_random_crop_ops(
    shape: Shape,
    options: &NormaliserOptions,
) -> Result<Vec<TransformOp>> {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, shape)?;
    add_half_zoom_norm(&mut ops, shape, options.target_width, options.target_height)?;
    ops.push(random_crop(options));
    Ok(ops)
}

/// Grayscale, half zoom, random rotation, then a random target-sized region.
pub fn rotated_ops(shape: Shape, options: &NormaliserOptions) -> Result<Vec<TransformOp>> {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, shape)?;
    add_half_zoom_norm(&mut ops, shape, options.target_width, options.target_height)?;
    ops.push(TransformOp::RandomRotation {
        degrees: options.max_rotation_degrees,
    });
    ops.push(random_crop(options));
    Ok(ops)
}

fn random_crop(options: &NormaliserOptions) -> TransformOp {
    TransformOp::RandomCrop {
        height: options.target_height,
        width: options.target_width,
    }
}

/// Append a horizontal flip to a recipe.
pub fn hflipped(mut ops: Vec<TransformOp>) -> Vec<TransformOp> {
    ops.push(TransformOp::FlipHorizontal);
    ops
}

/// One of `normalisers` at random, then a vertical flip.
pub fn vflipped_choice(normalisers: &[Normaliser]) -> Vec<TransformOp> {
    vec![
        TransformOp::RandomChoice(normalisers.to_vec()),
        TransformOp::FlipVertical,
    ]
}

/// One of `normalisers` at random, then horizontal and vertical flips.
pub fn vhflipped_choice(normalisers: &[Normaliser]) -> Vec<TransformOp> {
    vec![
        TransformOp::RandomChoice(normalisers.to_vec()),
        TransformOp::FlipHorizontal,
        TransformOp::FlipVertical,
    ]
}

/// One of `normalisers` at random, then Gaussian noise.
pub fn noisy_choice(normalisers: &[Normaliser], options: &NormaliserOptions) -> Vec<TransformOp> {
    vec![
        TransformOp::RandomChoice(normalisers.to_vec()),
        TransformOp::GaussianNoise {
            mean: options.noise_mean,
            sigma: options.noise_sigma,
        },
    ]
}

/// Build the standard set of thirteen normalisers for frames of `shape`.
///
/// | Index | Pipeline |
/// |-------|----------|
/// | 0 | letterbox |
/// | 1 | centre crop |
/// | 2 | random crop |
/// | 3 | half zoom + random crop |
/// | 4–7 | 0–3, horizontally flipped |
/// | 8 | half zoom + rotation + random crop |
/// | 9 | random of 0–2, vertically flipped |
/// | 10 | random of 0–2, flipped both ways |
/// | 11 | random of 0–2, with noise |
/// | 12 | random of 4–11, with noise |
///
/// Entries 9–12 choose among earlier entries each time they are applied.
///
/// # Errors
///
/// Returns [`SampleError::Format`] if any recipe rejects the shape; no
/// partial set is returned.
pub fn default_normalisers(shape: Shape, options: &NormaliserOptions) -> Result<Vec<Normaliser>> {
    log::debug!(
        "Building normalisers for {shape} -> {}x{}",
        options.target_width,
        options.target_height,
    );

    let base: [fn(Shape, &NormaliserOptions) -> Result<Vec<TransformOp>>; 4] = [
        letterbox_ops,
        centre_crop_ops,
        random_crop_ops,
        half_zoom_random_crop_ops,
    ];

    let mut normalisers = Vec::with_capacity(13);
    for recipe in base {
        normalisers.push(Normaliser::new(recipe(shape, options)?));
    }
    for recipe in base {
        normalisers.push(Normaliser::new(hflipped(recipe(shape, options)?)));
    }
    normalisers.push(Normaliser::new(rotated_ops(shape, options)?));

    normalisers.push(Normaliser::new(vflipped_choice(&normalisers[0..3])));
    normalisers.push(Normaliser::new(vhflipped_choice(&normalisers[0..3])));
    normalisers.push(Normaliser::new(noisy_choice(&normalisers[0..3], options)));
    normalisers.push(Normaliser::new(noisy_choice(&normalisers[4..], options)));

    Ok(normalisers)
}

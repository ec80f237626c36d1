//! Conversions between `image` buffers and frame tensors.
//!
//! Decoders and image files hand out interleaved `HWC` pixel buffers, while
//! the sampler and normalisers work on planar `[C, H, W]` arrays. These
//! helpers convert in both directions.

use image::{DynamicImage, GrayImage};
use ndarray::{Array3, ArrayView3};

use crate::{
    error::{Result, SampleError},
    stream::Frame,
};

/// Convert an interleaved `HWC` buffer to a planar `[C, H, W]` array.
///
/// # Errors
///
/// Returns [`SampleError::Shape`] if `buffer` does not hold exactly
/// `height * width * channels` bytes.
pub fn interleaved_to_planar(
    buffer: Vec<u8>,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Array3<u8>> {
    let interleaved = Array3::from_shape_vec((height, width, channels), buffer)?;
    Ok(interleaved
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned())
}

/// Convert an image to a `[C, H, W]` array.
///
/// Grayscale images (with or without alpha) become one channel; everything
/// else is converted to 8-bit RGB.
pub fn image_to_array(image: &DynamicImage) -> Result<Array3<u8>> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    if image.color().has_color() {
        interleaved_to_planar(image.to_rgb8().into_raw(), height, width, 3)
    } else {
        interleaved_to_planar(image.to_luma8().into_raw(), height, width, 1)
    }
}

/// Build a [`Frame`] from an image and its presentation timestamp.
pub fn image_to_frame(pts: f64, image: &DynamicImage) -> Result<Frame> {
    Ok(Frame::new(pts, image_to_array(image)?))
}

/// Convert a normalised single-channel `[1, H, W]` image back to 8 bits.
///
/// Values are clamped to `[0, 1]` before scaling, so the output of any
/// default normaliser can be saved for inspection.
///
/// # Errors
///
/// Returns [`SampleError::Shape`] if the input has more than one channel.
pub fn normalised_to_gray_image(image: ArrayView3<'_, f32>) -> Result<GrayImage> {
    let (channels, height, width) = image.dim();
    if channels != 1 {
        return Err(SampleError::Shape(format!(
            "expected a single-channel image, got {channels} channels"
        )));
    }

    let pixels: Vec<u8> = image
        .iter()
        .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        SampleError::Shape("failed to construct grayscale image from tensor".to_string())
    })
}

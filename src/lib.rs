//! # framesample
//!
//! Frame-accurate training sample extraction from video streams, plus the
//! normalisation and augmentation pipelines applied to those samples before
//! they reach a model.
//!
//! The crate has two independent halves:
//!
//! - **Sampling**: [`load_frames`] seeks a [`VideoStream`] near a transition
//!   timestamp, scans forward to the exact frame and reads a fixed sequence
//!   of frames, optionally averaging runs of consecutive frames, into a
//!   `[groups, channels, height, width]` tensor.
//! - **Normalisation**: [`default_normalisers`] builds, once per frame
//!   shape, a library of thirteen [`Normaliser`]s (letterbox, crops, flips,
//!   rotation, noise and random combinations of them) that each produce a
//!   single-channel image of the configured target resolution.
//!
//! ## Quick Start
//!
//! ```
//! use framesample::{
//!     MemoryStream, NormaliserOptions, SampleRequest, Shape, default_normalisers,
//!     load_frames, timestamp::timestamp_to_seconds,
//! };
//! use ndarray::Array3;
//!
//! let fps = 25.0;
//! let frames = (0..100u8).map(|value| Array3::from_elem((3, 240, 320), value));
//! let mut stream = MemoryStream::with_frame_rate(frames, fps);
//!
//! let transition = timestamp_to_seconds("0:0:2:0", fps)?;
//! let request = SampleRequest::new(transition, fps).with_frames_to_merge(vec![1, 2, 1]);
//! let sample = load_frames(&mut stream, &request)?;
//!
//! let shape = Shape::new(3, 240, 320);
//! let normalisers = default_normalisers(shape, &NormaliserOptions::new())?;
//! let normalised = normalisers[3].apply_batch(sample.view())?;
//! assert_eq!(normalised.shape(), &[3, 1, 288, 352]);
//! # Ok::<(), framesample::SampleError>(())
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | [`FfmpegVideoStream`], a `VideoStream` decoding media files via FFmpeg |
//!
//! Diagnostics are emitted through the [`log`](https://crates.io/crates/log)
//! facade; install any logger to see them.

pub mod configuration;
pub mod conversion;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod normalise;
pub mod sampler;
pub mod stream;
pub mod timestamp;
pub mod transform;
#[cfg(feature = "ffmpeg")]
mod utilities;

pub use configuration::NormaliserOptions;
pub use conversion::{image_to_array, image_to_frame, normalised_to_gray_image};
pub use error::{Result, SampleError};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{
    FfmpegLogLevel, FfmpegVideoStream, StreamOptions, StreamPixelFormat, get_ffmpeg_log_level,
    set_ffmpeg_log_level,
};
pub use normalise::{
    Normaliser, Shape, add_channel_norm, add_half_zoom_norm, add_resize_norm, centre_crop_ops,
    default_normalisers, half_zoom_random_crop_ops, hflipped, letterbox_ops, noisy_choice,
    random_crop_ops, rotated_ops, vflipped_choice, vhflipped_choice,
};
pub use sampler::{SampleRequest, average_frames, load_frames, load_frames_at};
pub use stream::{Frame, MemoryStream, VideoStream};
pub use timestamp::{
    random_frame_time, random_frame_time_with_rng, seconds_to_timestamp, timestamp_to_seconds,
};
pub use transform::TransformOp;

//! Error types for the `framesample` crate.
//!
//! This module defines [`SampleError`], the unified error type returned by all
//! fallible operations in the crate, and the [`Result`] alias used throughout.
//! None of these conditions are retried internally; callers decide whether to
//! pick another timestamp and try again.

#[cfg(feature = "ffmpeg")]
use std::path::PathBuf;

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use ndarray::ShapeError;
use thiserror::Error;

/// Shorthand for `Result<T, SampleError>`.
pub type Result<T> = std::result::Result<T, SampleError>;

/// The unified error type for all `framesample` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SampleError {
    /// Malformed timecode, unsupported channel count, or an image that is
    /// still taller than the target after resizing.
    #[error("Format error: {0}")]
    Format(String),

    /// The video stream ran out of frames while one was still required.
    #[error("Video stream exhausted: no more frames")]
    StreamExhausted,

    /// A random selection was requested over an empty range.
    #[error("Range error: {0}")]
    Range(String),

    /// The sample request itself cannot be satisfied.
    #[error("Invalid sample request: {0}")]
    InvalidSampleRequest(String),

    /// Two frames read for the same sample have different geometry.
    #[error("Inconsistent frame shape: expected {expected:?}, got {actual:?}")]
    InconsistentFrameShape {
        /// Shape of the first frame of the sample, `[C, H, W]`.
        expected: Vec<usize>,
        /// Shape of the offending frame.
        actual: Vec<usize>,
    },

    /// A tensor could not be built or reshaped.
    #[error("Shape error: {0}")]
    Shape(String),

    /// An error from the `image` crate during conversion.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The media file could not be opened.
    #[cfg(feature = "ffmpeg")]
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::FfmpegVideoStream::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[cfg(feature = "ffmpeg")]
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[cfg(feature = "ffmpeg")]
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl From<ShapeError> for SampleError {
    fn from(error: ShapeError) -> Self {
        SampleError::Shape(error.to_string())
    }
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for SampleError {
    fn from(error: FfmpegError) -> Self {
        SampleError::FfmpegError(error.to_string())
    }
}

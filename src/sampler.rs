//! Frame-accurate sampling around a transition timestamp.
//!
//! [`load_frames`] seeks near a requested time, scans forward to the exact
//! frame, and reads a fixed sequence of frames into a
//! `[groups, channels, height, width]` tensor, averaging runs of consecutive
//! frames where a [`SampleRequest`] asks for it.
//!
//! The frame found by the forward scan (the *anchor*) is always discarded.
//! Seeking is only accurate to a keyframe and decoded timestamps carry
//! floating point jitter, so the scan starts one frame early and the first
//! retained frame is the one after the anchor.
//!
//! # Example
//!
//! ```
//! use framesample::{MemoryStream, SampleRequest, load_frames};
//! use ndarray::Array3;
//!
//! let frames = (0..50u8).map(|value| Array3::from_elem((3, 8, 8), value));
//! let mut stream = MemoryStream::with_frame_rate(frames, 25.0);
//!
//! // Two frames before 1.0s, then a merged group of three.
//! let request = SampleRequest::new(1.0, 25.0)
//!     .with_start_frames_before_transition(2)
//!     .with_frames_to_merge(vec![1, 3]);
//! let tensor = load_frames(&mut stream, &request)?;
//! assert_eq!(tensor.shape(), &[2, 3, 8, 8]);
//! assert_eq!(tensor[[0, 0, 0, 0]], 23);
//! assert_eq!(tensor[[1, 0, 0, 0]], 25);
//! # Ok::<(), framesample::SampleError>(())
//! ```

use ndarray::{Array3, Array4, ArrayView3, Axis, stack};

use crate::{
    error::{Result, SampleError},
    stream::VideoStream,
};

/// Default slack, in seconds, when comparing decoded timestamps to the scan
/// target.
pub const DEFAULT_SEEK_TOLERANCE: f64 = 0.001;

/// Describes which frames to read around a transition.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SampleRequest {
    /// Timestamp in seconds, expected to fall on a frame boundary.
    pub transition_time: f64,
    /// Frame rate used to convert frame counts to seconds.
    pub fps: f64,
    /// How many frames before `transition_time` the first column starts.
    pub start_frames_before_transition: u32,
    /// Frames averaged into each output column, in column order.
    pub frames_to_merge: Vec<u32>,
    /// Slack applied to decoded timestamps during the forward scan.
    pub seek_tolerance: f64,
}

impl SampleRequest {
    /// A request for the single frame starting at `transition_time`.
    pub fn new(transition_time: f64, fps: f64) -> Self {
        Self {
            transition_time,
            fps,
            start_frames_before_transition: 0,
            frames_to_merge: vec![1],
            seek_tolerance: DEFAULT_SEEK_TOLERANCE,
        }
    }

    /// Start `frames` frames before the transition.
    pub fn with_start_frames_before_transition(mut self, frames: u32) -> Self {
        self.start_frames_before_transition = frames;
        self
    }

    /// Set the merge group sizes, one per output column.
    pub fn with_frames_to_merge(mut self, frames_to_merge: Vec<u32>) -> Self {
        self.frames_to_merge = frames_to_merge;
        self
    }

    /// Override the timestamp comparison slack. Negative values are clamped
    /// to zero.
    pub fn with_seek_tolerance(mut self, tolerance: f64) -> Self {
        self.seek_tolerance = tolerance.max(0.0);
        self
    }

    /// Timestamp the forward scan looks for: one frame earlier than the
    /// first retained frame.
    pub fn scan_target(&self) -> f64 {
        self.transition_time - (f64::from(self.start_frames_before_transition) + 1.0) / self.fps
    }

    /// Total number of frames read after the anchor.
    pub fn frames_consumed(&self) -> u64 {
        self.frames_to_merge.iter().map(|&n| u64::from(n)).sum()
    }

    fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(SampleError::InvalidSampleRequest(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.frames_to_merge.is_empty() {
            return Err(SampleError::InvalidSampleRequest(
                "frames_to_merge must not be empty".to_string(),
            ));
        }
        if self.frames_to_merge.contains(&0) {
            return Err(SampleError::InvalidSampleRequest(format!(
                "frames_to_merge entries must be positive: {:?}",
                self.frames_to_merge
            )));
        }
        Ok(())
    }
}

/// Load the default single-frame sample at `transition_time`.
///
/// Shorthand for [`load_frames`] with [`SampleRequest::new`].
pub fn load_frames_at<S: VideoStream + ?Sized>(
    video: &mut S,
    transition_time: f64,
    fps: f64,
) -> Result<Array4<u8>> {
    load_frames(video, &SampleRequest::new(transition_time, fps))
}

/// Read a group of frames around `request.transition_time`.
///
/// Returns an unnormalised tensor of shape
/// `[request.frames_to_merge.len(), C, H, W]`. Merge groups consume disjoint
/// runs of consecutive frames in order.
///
/// # Errors
///
/// - [`SampleError::InvalidSampleRequest`] if the request is malformed.
/// - [`SampleError::StreamExhausted`] if the stream ends before the anchor is
///   found or before every column is filled.
/// - [`SampleError::InconsistentFrameShape`] if frame geometry changes
///   mid-sample.
/// - Any error returned by the stream itself.
pub fn load_frames<S: VideoStream + ?Sized>(
    video: &mut S,
    request: &SampleRequest,
) -> Result<Array4<u8>> {
    request.validate()?;

    let target_start = request.scan_target();
    log::debug!(
        "Sampling {:?} at {}s (scan target {target_start}s)",
        request.frames_to_merge,
        request.transition_time,
    );

    video.seek(target_start)?;

    let mut anchor = video.next_frame()?;
    while anchor.pts + request.seek_tolerance < target_start {
        log::trace!("Skipping frame at {}s", anchor.pts);
        anchor = video.next_frame()?;
    }
    log::debug!("Anchor frame at {}s discarded", anchor.pts);

    let mut columns: Vec<Array3<u8>> = Vec::with_capacity(request.frames_to_merge.len());
    for &count in &request.frames_to_merge {
        let column = if count == 1 {
            video.next_frame()?.data
        } else {
            let group = (0..count)
                .map(|_| video.next_frame().map(|frame| frame.data))
                .collect::<Result<Vec<_>>>()?;
            average_frames(&group)?
        };

        if let Some(first) = columns.first() {
            check_shape(first.shape(), column.shape())?;
        }
        columns.push(column);
    }

    let views: Vec<ArrayView3<u8>> = columns.iter().map(|column| column.view()).collect();
    Ok(stack(Axis(0), &views)?)
}

/// Element-wise mean of equally shaped frames.
///
/// Accumulates in `f32` and truncates back to `u8`.
///
/// # Errors
///
/// Returns [`SampleError::InconsistentFrameShape`] if the frames differ in
/// shape, or [`SampleError::InvalidSampleRequest`] if `frames` is empty.
pub fn average_frames(frames: &[Array3<u8>]) -> Result<Array3<u8>> {
    let first = frames.first().ok_or_else(|| {
        SampleError::InvalidSampleRequest("cannot average an empty frame group".to_string())
    })?;

    let mut sum = first.mapv(f32::from);
    for frame in &frames[1..] {
        check_shape(first.shape(), frame.shape())?;
        sum.zip_mut_with(frame, |acc, &value| *acc += f32::from(value));
    }

    let count = frames.len() as f32;
    Ok(sum.mapv(|total| (total / count) as u8))
}

fn check_shape(expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected != actual {
        return Err(SampleError::InconsistentFrameShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

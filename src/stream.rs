//! Sequential video stream capability.
//!
//! The frame sampler only needs two things from a video source: a coarse
//! [`seek`](VideoStream::seek) that lands at or before a timestamp, and a
//! [`next_frame`](VideoStream::next_frame) that yields decoded frames in
//! presentation order. [`VideoStream`] captures exactly that, so the sampler
//! can run against FFmpeg (behind the `ffmpeg` feature), a camera, or the
//! in-memory [`MemoryStream`] used in tests.
//!
//! # Example
//!
//! ```
//! use framesample::{MemoryStream, VideoStream};
//! use ndarray::Array3;
//!
//! let frames = (0..10u8).map(|value| Array3::from_elem((1, 4, 4), value));
//! let mut stream = MemoryStream::with_frame_rate(frames, 25.0);
//!
//! stream.seek(0.2)?;
//! let frame = stream.next_frame()?;
//! assert_eq!(frame.data[[0, 0, 0]], 5);
//! # Ok::<(), framesample::SampleError>(())
//! ```

use ndarray::Array3;

use crate::error::{Result, SampleError};

/// One decoded video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Presentation timestamp in seconds.
    pub pts: f64,
    /// Raw pixel data, `[channels, height, width]`.
    pub data: Array3<u8>,
}

impl Frame {
    /// Create a frame from a timestamp and pixel data.
    pub fn new(pts: f64, data: Array3<u8>) -> Self {
        Self { pts, data }
    }

    /// The frame geometry as `[channels, height, width]`.
    pub fn shape(&self) -> [usize; 3] {
        let (channels, height, width) = self.data.dim();
        [channels, height, width]
    }
}

/// A sequential source of decoded frames.
///
/// Implementations are not expected to be frame-exact when seeking; the
/// sampler compensates by scanning forward after every seek.
pub trait VideoStream {
    /// Reposition the stream at or before `seconds`.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Decode and return the next frame.
    ///
    /// Returns [`SampleError::StreamExhausted`] once no frames remain.
    fn next_frame(&mut self) -> Result<Frame>;
}

impl<S: VideoStream + ?Sized> VideoStream for &mut S {
    fn seek(&mut self, seconds: f64) -> Result<()> {
        (**self).seek(seconds)
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }
}

impl<S: VideoStream + ?Sized> VideoStream for Box<S> {
    fn seek(&mut self, seconds: f64) -> Result<()> {
        (**self).seek(seconds)
    }

    fn next_frame(&mut self) -> Result<Frame> {
        (**self).next_frame()
    }
}

/// An in-memory [`VideoStream`] over pre-decoded frames.
///
/// Seeking lands on the last frame whose timestamp is at or before the
/// requested time. With a keyframe interval set, it instead lands on the last
/// such *keyframe*, mimicking a real demuxer that can only seek to keyframes.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    frames: Vec<Frame>,
    position: usize,
    keyframe_interval: usize,
}

impl MemoryStream {
    /// Create a stream from frames in presentation order.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            position: 0,
            keyframe_interval: 1,
        }
    }

    /// Create a stream whose frames are spaced exactly `1 / fps` apart,
    /// starting at zero.
    pub fn with_frame_rate<I>(frames: I, fps: f64) -> Self
    where
        I: IntoIterator<Item = Array3<u8>>,
    {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(index, data)| Frame::new(index as f64 / fps, data))
            .collect();
        Self::new(frames)
    }

    /// Only allow seeks to land on every `interval`-th frame.
    ///
    /// Clamped to a minimum of 1 (every frame is a keyframe).
    #[must_use]
    pub fn with_keyframe_interval(mut self, interval: usize) -> Self {
        self.keyframe_interval = interval.max(1);
        self
    }

    /// Number of frames in the stream.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the stream holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame the next call to `next_frame` will return.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl VideoStream for MemoryStream {
    fn seek(&mut self, seconds: f64) -> Result<()> {
        let at_or_before = self
            .frames
            .iter()
            .rposition(|frame| frame.pts <= seconds)
            .unwrap_or(0);
        self.position = at_or_before - at_or_before % self.keyframe_interval;
        log::trace!("MemoryStream seek to {seconds}s landed on frame {}", self.position);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let frame = self
            .frames
            .get(self.position)
            .cloned()
            .ok_or(SampleError::StreamExhausted)?;
        self.position += 1;
        Ok(frame)
    }
}

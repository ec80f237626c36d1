//! FFmpeg-backed [`VideoStream`].
//!
//! [`FfmpegVideoStream`] opens a media file, picks its best video stream and
//! decodes frames on demand into `[C, H, W]` arrays. Seeking lands on the
//! keyframe at or before the requested time, which is exactly the coarse
//! behaviour [`load_frames`](crate::load_frames) is built to correct for.
//!
//! Only available with the `ffmpeg` feature.
//!
//! # Example
//!
//! ```no_run
//! use framesample::{FfmpegVideoStream, SampleRequest, load_frames};
//!
//! let mut video = FfmpegVideoStream::open("input.mp4")?;
//! let fps = video.frames_per_second();
//! let tensor = load_frames(&mut video, &SampleRequest::new(12.0, fps))?;
//! println!("sampled {:?}", tensor.shape());
//! # Ok::<(), framesample::SampleError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};

use crate::{
    conversion::interleaved_to_planar,
    error::{Result, SampleError},
    normalise::Shape,
    stream::{Frame, VideoStream},
    utilities::{frame_to_buffer, pts_to_seconds, seconds_to_seek_timestamp},
};

/// Pixel layout of decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPixelFormat {
    /// Three 8-bit channels. This is the default.
    #[default]
    Rgb8,
    /// One 8-bit luma channel.
    Gray8,
}

impl StreamPixelFormat {
    fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            StreamPixelFormat::Rgb8 => Pixel::RGB24,
            StreamPixelFormat::Gray8 => Pixel::GRAY8,
        }
    }

    /// Number of channels in frames of this format.
    pub fn channels(self) -> usize {
        match self {
            StreamPixelFormat::Rgb8 => 3,
            StreamPixelFormat::Gray8 => 1,
        }
    }
}

/// Decoding settings for [`FfmpegVideoStream`].
///
/// When only one dimension is set the other keeps the source aspect ratio.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Output pixel layout.
    pub pixel_format: StreamPixelFormat,
    /// Output width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Output height. `None` keeps the source height.
    pub height: Option<u32>,
}

impl StreamOptions {
    /// Default options: RGB at the source resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output pixel layout.
    #[must_use]
    pub fn with_pixel_format(mut self, format: StreamPixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Scale decoded frames. Pass `None` to keep a source dimension.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if source_width > 0 => {
                let h = (f64::from(source_height) * f64::from(w) / f64::from(source_width)).round();
                (w, (h as u32).max(1))
            }
            (None, Some(h)) if source_height > 0 => {
                let w = (f64::from(source_width) * f64::from(h) / f64::from(source_height)).round();
                ((w as u32).max(1), h)
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}

/// A video file decoded frame by frame.
pub struct FfmpegVideoStream {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    frames_per_second: f64,
    duration: Duration,
    pixel_format: StreamPixelFormat,
    width: u32,
    height: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    path: PathBuf,
}

impl Debug for FfmpegVideoStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegVideoStream")
            .field("path", &self.path)
            .field("video_stream_index", &self.video_stream_index)
            .field("frames_per_second", &self.frames_per_second)
            .field("duration", &self.duration)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl FfmpegVideoStream {
    /// Open a media file with default options (RGB, source resolution).
    ///
    /// # Errors
    ///
    /// - [`SampleError::FileOpen`] if the file cannot be opened.
    /// - [`SampleError::NoVideoStream`] if it has no video.
    /// - [`SampleError::FfmpegError`] if decoder or scaler setup fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &StreamOptions::default())
    }

    /// Open a media file with explicit decoding options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &StreamOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video stream: {}", path.display());

        ffmpeg_next::init().map_err(|error| SampleError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SampleError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let (video_stream_index, time_base, frames_per_second, decoder) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(SampleError::NoVideoStream)?;

            let frame_rate = stream.avg_frame_rate();
            let frame_rate = if frame_rate.denominator() != 0 && frame_rate.numerator() != 0 {
                frame_rate
            } else {
                stream.rate()
            };
            let frames_per_second = if frame_rate.denominator() != 0 {
                f64::from(frame_rate.numerator()) / f64::from(frame_rate.denominator())
            } else {
                0.0
            };

            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?;
            (stream.index(), stream.time_base(), frames_per_second, decoder)
        };

        let (width, height) = options.resolve_dimensions(decoder.width(), decoder.height());
        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            options.pixel_format.to_ffmpeg_pixel(),
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        log::info!(
            "Opened {} (stream {video_stream_index}, {width}x{height} @ {frames_per_second:.3} fps, {duration:?})",
            path.display(),
        );

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            frames_per_second,
            duration,
            pixel_format: options.pixel_format,
            width,
            height,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            path,
        })
    }

    /// Average frame rate of the video stream.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Container duration, or zero if unknown.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Geometry of the frames this stream produces.
    pub fn shape(&self) -> Shape {
        Shape::new(
            self.pixel_format.channels(),
            self.height as usize,
            self.width as usize,
        )
    }

    fn convert_current_frame(&mut self) -> Result<Frame> {
        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;

        let channels = self.pixel_format.channels();
        let buffer = frame_to_buffer(&self.scaled_frame, self.width, self.height, channels);
        let data = interleaved_to_planar(
            buffer,
            self.height as usize,
            self.width as usize,
            channels,
        )
        .map_err(|error| SampleError::VideoDecodeError(error.to_string()))?;

        let pts = self.decoded_frame.pts().unwrap_or(0);
        Ok(Frame::new(pts_to_seconds(pts, self.time_base), data))
    }
}

impl VideoStream for FfmpegVideoStream {
    fn seek(&mut self, seconds: f64) -> Result<()> {
        let timestamp = seconds_to_seek_timestamp(seconds);
        log::debug!("Seeking {} to {seconds}s", self.path.display());
        self.input_context.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.eof_sent = false;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return self.convert_current_frame();
            }

            if self.eof_sent {
                return Err(SampleError::StreamExhausted);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::trace!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}

/// FFmpeg's own console verbosity.
///
/// This is separate from the Rust-side `log` output of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging messages.
    Debug,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl From<Level> for FfmpegLogLevel {
    /// FFmpeg levels without a counterpart map to the nearest coarser one.
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic | Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info | Level::Verbose => FfmpegLogLevel::Info,
            Level::Debug | Level::Trace => FfmpegLogLevel::Debug,
        }
    }
}

/// Set FFmpeg's console log level.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// FFmpeg's current console log level, if it is a recognised value.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from)
}

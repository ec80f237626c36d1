//! Timecode parsing and frame-aligned timestamp selection.
//!
//! Timecodes are written `H:M:S:F`, where `F` counts frames within the current
//! second at a known frame rate. All conversions produce plain `f64` seconds,
//! which is what [`load_frames`](crate::load_frames) consumes.
//!
//! # Example
//!
//! ```
//! use framesample::timestamp::{seconds_to_timestamp, timestamp_to_seconds};
//!
//! let seconds = timestamp_to_seconds("0:01:02:12", 25.0)?;
//! assert!((seconds - 62.48).abs() < 1e-9);
//! assert_eq!(seconds_to_timestamp(seconds, 25.0), "0:01:02:12");
//! # Ok::<(), framesample::SampleError>(())
//! ```

use rand::Rng;

use crate::error::{Result, SampleError};

/// Parse an `H:M:S:F` timecode into seconds.
///
/// Returns `H * 3600 + M * 60 + S + F / fps`. Component ranges are not
/// checked, so a frame count at or above `fps` simply spills into the next
/// second.
///
/// # Errors
///
/// Returns [`SampleError::Format`] if the text does not have exactly four
/// colon-separated components, or if a component is not numeric.
pub fn timestamp_to_seconds(text: &str, fps: f64) -> Result<f64> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 4 {
        return Err(SampleError::Format(format!(
            "Not a timestamp string: {text:?} (expected H:M:S:F)"
        )));
    }

    let hours = parse_whole(parts[0], text)?;
    let minutes = parse_whole(parts[1], text)?;
    let seconds = parse_whole(parts[2], text)?;
    let frames: f64 = parts[3].trim().parse().map_err(|_| {
        SampleError::Format(format!("Invalid frame component {:?} in {text:?}", parts[3]))
    })?;

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + frames / fps)
}

fn parse_whole(component: &str, text: &str) -> Result<u64> {
    component.trim().parse().map_err(|_| {
        SampleError::Format(format!("Invalid component {component:?} in {text:?}"))
    })
}

/// Format seconds as an `H:M:S:F` timecode at the given frame rate.
///
/// The frame component is rounded to the nearest frame; a frame count that
/// rounds up to a whole second carries into the seconds field. Negative input
/// is clamped to zero.
pub fn seconds_to_timestamp(seconds: f64, fps: f64) -> String {
    let seconds = seconds.max(0.0);
    let mut whole = seconds.floor() as u64;
    let mut frames = ((seconds - whole as f64) * fps).round() as u64;
    if frames as f64 >= fps {
        whole += 1;
        frames = 0;
    }

    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{hours}:{minutes:02}:{secs:02}:{frames:02}")
}

/// Pick a random frame-aligned timestamp in `[0, limit)`.
///
/// Uses the thread-local RNG. See [`random_frame_time_with_rng`].
///
/// # Errors
///
/// Returns [`SampleError::Range`] if there is no frame to choose from.
pub fn random_frame_time(fps: f64, limit: f64) -> Result<f64> {
    random_frame_time_with_rng(fps, limit, &mut rand::thread_rng())
}

/// Pick a random frame-aligned timestamp in `[0, limit)` using `rng`.
///
/// A frame index is drawn uniformly from `[0, round(limit * fps))` and
/// divided by `fps`, so the result always lands on a frame boundary rather
/// than between two frames. `limit` is the timestamp of the frame after the
/// last frame to be considered.
///
/// # Errors
///
/// Returns [`SampleError::Range`] if `fps` is not positive or the rounded
/// frame range is empty (for example when `limit <= 0`).
pub fn random_frame_time_with_rng<R: Rng + ?Sized>(
    fps: f64,
    limit: f64,
    rng: &mut R,
) -> Result<f64> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(SampleError::Range(format!(
            "Frame rate must be positive, got {fps}"
        )));
    }

    let limit_frames = (limit * fps).round();
    if !(limit_frames.is_finite() && limit_frames >= 1.0) {
        return Err(SampleError::Range(format!(
            "No frames before limit {limit}s at {fps} fps"
        )));
    }

    let frame_index = rng.gen_range(0..limit_frames as u64);
    Ok(frame_index as f64 / fps)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn parses_zero() {
        assert_eq!(timestamp_to_seconds("0:0:0:0", 25.0).unwrap(), 0.0);
    }

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(timestamp_to_seconds("1:2:3:0", 25.0).unwrap(), 3723.0);
    }

    #[test]
    fn frame_component_is_divided_by_fps() {
        let seconds = timestamp_to_seconds("0:0:10:5", 25.0).unwrap();
        assert!((seconds - 10.2).abs() < 1e-9);
    }

    #[test]
    fn frame_component_may_exceed_fps() {
        let seconds = timestamp_to_seconds("0:0:0:50", 25.0).unwrap();
        assert!((seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn huge_components_do_not_overflow() {
        let seconds = timestamp_to_seconds("9999999999999999:0:0:0", 25.0).unwrap();
        assert_eq!(seconds, 9_999_999_999_999_999.0 * 3600.0);

        let seconds = timestamp_to_seconds("0:18446744073709551615:0:0", 25.0).unwrap();
        assert!(seconds.is_finite() && seconds > 1e21);
    }

    #[test]
    fn rejects_three_components() {
        let error = timestamp_to_seconds("1:2:3", 25.0).unwrap_err();
        assert!(matches!(error, SampleError::Format(_)));
    }

    #[test]
    fn rejects_five_components() {
        assert!(matches!(
            timestamp_to_seconds("0:1:2:3:4", 25.0),
            Err(SampleError::Format(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_component() {
        assert!(matches!(
            timestamp_to_seconds("0:aa:2:3", 25.0),
            Err(SampleError::Format(_))
        ));
    }

    #[test]
    fn formats_with_carry() {
        assert_eq!(seconds_to_timestamp(3723.0, 25.0), "1:02:03:00");
        assert_eq!(seconds_to_timestamp(9.999, 25.0), "0:00:10:00");
    }

    #[test]
    fn random_time_is_frame_aligned_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let fps = 30.0;
        let limit = 2.5;
        for _ in 0..500 {
            let t = random_frame_time_with_rng(fps, limit, &mut rng).unwrap();
            assert!(t >= 0.0 && t < limit, "{t} out of range");
            let frame = t * fps;
            assert!((frame - frame.round()).abs() < 1e-9);
            assert!((frame.round() as u64) < (limit * fps).round() as u64);
        }
    }

    #[test]
    fn random_time_rejects_empty_range() {
        assert!(matches!(random_frame_time(25.0, 0.0), Err(SampleError::Range(_))));
        assert!(matches!(random_frame_time(25.0, -1.0), Err(SampleError::Range(_))));
        assert!(matches!(random_frame_time(0.0, 10.0), Err(SampleError::Range(_))));
    }
}

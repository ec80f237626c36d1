//! Frame sampler integration tests.
//!
//! All streams here are synthetic `MemoryStream`s whose frames are filled
//! with their own index, so the content of a sampled column identifies
//! exactly which frames were read.

use framesample::{Frame, MemoryStream, SampleError, SampleRequest, load_frames, load_frames_at};
use ndarray::Array3;

const FPS: f64 = 25.0;

fn indexed_stream(count: usize) -> MemoryStream {
    MemoryStream::with_frame_rate(
        (0..count).map(|index| Array3::from_elem((3, 4, 6), index as u8)),
        FPS,
    )
}

fn column_value(tensor: &ndarray::Array4<u8>, column: usize) -> u8 {
    tensor[[column, 0, 0, 0]]
}

// ── single frame ───────────────────────────────────────────────────

#[test]
fn single_frame_follows_the_anchor() {
    let mut stream = indexed_stream(100);
    // Frame 40 sits at 1.6s; the anchor is frame 39 and gets discarded.
    let tensor = load_frames_at(&mut stream, 1.6, FPS).expect("Failed to sample");

    assert_eq!(tensor.shape(), &[1, 3, 4, 6]);
    assert_eq!(column_value(&tensor, 0), 40);
}

#[test]
fn transition_at_first_frame_boundary() {
    let mut stream = indexed_stream(10);
    let tensor = load_frames_at(&mut stream, 1.0 / FPS, FPS).expect("Failed to sample");
    assert_eq!(column_value(&tensor, 0), 1);
}

#[test]
fn start_frames_before_transition_shifts_window() {
    let mut stream = indexed_stream(100);
    let request = SampleRequest::new(2.0, FPS)
        .with_start_frames_before_transition(5)
        .with_frames_to_merge(vec![1, 1, 1]);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");

    let values: Vec<u8> = (0..3).map(|column| column_value(&tensor, column)).collect();
    assert_eq!(values, vec![45, 46, 47]);
}

// ── merging ────────────────────────────────────────────────────────

#[test]
fn merged_group_is_the_average() {
    let values = [0u8, 0, 10, 20, 30, 0];
    let frames = values.iter().map(|&v| Array3::from_elem((1, 2, 2), v));
    let mut stream = MemoryStream::with_frame_rate(frames, FPS);

    // Transition at frame 2: anchor is frame 1, the group is frames 2..=4.
    let request = SampleRequest::new(2.0 / FPS, FPS).with_frames_to_merge(vec![3]);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");

    assert_eq!(tensor.shape(), &[1, 1, 2, 2]);
    assert!(tensor.iter().all(|&v| v == 20));
}

#[test]
fn merged_average_truncates() {
    let values = [0u8, 0, 10, 11, 0];
    let frames = values.iter().map(|&v| Array3::from_elem((1, 1, 1), v));
    let mut stream = MemoryStream::with_frame_rate(frames, FPS);

    let request = SampleRequest::new(2.0 / FPS, FPS).with_frames_to_merge(vec![2]);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");
    assert_eq!(column_value(&tensor, 0), 10);
}

#[test]
fn mixed_groups_consume_disjoint_runs() {
    let mut stream = indexed_stream(100);
    let request = SampleRequest::new(1.0, FPS).with_frames_to_merge(vec![1, 3, 1]);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");

    assert_eq!(tensor.shape()[0], 3);
    assert_eq!(column_value(&tensor, 0), 25);
    // (26 + 27 + 28) / 3
    assert_eq!(column_value(&tensor, 1), 27);
    assert_eq!(column_value(&tensor, 2), 29);
    assert_eq!(stream.position(), 30);
}

// ── seek imprecision ───────────────────────────────────────────────

#[test]
fn keyframe_seek_scans_forward() {
    let mut stream = indexed_stream(100).with_keyframe_interval(12);
    let request = SampleRequest::new(1.4, FPS).with_frames_to_merge(vec![1, 1]);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");

    assert_eq!(column_value(&tensor, 0), 35);
    assert_eq!(column_value(&tensor, 1), 36);
}

// Decoded timestamps land slightly before their ideal frame boundary.
fn jittered_stream() -> MemoryStream {
    let frames = (0..20u8)
        .map(|index| {
            let pts = f64::from(index) / FPS - 0.0004;
            Frame::new(pts, Array3::from_elem((1, 1, 1), index))
        })
        .collect();
    MemoryStream::new(frames)
}

#[test]
fn timestamp_jitter_is_tolerated() {
    let mut stream = jittered_stream();

    let tensor = load_frames_at(&mut stream, 0.4, FPS).expect("Failed to sample");
    assert_eq!(column_value(&tensor, 0), 10);
}

#[test]
fn strict_tolerance_skips_jittered_anchor() {
    let mut stream = jittered_stream();

    let request = SampleRequest::new(0.4, FPS).with_seek_tolerance(0.0);
    let tensor = load_frames(&mut stream, &request).expect("Failed to sample");
    assert_eq!(column_value(&tensor, 0), 11);
}

// ── failures ───────────────────────────────────────────────────────

#[test]
fn exhausted_before_anchor() {
    let mut stream = indexed_stream(10);
    let result = load_frames_at(&mut stream, 5.0, FPS);
    assert!(matches!(result, Err(SampleError::StreamExhausted)));
}

#[test]
fn exhausted_inside_merge_group() {
    let mut stream = indexed_stream(10);
    let request = SampleRequest::new(8.0 / FPS, FPS).with_frames_to_merge(vec![3]);
    let error = load_frames(&mut stream, &request).unwrap_err();
    assert!(
        error.to_string().contains("exhausted"),
        "Error should mention exhaustion: {error}",
    );
}

#[test]
fn empty_merge_list_is_rejected() {
    let mut stream = indexed_stream(10);
    let request = SampleRequest::new(0.2, FPS).with_frames_to_merge(Vec::new());
    assert!(matches!(
        load_frames(&mut stream, &request),
        Err(SampleError::InvalidSampleRequest(_))
    ));
}

#[test]
fn zero_fps_is_rejected() {
    let mut stream = indexed_stream(10);
    assert!(matches!(
        load_frames_at(&mut stream, 0.2, 0.0),
        Err(SampleError::InvalidSampleRequest(_))
    ));
}

#[test]
fn changing_geometry_is_rejected() {
    let frames = vec![
        Frame::new(0.0, Array3::zeros((1, 2, 2))),
        Frame::new(0.04, Array3::zeros((1, 2, 2))),
        Frame::new(0.08, Array3::zeros((1, 4, 4))),
        Frame::new(0.12, Array3::zeros((1, 4, 4))),
    ];
    let mut stream = MemoryStream::new(frames);
    let request = SampleRequest::new(0.04, FPS).with_frames_to_merge(vec![1, 1]);
    assert!(matches!(
        load_frames(&mut stream, &request),
        Err(SampleError::InconsistentFrameShape { .. })
    ));
}

#[test]
fn works_through_a_trait_object() {
    let mut stream: Box<dyn framesample::VideoStream> = Box::new(indexed_stream(50));
    let tensor = load_frames_at(&mut stream, 1.0, FPS).expect("Failed to sample");
    assert_eq!(column_value(&tensor, 0), 25);
}

//! Normaliser set construction and application tests.

use framesample::{
    MemoryStream, Normaliser, NormaliserOptions, SampleError, SampleRequest, Shape, TransformOp,
    add_channel_norm, add_resize_norm, default_normalisers, load_frames, noisy_choice,
    vflipped_choice,
};
use ndarray::{Array3, Array4, s};
use rand::{SeedableRng, rngs::StdRng};

fn options() -> NormaliserOptions {
    NormaliserOptions::new()
}

fn gradient_frame(shape: Shape) -> Array3<u8> {
    Array3::from_shape_fn((shape.channels, shape.height, shape.width), |(c, y, x)| {
        ((x + 2 * y + 40 * c) % 256) as u8
    })
}

// ── construction ───────────────────────────────────────────────────

#[test]
fn thirteen_normalisers_for_valid_shapes() {
    for shape in [
        Shape::new(3, 288, 352),
        Shape::new(3, 480, 640),
        Shape::new(1, 720, 1280),
        Shape::new(3, 240, 320),
    ] {
        let set = default_normalisers(shape, &options()).expect("Failed to build normalisers");
        assert_eq!(set.len(), 13, "shape {shape}");
    }
}

#[test]
fn invalid_channels_fail_the_whole_set() {
    let result = default_normalisers(Shape::new(2, 288, 352), &options());
    assert!(matches!(result, Err(SampleError::Format(_))));
}

#[test]
fn tall_frames_fail_the_whole_set() {
    let error = default_normalisers(Shape::new(3, 640, 480), &options()).unwrap_err();
    assert!(
        error.to_string().contains("too tall"),
        "Error should mention height: {error}",
    );
}

#[test]
fn matching_shape_needs_no_resize() {
    let mut ops = Vec::new();
    add_channel_norm(&mut ops, Shape::new(3, 288, 352)).unwrap();
    add_resize_norm(&mut ops, Shape::new(3, 288, 352), 352, 288).unwrap();
    assert_eq!(ops, vec![TransformOp::ToFloat, TransformOp::Grayscale]);
}

#[test]
fn custom_target_resolution_is_honoured() {
    let options = NormaliserOptions::new().with_target_resolution(160, 120);
    let shape = Shape::new(3, 90, 160);
    let set = default_normalisers(shape, &options).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    for normaliser in &set {
        let out = normaliser
            .apply_with_rng(gradient_frame(shape).view(), &mut rng)
            .unwrap();
        assert_eq!(out.dim(), (1, 120, 160));
    }
}

// ── application ────────────────────────────────────────────────────

#[test]
fn every_default_normaliser_produces_target_shape() {
    let mut rng = StdRng::seed_from_u64(11);
    for shape in [Shape::new(3, 480, 640), Shape::new(1, 288, 352), Shape::new(3, 200, 300)] {
        let set = default_normalisers(shape, &options()).unwrap();
        let frame = gradient_frame(shape);
        for (index, normaliser) in set.iter().enumerate() {
            let out = normaliser.apply_with_rng(frame.view(), &mut rng).unwrap();
            assert_eq!(out.dim(), (1, 288, 352), "normaliser {index} for {shape}");
            assert!(
                out.iter().all(|v| (0.0..=1.0).contains(v)),
                "normaliser {index} produced values outside [0, 1]",
            );
        }
    }
}

#[test]
fn letterbox_pads_with_black_bars() {
    let shape = Shape::new(1, 240, 352);
    let set = default_normalisers(shape, &options()).unwrap();
    let frame = Array3::from_elem((1, 240, 352), 255u8);
    let out = set[0].apply(frame.view()).unwrap();

    assert_eq!(out[[0, 0, 0]], 0.0);
    assert_eq!(out[[0, 23, 100]], 0.0);
    assert_eq!(out[[0, 24, 100]], 1.0);
    assert_eq!(out[[0, 263, 100]], 1.0);
    assert_eq!(out[[0, 264, 100]], 0.0);
}

#[test]
fn flipped_letterbox_mirrors_unflipped() {
    let shape = Shape::new(1, 288, 352);
    let set = default_normalisers(shape, &options()).unwrap();
    let frame = gradient_frame(shape);

    let plain = set[0].apply(frame.view()).unwrap();
    let flipped = set[4].apply(frame.view()).unwrap();
    assert_eq!(plain.slice(s![.., .., ..;-1]), flipped);
}

#[test]
fn batch_shares_random_parameters() {
    let shape = Shape::new(1, 400, 500);
    let set = default_normalisers(shape, &options()).unwrap();
    let frame = gradient_frame(shape);
    let batch = ndarray::stack(ndarray::Axis(0), &[frame.view(), frame.view()]).unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let out = set[2].apply_batch_with_rng(batch.view(), &mut rng).unwrap();
    assert_eq!(out.slice(s![0, .., .., ..]), out.slice(s![1, .., .., ..]));
}

#[test]
fn sampled_tensor_normalises_per_column() {
    let fps = 25.0;
    let shape = Shape::new(3, 240, 320);
    let frames = (0..40u8).map(|v| Array3::from_elem((3, 240, 320), v.saturating_mul(6)));
    let mut stream = MemoryStream::with_frame_rate(frames, fps);
    let request = SampleRequest::new(1.0, fps).with_frames_to_merge(vec![1, 2, 1]);
    let sample = load_frames(&mut stream, &request).unwrap();

    let set = default_normalisers(shape, &options()).unwrap();
    let out = set[1].apply_batch(sample.view()).unwrap();
    assert_eq!(out.shape(), &[3, 1, 288, 352]);
}

// ── random choice ──────────────────────────────────────────────────

fn constant_normaliser(value: f32) -> Normaliser {
    Normaliser::new(vec![TransformOp::GaussianNoise {
        mean: value,
        sigma: 0.0,
    }])
}

#[test]
fn random_choice_rerandomises_per_application() {
    let choices = [
        constant_normaliser(0.1),
        constant_normaliser(0.2),
        constant_normaliser(0.3),
    ];
    let normaliser = Normaliser::new(vflipped_choice(&choices));
    let mut rng = StdRng::seed_from_u64(99);

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..60 {
        let out = normaliser
            .apply_tensor_with_rng(Array4::zeros((1, 1, 2, 2)), &mut rng)
            .unwrap();
        seen.insert((out[[0, 0, 0, 0]] * 10.0).round() as u32);
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn noise_combinator_perturbs_output() {
    let options = NormaliserOptions::new().with_noise(0.0, 0.2);
    let normaliser = Normaliser::new(noisy_choice(&[constant_normaliser(0.5)], &options));
    let mut rng = StdRng::seed_from_u64(1);
    let out = normaliser
        .apply_tensor_with_rng(Array4::zeros((1, 1, 8, 8)), &mut rng)
        .unwrap();
    assert!(out.iter().any(|v| (v - 0.5).abs() > 1e-3));
    assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
}

use serde_json::json;
use telemtab::core::{samples_from_raw, RawPoint, Sample};
use telemtab::visualization::{RingBuffer, SeriesNormalizer, SharedWindow};

const EPS: f64 = 1e-9;

fn buffer_of(points: &[(f64, f64)]) -> RingBuffer {
    let mut buffer = RingBuffer::new(points.len().max(1)).unwrap();
    buffer.ingest(points.iter().map(|&(value, ts)| Sample::new(value, ts)));
    buffer
}

fn assert_point(actual: [f64; 2], expected: [f64; 2]) {
    assert!(
        (actual[0] - expected[0]).abs() < EPS && (actual[1] - expected[1]).abs() < EPS,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

#[test]
fn test_normalization_range() {
    let buffer = buffer_of(&[(-5.0, 100.0), (5.0, 200.0)]);
    let normalizer = SeriesNormalizer::new(2);

    let points = normalizer
        .normalize(&buffer, SharedWindow::new(100.0, 200.0))
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_point(points[0], [-1.0, -1.0]);
    assert_point(points[1], [1.0, 1.0]);
}

#[test]
fn test_x_follows_shared_window_not_series() {
    // Series covers the second half of the tab's window
    let buffer = buffer_of(&[(0.0, 150.0), (1.0, 200.0)]);
    let normalizer = SeriesNormalizer::new(2);

    let points = normalizer
        .normalize(&buffer, SharedWindow::new(100.0, 200.0))
        .unwrap();

    assert_point(points[0], [0.0, -1.0]);
    assert_point(points[1], [1.0, 1.0]);
}

#[test]
fn test_degenerate_window_and_flat_values() {
    let buffer = buffer_of(&[(3.0, 50.0), (3.0, 50.0), (3.0, 50.0)]);
    let normalizer = SeriesNormalizer::new(4);

    let points = normalizer
        .normalize(&buffer, SharedWindow::new(50.0, 50.0))
        .unwrap();

    assert_eq!(points.len(), 4);
    for point in points {
        assert!(point[0].is_finite() && point[1].is_finite());
        assert_eq!(point, [SeriesNormalizer::FLAT_X, SeriesNormalizer::FLAT_Y]);
    }
}

#[test]
fn test_short_buffer_repeats_last_point() {
    let buffer = buffer_of(&[(0.0, 0.0), (10.0, 10.0), (5.0, 20.0)]);
    let normalizer = SeriesNormalizer::new(6);

    let points = normalizer
        .normalize(&buffer, SharedWindow::new(0.0, 20.0))
        .unwrap();

    assert_eq!(points.len(), 6);
    assert_point(points[2], [1.0, 0.0]);
    for point in &points[3..] {
        assert_eq!(*point, points[2]);
    }
}

#[test]
fn test_long_buffer_keeps_newest_samples() {
    let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, i as f64)).collect();
    let buffer = buffer_of(&points);
    let normalizer = SeriesNormalizer::new(4);

    let out = normalizer
        .normalize(&buffer, SharedWindow::new(0.0, 9.0))
        .unwrap();

    assert_eq!(out.len(), 4);
    // Last slot is the newest sample at the right edge
    assert_point(out[3], [1.0, 1.0]);
    assert!(out[0][0] > 0.0);
}

#[test]
fn test_single_sample_is_not_drawable() {
    let buffer = buffer_of(&[(1.0, 1.0)]);
    let normalizer = SeriesNormalizer::new(8);

    assert!(normalizer
        .normalize(&buffer, SharedWindow::new(0.0, 1.0))
        .is_none());
}

#[test]
fn test_normalize_into_reuses_output() {
    let buffer = buffer_of(&[(0.0, 0.0), (1.0, 1.0)]);
    let normalizer = SeriesNormalizer::new(3);
    let mut out = vec![[9.0, 9.0]; 10];

    assert!(normalizer.normalize_into(&buffer, SharedWindow::new(0.0, 1.0), &mut out));
    assert_eq!(out.len(), 3);
    assert_point(out[0], [-1.0, -1.0]);
    assert_point(out[2], [1.0, 1.0]);
}

#[test]
fn test_non_finite_wire_values_never_reach_the_line() {
    let points: Vec<RawPoint> =
        serde_json::from_value(json!([["NaN", 1], [2, 2], ["inf", 2.5], [3, 3]])).unwrap();
    let mut buffer = RingBuffer::new(8).unwrap();
    buffer.ingest(samples_from_raw(&points));
    assert_eq!(buffer.len(), 2);

    let line = SeriesNormalizer::new(4)
        .normalize(&buffer, SharedWindow::new(1.0, 3.0))
        .unwrap();

    assert_eq!(line.len(), 4);
    assert!(line.iter().flatten().all(|c| c.is_finite()), "{:?}", line);
    assert_point(line[0], [0.0, -1.0]);
    assert_point(line[1], [1.0, 1.0]);
}

use adas::{
    AdasConfig, Calibration, EdgeGeometryPipeline, FrameInputs, LanePositionDetector,
    LineClassifier, LiveSettings, RegionExtractor,
};
use camera_capture::VideoFrame;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// VGA frame with a double-line divider and one lane line in the ROI band
fn road_frame() -> VideoFrame {
    let mut frame = VideoFrame::solid(640, 480, [30, 30, 30]);
    for y in 210..270u32 {
        for (start, end) in [(40u32, 48u32), (60, 68), (288, 296)] {
            for x in (160 + start)..(160 + end) {
                let idx = ((y * 640 + x) * 3) as usize;
                frame.data[idx..idx + 3].copy_from_slice(&[250, 250, 250]);
            }
        }
    }
    frame
}

fn bench_geometry(c: &mut Criterion) {
    let config = AdasConfig::default();
    let region = RegionExtractor::new(&config).unwrap();
    let roi = region.extract(&road_frame()).unwrap();
    let mut pipeline = EdgeGeometryPipeline::new(&Calibration::default());
    let settings = LiveSettings::default();

    c.bench_function("edge_geometry_pipeline", |b| {
        b.iter(|| black_box(pipeline.process(black_box(&roi), &settings).unwrap()))
    });

    let segments = pipeline.process(&roi, &settings).unwrap().segments;
    let classifier = LineClassifier::new(&Calibration::default());
    c.bench_function("line_classifier", |b| {
        b.iter(|| black_box(classifier.classify(black_box(&segments))))
    });
}

fn bench_detector(c: &mut Criterion) {
    let mut detector = LanePositionDetector::new(AdasConfig::default()).unwrap();
    let frame = road_frame();
    let inputs = FrameInputs {
        settings: LiveSettings {
            vehicle_width_m: 3.0,
            ..Default::default()
        },
        below_speed_threshold: false,
    };

    c.bench_function("process_frame_vga", |b| {
        b.iter(|| black_box(detector.process_frame(black_box(&frame), &inputs).unwrap()))
    });
}

criterion_group!(frame_pipeline, bench_geometry, bench_detector);
criterion_main!(frame_pipeline);

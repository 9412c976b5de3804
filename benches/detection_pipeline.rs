use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use finger_timer::acquisition::FrameSampler;
use finger_timer::config::SystemConfig;
use finger_timer::hal::simulator::{SimulatorConfig, SyntheticCamera};
use finger_timer::hal::InferenceService;
use finger_timer::ml::LinearModel;
use finger_timer::processing::{DetectionPipeline, FeatureExtractor, HeuristicClassifier, MajorityVoteFilter};

const FINGER_COUNTS: &[u8] = &[0, 1, 3, 5];
const FRAME_LENGTHS: &[usize] = &[3_000, 6_000, 20_000];
const FEATURE_COUNTS: &[usize] = &[10, 20, 64];

fn camera(fingers: u8, frame_length: usize) -> SyntheticCamera {
    let mut camera = SyntheticCamera::new(SimulatorConfig {
        frame_length,
        ..SimulatorConfig::default()
    });
    camera.set_finger_count(fingers);
    camera
}

fn benchmark_heuristic(c: &mut Criterion) {
    let mut group = c.benchmark_group("heuristic");
    let sampler = FrameSampler::default();
    let classifier = HeuristicClassifier::new();

    for &fingers in FINGER_COUNTS {
        let frame = camera(fingers, 6_000).render();
        let samples = sampler.sample(&frame, 100);

        group.bench_with_input(BenchmarkId::new("sample", fingers), &frame, |b, frame| {
            b.iter(|| sampler.sample(black_box(frame), 100));
        });

        group.bench_with_input(BenchmarkId::new("classify", fingers), &samples, |b, samples| {
            b.iter(|| classifier.classify(black_box(samples)));
        });
    }

    group.finish();
}

fn benchmark_feature_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    for &frame_length in FRAME_LENGTHS {
        let frame = camera(3, frame_length).render();
        group.throughput(Throughput::Bytes(frame_length as u64));

        for &feature_count in FEATURE_COUNTS {
            let extractor = FeatureExtractor::new(FrameSampler::default(), feature_count, 400, 100);

            group.bench_with_input(
                BenchmarkId::new("extract", format!("{}f_{}b", feature_count, frame_length)),
                &frame,
                |b, frame| {
                    b.iter(|| extractor.extract(black_box(frame)));
                },
            );
        }
    }

    group.finish();
}

fn benchmark_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("inference");
    let frame = camera(2, 6_000).render();

    for &feature_count in FEATURE_COUNTS {
        let extractor = FeatureExtractor::new(FrameSampler::default(), feature_count, 400, 100);
        let features = extractor.extract(&frame).features().clone();
        let weights = (0..6)
            .map(|label| (0..feature_count).map(|i| ((label * 7 + i) % 11) as f32 * 0.01).collect())
            .collect();
        let mut model = match LinearModel::new(weights, vec![0.0; 6]) {
            Ok(model) => model,
            Err(_) => continue,
        };

        group.bench_with_input(BenchmarkId::new("linear", feature_count), &features, |b, features| {
            b.iter(|| model.classify(black_box(features)));
        });
    }

    group.bench_function("majority_vote", |b| {
        use finger_timer::processing::ConfirmationFilter;
        let mut filter = MajorityVoteFilter::default();
        let raws = [2u8, 2, 3, 2, 0, 2, 2, 5];
        b.iter(|| {
            for &raw in &raws {
                black_box(filter.observe(raw));
            }
            filter.reset();
        });
    });

    group.finish();
}

fn benchmark_full_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection_cycle");
    group.throughput(Throughput::Elements(1));

    for &fingers in FINGER_COUNTS {
        group.bench_with_input(BenchmarkId::new("heuristic", fingers), &fingers, |b, &fingers| {
            let mut pipeline = DetectionPipeline::heuristic(&SystemConfig::default());
            let mut source = camera(fingers, 6_000);
            b.iter(|| {
                let outcome = pipeline.run_cycle(&mut source);
                black_box(outcome)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_heuristic,
    benchmark_feature_extraction,
    benchmark_inference,
    benchmark_full_cycle
);
criterion_main!(benches);

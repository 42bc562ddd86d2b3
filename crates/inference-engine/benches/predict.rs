use anomaly_core::AnomalyRecord;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use inference_engine::{EngineConfig, ModelLoader, PredictionEngine};
use serde_json::json;
use std::path::Path;

const SYSTEMS: [&str; 4] = ["Hydraulic", "Electrical", "Pneumatic", "Mechanical"];

fn make_records(count: usize) -> Vec<AnomalyRecord> {
    (0..count)
        .map(|i| {
            AnomalyRecord::new(
                format!("EQ{:04}", i),
                SYSTEMS[i % SYSTEMS.len()],
                "Pressure drop detected in main valve, seal wear suspected",
            )
        })
        .collect()
}

fn linear_engine() -> PredictionEngine {
    // Hashed layout: 2 categorical columns + 100 text slots
    let artifact = json!({
        "model": {
            "type": "linear",
            "coefficients": vec![vec![0.001; 102]; 4],
            "intercepts": [3.0, 3.0, 3.0, 9.0]
        }
    });
    let outcome = ModelLoader::default().extract(&artifact, Path::new("."));
    PredictionEngine::new(&EngineConfig::default(), outcome)
}

fn bench_predict(c: &mut Criterion) {
    let rules = PredictionEngine::rules_only(&EngineConfig::default());
    let model = linear_engine();
    let records = make_records(1_000);

    c.bench_function("rules batch of 1000", |b| {
        b.iter(|| rules.predict_batch(black_box(&records)))
    });

    c.bench_function("linear model batch of 1000", |b| {
        b.iter(|| model.predict_batch(black_box(&records)))
    });

    c.bench_function("linear model single record", |b| {
        b.iter_batched(
            || records[0].clone(),
            |record| model.predict_one(&record),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_validator::{Transaction, V_FEATURE_COUNT};
use feature_engine::{AmountTimeScaler, Preprocessor, ScalerParams};

fn bench_preprocess(c: &mut Criterion) {
    let tx = Transaction::new(Some(406.0), 149.62, [0.25; V_FEATURE_COUNT]);
    let persisted = Preprocessor::scaled_amount_time(AmountTimeScaler {
        amount: ScalerParams { center: 22.0, scale: 71.565 },
        time: ScalerParams { center: 84692.0, scale: 85119.0 },
    });
    let refit = Preprocessor::scaled_amount_time_refit();
    let raw = Preprocessor::raw_amount();

    c.bench_function("preprocess_scaled_persisted", |b| {
        b.iter(|| persisted.transform(black_box(&tx)))
    });
    c.bench_function("preprocess_scaled_refit", |b| {
        b.iter(|| refit.transform(black_box(&tx)))
    });
    c.bench_function("preprocess_raw_amount", |b| b.iter(|| raw.transform(black_box(&tx))));
}

criterion_group!(benches, bench_preprocess);
criterion_main!(benches);

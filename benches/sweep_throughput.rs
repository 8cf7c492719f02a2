use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ctr_sweep::{Binder, Parameter, PlaybookRef, Vars};
use serde_json::json;

fn make_binder() -> Binder {
    let region = Parameter::new(
        "region",
        vec![json!("us"), json!("eu"), json!("ap")],
        3.0,
        [("zone".to_string(), vec![json!("us-1"), json!("eu-1"), json!("ap-1")])].into(),
        vec![PlaybookRef::new("teardown_region.yml")],
    )
    .expect("region");
    let size = Parameter::new(
        "size",
        vec![json!(4), json!(16), json!(64), json!(256)],
        2.0,
        BTreeMap::new(),
        vec![PlaybookRef::new("resize.yml")],
    )
    .expect("size");
    let flag = Parameter::simple("flag", vec![json!(true), json!(false)]).expect("flag");
    Binder::new(
        vec![PlaybookRef::new("deploy.yml"), PlaybookRef::new("bench.yml")],
        [("cluster".to_string(), json!("bench"))].into(),
        vec![region, size, flag],
    )
    .expect("binder")
}

fn bench_sweep(c: &mut Criterion) {
    let binder = make_binder();
    c.bench_function("sweep_throughput", |b| {
        b.iter(|| black_box(binder.sweep().count()));
    });
    c.bench_function("sweep_fingerprints", |b| {
        b.iter(|| {
            for run in binder.sweep() {
                black_box(run.fingerprint());
            }
        });
    });
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);

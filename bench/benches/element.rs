use std::hint::black_box;

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use lazy_bson::{Array, Document, Value};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// A document of `n` records, each holding a few scalars and a small array.
fn sample(n: usize) -> Bytes {
    let mut doc = Document::new();
    for i in 0..n {
        let mut record = Document::new();
        record.set("id", Value::int64(i as i64)).unwrap();
        record.set("name", Value::string("record")).unwrap();
        record.set("score", Value::double(i as f64 * 0.5)).unwrap();
        let tags = Array::try_from_values((0..4).map(Value::int32)).unwrap();
        record.set("tags", Value::array(tags)).unwrap();
        doc.set(&format!("r{i}"), Value::document(record)).unwrap();
    }
    Bytes::from(doc.marshal().unwrap())
}

fn bench_read(c: &mut Criterion) {
    let data = sample(1000);
    let mut group = c.benchmark_group("read");

    group.bench_function("split", |b| {
        b.iter(|| black_box(Document::read(data.clone()).unwrap().len()));
    });

    let doc = Document::read(data.clone()).unwrap();
    group.bench_function("validate", |b| {
        b.iter(|| black_box(doc.validate().unwrap()));
    });

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let data = sample(1000);
    let mut group = c.benchmark_group("write");

    let raw = Document::read(data.clone()).unwrap();
    group.bench_function("raw_copy", |b| {
        b.iter(|| black_box(raw.marshal().unwrap()));
    });

    let mut edited = Document::read(data).unwrap();
    for element in edited.iter_mut() {
        element
            .value_mut()
            .document_mut()
            .unwrap()
            .set("touched", Value::boolean(true))
            .unwrap();
    }
    group.bench_function("materialized", |b| {
        b.iter(|| black_box(edited.marshal().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_read, bench_write);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mailgrab::extract::Extractor;
use mailgrab::parser::filename::ExtensionFilter;

fn load_fixture() -> Vec<u8> {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("report.eml");
    std::fs::read(fixture_path).unwrap()
}

fn bench_parse_candidates(c: &mut Criterion) {
    let raw = load_fixture();

    c.bench_function("parse_candidates_report", |b| {
        b.iter(|| mailgrab::parser::mime::parse_candidates(&raw).unwrap().len())
    });
}

fn bench_dedup_path(c: &mut Criterion) {
    let raw = load_fixture();
    let dir = tempfile::tempdir().unwrap();
    let mut extractor = Extractor::new(dir.path(), ExtensionFilter::accept_all()).unwrap();
    // First pass stores the files; every later pass only hashes and hits the registry.
    extractor.process_message(&raw).unwrap();

    c.bench_function("process_message_duplicates", |b| {
        b.iter(|| extractor.process_message(&raw).unwrap().len())
    });
}

criterion_group!(benches, bench_parse_candidates, bench_dedup_path);
criterion_main!(benches);

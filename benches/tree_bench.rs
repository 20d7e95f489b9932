#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use xylo::{Document, NodeReader, XmlName};

/// Generates a catalog document with `count` records.
fn make_catalog(count: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?><catalog>");
    for i in 0..count {
        let _ = write!(
            xml,
            "<book id=\"bk{i}\"><title>Title {i}</title><price>{}.99</price></book>",
            10 + i
        );
    }
    xml.push_str("</catalog>");
    xml
}

fn bench_parse(c: &mut Criterion) {
    let small = make_catalog(10);
    let large = make_catalog(1000);
    c.bench_function("parse_small", |b| {
        b.iter(|| Document::parse_str(black_box(&small)).expect("well-formed"));
    });
    c.bench_function("parse_large", |b| {
        b.iter(|| Document::parse_str(black_box(&large)).expect("well-formed"));
    });
}

fn bench_serialize(c: &mut Criterion) {
    let doc = Document::parse_str(&make_catalog(1000)).expect("well-formed");
    c.bench_function("serialize_large", |b| {
        b.iter(|| doc.to_xml().expect("serializable"));
    });
}

fn bench_reader_walk(c: &mut Criterion) {
    let doc = Document::parse_str(&make_catalog(1000)).expect("well-formed");
    c.bench_function("reader_walk_large", |b| {
        b.iter(|| {
            let mut reader = NodeReader::new(black_box(&doc));
            let mut nodes = 0u32;
            while reader.read() {
                nodes += 1;
            }
            nodes
        });
    });
}

fn bench_mutation(c: &mut Criterion) {
    let item = XmlName::get("item").expect("valid name");
    let root_name = XmlName::get("root").expect("valid name");
    c.bench_function("append_1000_children", |b| {
        b.iter(|| {
            let mut doc = Document::new();
            let root = doc.new_element(root_name);
            doc.add(doc.root(), root).expect("single root");
            for _ in 0..1000 {
                let child = doc.new_element(item);
                doc.add(root, child).expect("element content");
            }
            doc.node_count()
        });
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_serialize,
    bench_reader_walk,
    bench_mutation
);
criterion_main!(benches);

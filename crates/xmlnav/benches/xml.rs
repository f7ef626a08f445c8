use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use xmlnav::{from_xml_str, Config, NameInterner, Parser};

const SIMPLE_XML: &str = "<root><child>text</child></root>";
const ATTR_XML: &str = "<root id=\"1\" name='test'><item value=\"42\" /></root>";

fn osm_like(nodes: usize) -> String {
    let mut xml = String::from("<osm version=\"0.6\">");
    for i in 0..nodes {
        xml.push_str(&format!(
            "<node id=\"{i}\" lat=\"52.{i:04}\" lon=\"13.{i:04}\"><tag k=\"name\" v=\"n{i}\"/></node>"
        ));
    }
    xml.push_str("</osm>");
    xml
}

fn bench_simple(c: &mut Criterion) {
    c.bench_function("xmlnav_xml_simple", |b| {
        b.iter(|| from_xml_str(black_box(SIMPLE_XML)))
    });
}

fn bench_attr(c: &mut Criterion) {
    c.bench_function("xmlnav_xml_attr", |b| {
        b.iter(|| from_xml_str(black_box(ATTR_XML)))
    });
}

fn bench_large(c: &mut Criterion) {
    let xml = osm_like(5_000);
    let mut group = c.benchmark_group("xmlnav_xml_large");
    group.throughput(Throughput::Bytes(
        u64::try_from(xml.len()).unwrap_or(u64::MAX),
    ));

    group.bench_function("fresh_interner", |b| {
        b.iter(|| from_xml_str(black_box(&xml)))
    });

    let interner = Arc::new(NameInterner::new());
    group.bench_function("shared_interner", |b| {
        b.iter(|| {
            let mut parser = Parser::with_interner(
                black_box(xml.as_bytes()),
                Config::default(),
                Arc::clone(&interner),
            );
            parser.parse()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_simple, bench_attr, bench_large);
criterion_main!(benches);

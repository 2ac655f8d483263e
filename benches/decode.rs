//! Decode-path benchmarks for xbase
//!
//! These benchmarks measure the hot conversions on the index and cursor
//! read paths: the 12-byte packed-decimal numeric key decode and the
//! Julian-day date arithmetic.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use xbase::codec::decode_packed_decimal;
use xbase::Date;

fn bench_packed_decimal(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed_decimal");

    let vectors: Vec<(&str, [u8; 12])> = vec![
        ("ten", [0x36, 0x29, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ("hundred_thousand", [0x3a, 0x51, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        (
            "nine_nines",
            [0x3d, 0x51, 0x99, 0x99, 0x99, 0x99, 0x90, 0, 0, 0, 0, 0],
        ),
        ("zero", [0x40, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
    ];

    for (name, bytes) in vectors {
        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| decode_packed_decimal(black_box(bytes)));
        });
    }

    group.finish();
}

fn bench_julian_day(c: &mut Criterion) {
    let mut group = c.benchmark_group("julian_day");

    let date = Date::new(5, 18, 2012);
    group.bench_function("to_julian", |b| {
        b.iter(|| black_box(date).julian_day());
    });

    let day = date.julian_day();
    group.bench_function("from_julian", |b| {
        b.iter(|| Date::from_julian_day(black_box(day)));
    });

    group.finish();
}

criterion_group!(benches, bench_packed_decimal, bench_julian_day);
criterion_main!(benches);

//! Benchmarks for the blob decoders on the comparison hot path.
//!
//! Every member key decodes a signature blob, and every blob read starts with a compressed
//! length, so both are measured here:
//! - compressed unsigned and signed integers of all three widths
//! - method, field, property and type specification signatures

extern crate cildiff;

use cildiff::{
    metadata::signatures::{
        parse_field_signature, parse_method_signature, parse_property_signature,
        parse_type_spec_signature,
    },
    Parser,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Benchmark decoding compressed unsigned integers of 1, 2 and 4 bytes.
fn bench_compressed_uint(c: &mut Criterion) {
    #[rustfmt::skip]
    let data = [
        0x03,
        0x7F,
        0x80, 0x80,
        0xAE, 0x57,
        0xBF, 0xFF,
        0xC0, 0x00, 0x40, 0x00,
        0xDF, 0xFF, 0xFF, 0xFF,
    ];

    c.bench_function("compressed_uint", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(&data));
            let mut sum = 0u32;
            for _ in 0..7 {
                sum = sum.wrapping_add(parser.read_compressed_uint().unwrap());
            }
            black_box(sum)
        });
    });
}

/// Benchmark decoding rotated, sign-extended compressed integers.
fn bench_compressed_int(c: &mut Criterion) {
    #[rustfmt::skip]
    let data = [
        0x06,
        0x7B,
        0x80, 0x80,
        0x01,
        0xC0, 0x00, 0x40, 0x00,
        0xDF, 0xFF, 0xFF, 0xFE,
    ];

    c.bench_function("compressed_int", |b| {
        b.iter(|| {
            let mut parser = Parser::new(black_box(&data));
            let mut sum = 0i32;
            for _ in 0..6 {
                sum = sum.wrapping_add(parser.read_compressed_int().unwrap());
            }
            black_box(sum)
        });
    });
}

/// Benchmark an instance method with primitive parameters.
/// Signature: int Method(int a, string b, bool c)
fn bench_method_signature(c: &mut Criterion) {
    // HASTHIS, 3 params, I4 return, I4, STRING, BOOLEAN params
    let signature = [0x20, 0x03, 0x08, 0x08, 0x0E, 0x02];

    c.bench_function("sig_method_primitives", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark a generic method with class, byref and array parameters.
/// Signature: T Method<T>(ref Widget a, T[] b, List<T> c)
fn bench_method_signature_generic(c: &mut Criterion) {
    #[rustfmt::skip]
    let signature = [
        0x30, 0x01, 0x03,               // HASTHIS | GENERIC, 1 type param, 3 params
        0x1E, 0x00,                     // return !!0
        0x10, 0x12, 0x09,               // ref class TypeRef(2)
        0x1D, 0x1E, 0x00,               // !!0[]
        0x15, 0x12, 0x0D, 0x01, 0x1E, 0x00, // class TypeRef(3)<!!0>
    ];

    c.bench_function("sig_method_generic", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark a field with a custom modifier.
/// Signature: modreq(IsVolatile) int
fn bench_field_signature(c: &mut Criterion) {
    let signature = [0x06, 0x1F, 0x09, 0x08];

    c.bench_function("sig_field_modreq", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark an indexer property.
/// Signature: string this[int]
fn bench_property_signature(c: &mut Criterion) {
    let signature = [0x28, 0x01, 0x0E, 0x08];

    c.bench_function("sig_property_indexer", |b| {
        b.iter(|| {
            let sig = parse_property_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark a nested generic instantiation.
/// Signature: Dictionary<string, List<int>>
fn bench_type_spec_signature(c: &mut Criterion) {
    #[rustfmt::skip]
    let signature = [
        0x15, 0x12, 0x11, 0x02,         // class TypeRef(4)<2 args>
        0x0E,                           // string
        0x15, 0x12, 0x0D, 0x01, 0x08,   // class TypeRef(3)<int>
    ];

    c.bench_function("sig_typespec_nested", |b| {
        b.iter(|| {
            let sig = parse_type_spec_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

criterion_group!(
    benches,
    bench_compressed_uint,
    bench_compressed_int,
    bench_method_signature,
    bench_method_signature_generic,
    bench_field_signature,
    bench_property_signature,
    bench_type_spec_signature
);
criterion_main!(benches);

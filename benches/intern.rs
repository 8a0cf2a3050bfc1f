//! String interning benchmarks

use lox_heap::eval::{memory::hash::hash_bytes, runtime::Runtime};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn words(count: usize) -> Vec<String> {
    (0..count).map(|n| format!("identifier_{n}")).collect()
}

/// Intern every word by copy, then intern them all again
fn intern_twice(words: &[String]) -> usize {
    let mut runtime = Runtime::new();
    for _ in 0..2 {
        for w in words {
            runtime.intern_by_copy(w.as_bytes()).unwrap();
        }
    }
    runtime.strings().len()
}

/// Intern every word by transfer
fn intern_transfer(words: &[String]) -> usize {
    let mut runtime = Runtime::new();
    for w in words {
        runtime.intern_by_transfer(w.clone().into_bytes()).unwrap();
    }
    runtime.strings().len()
}

/// Concatenate a short prefix onto each word
fn concatenate(runtime: &mut Runtime, words: &[String]) {
    let prefix = runtime.intern_str("lox.").unwrap();
    for w in words {
        let s = runtime.intern_str(w).unwrap();
        runtime.concatenate(prefix, s).unwrap();
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let long = "x".repeat(4096);
    c.bench_function("hash_short", |b| {
        b.iter(|| hash_bytes(black_box(b"foobar")))
    });
    c.bench_function("hash_4k", |b| b.iter(|| hash_bytes(black_box(long.as_bytes()))));

    let mut group = c.benchmark_group("intern");
    for count in [100, 1_000, 10_000] {
        let input = words(count);
        group.bench_with_input(BenchmarkId::new("copy_twice", count), &input, |b, input| {
            b.iter(|| intern_twice(black_box(input)))
        });
        group.bench_with_input(BenchmarkId::new("transfer", count), &input, |b, input| {
            b.iter(|| intern_transfer(black_box(input)))
        });
    }
    group.finish();

    let input = words(1_000);
    let mut runtime = Runtime::new();
    c.bench_function("concatenate", |b| {
        b.iter(|| concatenate(&mut runtime, black_box(&input)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

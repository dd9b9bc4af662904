use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skippy::expand::substitute;
use skippy::VarStore;

fn make_vars(n: usize) -> VarStore {
    let mut vars = VarStore::new();
    for i in 0..n {
        vars.set(format!("Var{i}"), format!("{}", i * 7));
    }
    vars.set("Channel", "3");
    vars
}

fn make_command(refs: usize) -> String {
    (0..refs)
        .map(|i| format!("SOUR$Channel:VOLT $Var{i}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn bench_substitute(c: &mut Criterion) {
    let vars_small = make_vars(10);
    let vars_large = make_vars(1000);
    let plain = "MEAS:VOLT:DC? (@101:110)";
    let short = make_command(2);
    let long = make_command(200);

    let mut g = c.benchmark_group("substitute");

    g.bench_function("no_references", |b| {
        b.iter(|| substitute(black_box(plain), black_box(&vars_small)))
    });
    g.bench_function("short_small_store", |b| {
        b.iter(|| substitute(black_box(&short), black_box(&vars_small)))
    });
    g.bench_function("short_large_store", |b| {
        b.iter(|| substitute(black_box(&short), black_box(&vars_large)))
    });
    g.bench_function("long_large_store", |b| {
        b.iter(|| substitute(black_box(&long), black_box(&vars_large)))
    });

    g.finish();
}

criterion_group!(benches, bench_substitute);
criterion_main!(benches);

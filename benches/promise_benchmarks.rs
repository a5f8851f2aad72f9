use criterion::{Criterion, criterion_group, criterion_main};
use smart_promise::{Promise, Reason, Resolution, SmartPromise, run_event_loop};
use std::hint::black_box;

// cargo bench --profile dev

// Initialize logger for benchmark so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

fn benchmark_promise_operations(c: &mut Criterion) {
    // Benchmark basic promise creation and resolution
    c.bench_function("smart_promise_basic_resolution", |b| {
        b.iter(|| {
            let promise = SmartPromise::new(|res, _rej| res.resolve(42));
            promise.then(|v| {
                black_box(v * 2);
            });
            run_event_loop();
            black_box(promise.value())
        })
    });

    // Benchmark settlement from outside the executor
    c.bench_function("smart_promise_external_settlement", |b| {
        b.iter(|| {
            let promise = SmartPromise::pending();
            promise.resolve(black_box(42));
            black_box((promise.is_fulfilled(), promise.value()))
        })
    });

    // Benchmark continuation dispatch through the event loop
    c.bench_function("promise_continuation_dispatch", |b| {
        b.iter(|| {
            let promise = Promise::pending();
            for _ in 0..4 {
                promise.then(|v| {
                    black_box(v + 1);
                });
            }
            promise.resolve(1);
            black_box(run_event_loop())
        })
    });

    // Benchmark promise rejection and catch
    c.bench_function("promise_rejection_catch", |b| {
        b.iter(|| {
            let promise: Promise<i32> = Promise::pending();
            promise.catch(|err| {
                black_box(err);
            });
            promise.reject(Reason::new("error"));
            black_box(run_event_loop())
        })
    });

    // Benchmark adoption of a nested deferred
    c.bench_function("smart_promise_nested_adoption", |b| {
        b.iter(|| {
            let promise = SmartPromise::pending();
            let nested: Promise<i32> = Promise::pending();
            promise.resolve(Resolution::Deferred(nested.clone()));
            nested.resolve(black_box(5));
            run_event_loop();
            black_box(promise.value())
        })
    });
}

criterion_group!(benches, benchmark_promise_operations);
criterion_main!(benches);

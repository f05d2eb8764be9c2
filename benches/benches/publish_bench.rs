use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use evbus::{Publisher, PublisherConfig, Subscriber};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn publisher(
    rt: &Runtime,
    capacity: usize,
) -> Publisher<u64> {
    let cfg = PublisherConfig::default()
        .with_name("bench")
        .with_channel_capacity(capacity);
    Publisher::with_runtime(rt.handle().clone(), cfg).unwrap()
}

/// Публикация с ожиданием завершения всех доставок.
fn bench_publish_and_wait(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("publish_and_wait");

    for subs in [1usize, 10, 100] {
        let publisher = publisher(&rt, 1);
        let _subs: Vec<Subscriber<u64>> = (0..subs)
            .map(|_| {
                Subscriber::new(&publisher, |m| {
                    black_box(m);
                })
            })
            .collect();

        group.throughput(Throughput::Elements(subs as u64));
        group.bench_with_input(BenchmarkId::from_parameter(subs), &subs, |b, _| {
            b.iter(|| {
                publisher.publish(black_box(42));
                rt.block_on(publisher.wait());
            })
        });
    }
    group.finish();
}

/// Пакет из 100 публикаций подряд, затем одно ожидание. Сравнивает
/// ёмкость канала 1 и 64.
fn bench_publish_burst(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("publish_burst_100");

    for capacity in [1usize, 64] {
        let publisher = publisher(&rt, capacity);
        let _subs: Vec<Subscriber<u64>> = (0..10)
            .map(|_| {
                Subscriber::new(&publisher, |m| {
                    black_box(m);
                })
            })
            .collect();

        group.throughput(Throughput::Elements(100 * 10));
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, _| {
                b.iter(|| {
                    for i in 0..100 {
                        publisher.publish(black_box(i));
                    }
                    rt.block_on(publisher.wait());
                })
            },
        );
    }
    group.finish();
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let rt = runtime();
    let publisher = publisher(&rt, 1);

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let sub = Subscriber::new(&publisher, |m: u64| {
                black_box(m);
            });
            black_box(sub.id());
            sub.unsubscribe();
        })
    });
}

fn bench_publish_no_subscribers(c: &mut Criterion) {
    let rt = runtime();
    let publisher = publisher(&rt, 1);

    c.bench_function("publish_0_subs", |b| {
        b.iter(|| publisher.publish(black_box(1)))
    });
}

criterion_group!(
    benches,
    bench_publish_and_wait,
    bench_publish_burst,
    bench_subscribe_unsubscribe,
    bench_publish_no_subscribers
);
criterion_main!(benches);

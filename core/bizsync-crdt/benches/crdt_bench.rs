use bizsync_crdt::{Crdt, LWWRegister, ORSet, PNCounter, VectorClock};
use bizsync_types::{HybridTimestamp, NodeId};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn node(n: usize) -> NodeId {
    NodeId::parse(&format!("node-{n}")).unwrap()
}

fn bench_orset(c: &mut Criterion) {
    let mut a = ORSet::new();
    let mut b = ORSet::new();
    for i in 0..1_000 {
        a.add(format!("skill-{i}"), HybridTimestamp::new(i, 0, node(0)));
        b.add(format!("skill-{}", i + 500), HybridTimestamp::new(i, 0, node(1)));
        if i % 4 == 0 {
            b.remove(&format!("skill-{}", i + 500));
        }
    }

    c.bench_function("orset_merge_1000", |bench| {
        bench.iter(|| black_box(a.merged(black_box(&b))));
    });
    c.bench_function("orset_to_json_1000", |bench| {
        bench.iter(|| black_box(a.to_json()));
    });
}

fn bench_counter(c: &mut Criterion) {
    let replicas: Vec<PNCounter> = (0..50)
        .map(|n| {
            let mut counter = PNCounter::new(node(n));
            counter.increment(n as u64 * 3);
            counter.decrement(n as u64);
            counter
        })
        .collect();

    c.bench_function("pn_counter_merge_50_nodes", |bench| {
        bench.iter(|| {
            let mut acc = PNCounter::new(node(999));
            for r in &replicas {
                acc.merge_with(r);
            }
            black_box(acc.value())
        });
    });
}

fn bench_clock_and_register(c: &mut Criterion) {
    let mut a = VectorClock::new(node(0));
    let mut b = VectorClock::new(node(1));
    for n in 0..50 {
        a.rebind(node(n));
        a.tick();
        b.rebind(node(n + 25));
        b.tick();
    }

    c.bench_function("vector_clock_compare_75_nodes", |bench| {
        bench.iter(|| black_box(a.compare(black_box(&b))));
    });

    let r1 = LWWRegister::new("Alice".to_string(), HybridTimestamp::new(10, 0, node(0)));
    let r2 = LWWRegister::new("Alice Tan".to_string(), HybridTimestamp::new(10, 0, node(0)));
    c.bench_function("lww_merge_exact_tie", |bench| {
        bench.iter(|| black_box(r1.merged(black_box(&r2))));
    });
}

criterion_group!(benches, bench_orset, bench_counter, bench_clock_and_register);
criterion_main!(benches);

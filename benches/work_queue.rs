use std::sync::Arc;

use convoy::adapters::sqlite::{create_migrated_test_pool, SqliteWorkItemRepository};
use convoy::domain::models::{WorkPriority, WorkQueueConfig};
use convoy::services::{RetryPolicy, SlingRequest, WorkQueue};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

type Queue = WorkQueue<SqliteWorkItemRepository>;

async fn queue_with(items: usize) -> Queue {
    let pool = create_migrated_test_pool().await.expect("test pool");
    let queue = WorkQueue::new(
        Arc::new(SqliteWorkItemRepository::new(pool)),
        WorkQueueConfig::default(),
        RetryPolicy::immediate(3),
    );
    let priorities = [WorkPriority::Urgent, WorkPriority::High, WorkPriority::Normal, WorkPriority::Low];
    for n in 0..items {
        queue
            .sling(SlingRequest::new("bench", "job", n.to_string()).with_priority(priorities[n % 4]))
            .await
            .expect("sling");
    }
    queue
}

fn bench_sling(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let queue = rt.block_on(queue_with(0));
    let queue = &queue;

    c.bench_function("sling", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(
                queue
                    .sling(SlingRequest::new("bench", "job", "ref").with_priority(WorkPriority::High))
                    .await
                    .expect("sling"),
            )
        });
    });
}

fn bench_peek(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("peek");

    for depth in [10, 100, 1_000] {
        let queue = rt.block_on(queue_with(depth));
        let queue = &queue;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.to_async(&rt)
                .iter(|| async move { black_box(queue.peek("bench", Some(10)).await.expect("peek")) });
        });
    }
    group.finish();
}

fn bench_claim_cycle(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let queue = rt.block_on(queue_with(100));
    let queue = &queue;

    c.bench_function("sling_claim_complete", |b| {
        b.to_async(&rt).iter(|| async move {
            let id = queue.sling(SlingRequest::new("bench", "job", "cycle")).await.expect("sling");
            let won = queue.claim("bench", id).await.expect("claim");
            queue.complete("bench", id, None).await.expect("complete");
            black_box(won)
        });
    });
}

criterion_group!(benches, bench_sling, bench_peek, bench_claim_cycle);
criterion_main!(benches);

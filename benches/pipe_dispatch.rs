// benches/pipe_dispatch.rs
use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use middleware_pipe::context::PipeContext;
use middleware_pipe::error::PipeResult;
use middleware_pipe::observer::{FilterObserver, ObservedFilter};
use middleware_pipe::pipe::{BoxFuture, Filter, NextFilter, Pipe};
use middleware_pipe::probe::ProbeSink;

struct NoOpFilter;

impl Filter<PipeContext, &'static str> for NoOpFilter {
    fn send<'a>(
        &'a self,
        ctx: PipeContext,
        next: &'a dyn NextFilter<PipeContext, &'static str>,
    ) -> BoxFuture<'a, PipeResult<(), &'static str>> {
        Box::pin(async move { next.send(ctx).await })
    }

    fn probe(&self, sink: &mut ProbeSink) {
        sink.push_child(ProbeSink::new("NoOpFilter"));
    }
}

fn build_pipe(depth: usize) -> Pipe<PipeContext, &'static str> {
    let mut builder = Pipe::builder();
    for _ in 0..depth {
        builder = builder.append_filter(Arc::new(NoOpFilter));
    }
    builder.build().unwrap()
}

// Dispatching through the chain versus calling a bare async fn the
// same number of times directly, to see the cost of the `Node`
// indirection and the per-call boxed future.
fn bench_pipe_dispatch_depth(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    for depth in [1usize, 4, 16] {
        let pipe = build_pipe(depth);
        c.bench_function(&format!("pipe_dispatch_depth_{depth}"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(pipe.send(PipeContext::new()).await).unwrap();
                })
            })
        });
    }
}

async fn noop_step(ctx: PipeContext) -> PipeContext {
    black_box(&ctx);
    ctx
}

async fn direct_chain(depth: usize, mut ctx: PipeContext) {
    for _ in 0..depth {
        ctx = noop_step(ctx).await;
    }
}

// The same depth of async hops as `bench_pipe_dispatch_depth`, but as
// plain function calls instead of going through `Pipe`/`Node`/`Arc<dyn
// Filter>` dispatch — isolates the framework's dispatch overhead.
fn bench_direct_call_baseline(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    for depth in [1usize, 4, 16] {
        c.bench_function(&format!("direct_call_baseline_depth_{depth}"), |b| {
            b.iter(|| rt.block_on(direct_chain(depth, PipeContext::new())))
        });
    }
}

struct CountingObserver(std::sync::atomic::AtomicU32);

impl FilterObserver<PipeContext, &'static str> for CountingObserver {
    fn post_send<'a>(&'a self, _ctx: &'a PipeContext) -> BoxFuture<'a, PipeResult<(), &'static str>> {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }
}

// Compares a bare filter against the same filter wrapped in
// `ObservedFilter` with a single registered observer, to measure the
// overhead `Connectable::for_each_async` adds per send.
fn bench_observed_vs_bare_filter(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let bare: Pipe<PipeContext, &'static str> =
        Pipe::builder().append_filter(Arc::new(NoOpFilter)).build().unwrap();
    c.bench_function("bare_filter_send", |b| {
        b.iter(|| {
            rt.block_on(async { black_box(bare.send(PipeContext::new()).await).unwrap() })
        })
    });

    let observed = ObservedFilter::new(NoOpFilter);
    let _handle = observed.observe(Arc::new(CountingObserver(std::sync::atomic::AtomicU32::new(0))));
    let pipe: Pipe<PipeContext, &'static str> =
        Pipe::builder().append_filter(Arc::new(observed)).build().unwrap();
    c.bench_function("observed_filter_send_one_observer", |b| {
        b.iter(|| rt.block_on(async { black_box(pipe.send(PipeContext::new()).await).unwrap() }))
    });
}

criterion_group!(
    benches,
    bench_pipe_dispatch_depth,
    bench_direct_call_baseline,
    bench_observed_vs_bare_filter
);
criterion_main!(benches);

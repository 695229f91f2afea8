//! End-to-end retry scenarios (spec.md §8, scenarios 1–3).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use middleware_pipe::builder::{ExceptionConfigurator, RetryConfigurator};
use middleware_pipe::context::PipeContext;
use middleware_pipe::error::{PipeError, PipeResult};
use middleware_pipe::exception_filter::TypeSet;
use middleware_pipe::pipe::{BoxFuture, Filter, NextFilter, Pipe};
use middleware_pipe::probe::ProbeSink;
use middleware_pipe::retry::RetryFilter;

#[derive(Debug, Clone)]
struct TypeA;
#[derive(Debug, Clone)]
struct TypeB;

#[derive(Debug, Clone)]
enum DemoError {
    A(TypeA),
    B(TypeB),
}

struct FailNTimesThenOk {
    remaining: AtomicU32,
    attempts: Mutex<Vec<Instant>>,
    error: fn() -> DemoError,
}

impl NextFilter<PipeContext, DemoError> for FailNTimesThenOk {
    fn send<'a>(&'a self, _ctx: PipeContext) -> BoxFuture<'a, PipeResult<(), DemoError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(Instant::now());
            let remaining =
                self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    if n == 0 {
                        None
                    } else {
                        Some(n - 1)
                    }
                });
            match remaining {
                Ok(_) => Err(PipeError::Pipeline((self.error)())),
                Err(_) => Ok(()),
            }
        })
    }
}

fn real_sleep() -> middleware_pipe::retry::filter::SleepFn {
    Arc::new(|delay: Duration| -> BoxFuture<'static, ()> { Box::pin(tokio::time::sleep(delay)) })
}

/// Scenario 1: Interval(100ms, 200ms, 400ms); downstream fails twice
/// then succeeds; expect 2 retries, wall time >= 300ms (100 + 200),
/// final success, 2 prior exceptions recorded via the attempt trace.
#[tokio::test]
async fn interval_retry_success() {
    let policy = RetryConfigurator::new()
        .intervals_ms([100, 200, 400])
        .build();
    let filter: RetryFilter<DemoError> =
        RetryFilter::new(policy, ExceptionConfigurator::new().all().build(), real_sleep());

    let downstream =
        FailNTimesThenOk { remaining: AtomicU32::new(2), attempts: Mutex::new(Vec::new()), error: || DemoError::A(TypeA) };

    let start = Instant::now();
    let result = filter.send(PipeContext::new(), &downstream).await;
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    assert_eq!(downstream.attempts.lock().unwrap().len(), 3);
    assert!(elapsed >= Duration::from_millis(300), "elapsed was {elapsed:?}");
}

/// Scenario 2: Selected(TypeA) exception filter; downstream throws
/// TypeB-shaped errors; expect no retry, raised error is the original
/// TypeB failure, only one attempt made.
#[tokio::test]
async fn exception_filter_excludes_unselected_type() {
    let policy = RetryConfigurator::new().immediate(5).build();
    let exception_filter = ExceptionConfigurator::<DemoError>::new()
        .filter(|e: &DemoError| matches!(e, DemoError::A(_)))
        .build();
    let filter = RetryFilter::new(policy, exception_filter, real_sleep());

    let downstream =
        FailNTimesThenOk { remaining: AtomicU32::new(10), attempts: Mutex::new(Vec::new()), error: || DemoError::B(TypeB) };

    let result = filter.send(PipeContext::new(), &downstream).await;
    assert!(matches!(result, Err(PipeError::Pipeline(DemoError::B(_)))));
    assert_eq!(downstream.attempts.lock().unwrap().len(), 1);
}

/// Scenario 3: Exponential(limit=5, min=1s, max=10s, delta=1s) yields
/// the delay schedule [1, 1, 3, 7, 10] seconds.
#[test]
fn exponential_delay_schedule_matches_spec() {
    let policy = RetryConfigurator::new()
        .exponential(5, Duration::from_secs(1), Duration::from_secs(10), Duration::from_secs(1))
        .build();
    let expected = [1u64, 1, 3, 7, 10];
    for (attempt, secs) in expected.into_iter().enumerate() {
        assert_eq!(policy.delay(attempt as u32), Duration::from_secs(secs));
    }
}

/// A rejecting `TypeSet`-based `Selected` filter (the non-closure path
/// through `ExceptionConfigurator`) excludes an error whose type id is
/// absent from the set, exercising the same classification spec.md
/// §4.5 describes without going through a hand-written predicate.
#[tokio::test]
async fn selected_type_set_excludes_absent_type() {
    let policy = RetryConfigurator::new().immediate(5).build();
    let exception_filter = ExceptionConfigurator::<DemoError>::new()
        .selected(TypeSet::new().insert::<TypeA>())
        .build();
    // DemoError itself is the type carried by the filter (E = DemoError),
    // so Selected<TypeA> never matches a DemoError value — it always
    // rejects, regardless of which variant is inside.
    let filter = RetryFilter::new(policy, exception_filter, real_sleep());
    let downstream =
        FailNTimesThenOk { remaining: AtomicU32::new(10), attempts: Mutex::new(Vec::new()), error: || DemoError::A(TypeA) };

    let result = filter.send(PipeContext::new(), &downstream).await;
    assert!(matches!(result, Err(PipeError::Pipeline(DemoError::A(_)))));
    assert_eq!(downstream.attempts.lock().unwrap().len(), 1);
}

/// A pipe built with a retry filter followed by the actual unit of
/// work exercises the full `Pipe::send` path, not just a bare filter.
#[tokio::test]
async fn pipe_with_retry_filter_reaches_downstream_work() {
    struct RecordWork(Arc<std::sync::atomic::AtomicU32>);
    impl Filter<PipeContext, DemoError> for RecordWork {
        fn send<'a>(
            &'a self,
            ctx: PipeContext,
            next: &'a dyn NextFilter<PipeContext, DemoError>,
        ) -> BoxFuture<'a, PipeResult<(), DemoError>> {
            Box::pin(async move {
                self.0.fetch_add(1, Ordering::SeqCst);
                next.send(ctx).await
            })
        }
        fn probe(&self, sink: &mut ProbeSink) {
            sink.push_child(ProbeSink::new("RecordWork"));
        }
    }

    let calls = Arc::new(AtomicU32::new(0));
    let policy = RetryConfigurator::new().immediate(2).build();
    let retry: RetryFilter<DemoError> =
        RetryFilter::new(policy, ExceptionConfigurator::new().all().build(), real_sleep());

    let pipe: Pipe<PipeContext, DemoError> = Pipe::builder()
        .append_filter(Arc::new(retry))
        .append_filter(Arc::new(RecordWork(calls.clone())))
        .build()
        .unwrap();

    let result = pipe.send(PipeContext::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

//! Tests for the periodic scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::time::Instant;

use super::*;
use crate::fake_api::{Call, FakeApi};

fn is_last_execution(call: &Call) -> bool {
    matches!(call, Call::LastExecution { .. })
}

/// Job that records when it ran and fails on the listed run numbers.
fn recording_job(
    runs: Arc<Mutex<Vec<Instant>>>,
    failing: &'static [usize],
) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
    move || {
        let runs = runs.clone();
        Box::pin(async move {
            let run = {
                let mut runs = runs.lock().unwrap();
                runs.push(Instant::now());
                runs.len()
            };
            if failing.contains(&run) {
                anyhow::bail!("collection {run} failed");
            }
            Ok(())
        })
    }
}

// -- Cadence --

#[tokio::test(start_paused = true)]
async fn runs_immediately_then_every_period() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let scheduler = PeriodicScheduler::new("collect", Duration::from_secs(60), recording_job(runs.clone(), &[]));
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(150)).await;
    cancel.cancel();
    task.await.unwrap();

    let runs = runs.lock().unwrap().clone();
    assert_eq!(runs.len(), 3);
    assert!(runs[1] - runs[0] >= Duration::from_secs(60));
    assert!(runs[2] - runs[1] >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn period_starts_after_the_run_returns() {
    let starts = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let recorded = starts.clone();
    let scheduler = PeriodicScheduler::new("slow", Duration::from_secs(10), move || {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push(Instant::now());
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    });
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(20)).await;
    cancel.cancel();
    task.await.unwrap();

    let starts = starts.lock().unwrap().clone();
    assert!(starts.len() >= 2);
    assert!(starts[1] - starts[0] >= Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn failures_do_not_stop_the_schedule() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let scheduler = PeriodicScheduler::new("flaky", Duration::from_secs(1), recording_job(runs.clone(), &[1, 2]));
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_millis(3500)).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(runs.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_the_wait() {
    let count = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let counter = count.clone();
    let scheduler = PeriodicScheduler::new("once", Duration::from_secs(3600), move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_millis(10)).await;
    let started = Instant::now();
    cancel.cancel();
    task.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

// -- Last execution --

#[tokio::test(start_paused = true)]
async fn reports_last_execution_only_after_success() {
    let api = Arc::new(FakeApi::default());
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let scheduler = PeriodicScheduler::new("collect", Duration::from_secs(1), recording_job(runs.clone(), &[2]))
        .report_to(api.clone(), "collector-1");
    let mut last = scheduler.last_execution();
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(runs.lock().unwrap().len(), 3);
    assert_eq!(api.count(is_last_execution), 2);
    assert!(last.borrow_and_update().is_some());

    for call in api.calls() {
        if let Call::LastExecution { collector_id, .. } = call {
            assert_eq!(collector_id, "collector-1");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn reporting_failure_is_swallowed() {
    let api = Arc::new(FakeApi {
        fail_last_execution: true,
        ..FakeApi::default()
    });
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let scheduler = PeriodicScheduler::new("collect", Duration::from_secs(1), recording_job(runs.clone(), &[]))
        .report_to(api.clone(), "collector-1");
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(runs.lock().unwrap().len(), 2);
    assert_eq!(api.count(is_last_execution), 2);
}

#[tokio::test(start_paused = true)]
async fn no_last_execution_before_first_success() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let scheduler = PeriodicScheduler::new("collect", Duration::from_secs(60), recording_job(runs.clone(), &[1]));
    let last = scheduler.last_execution();
    let task = scheduler.spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(last.borrow().is_none());
    cancel.cancel();
    task.await.unwrap();
}

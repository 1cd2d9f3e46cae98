//! Bounded-concurrency execution of upstream fetch tasks.

use color_eyre::Result;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run `tasks` with at most `max_concurrent` futures in flight.
///
/// Results are collected in **completion order**, not input order. Callers
/// must not zip the output with the input by index; use
/// [`run_all_ordered`] when index correspondence matters.
///
/// The first task failure fails the whole call. Results of tasks that
/// already finished are discarded, and queued tasks are never started.
pub async fn run_all<T, F, Fut>(tasks: Vec<F>, max_concurrent: usize) -> Result<Vec<T>>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  stream::iter(tasks)
    .map(|task| task())
    .buffer_unordered(max_concurrent.max(1))
    .try_collect()
    .await
}

/// Like [`run_all`], but `result[i]` corresponds to `tasks[i]`.
///
/// Slightly less throughput than [`run_all`] because a slow task holds up
/// delivery of everything behind it, though the concurrency bound is
/// still fully used.
pub async fn run_all_ordered<T, F, Fut>(tasks: Vec<F>, max_concurrent: usize) -> Result<Vec<T>>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  stream::iter(tasks)
    .map(|task| task())
    .buffered(max_concurrent.max(1))
    .try_collect()
    .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  /// Tracks how many tasks are in flight and the highest count seen.
  struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
  }

  impl Gauge {
    fn new() -> Arc<Self> {
      Arc::new(Self {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
      })
    }

    fn enter(&self) {
      let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
      self.current.fetch_sub(1, Ordering::SeqCst);
    }
  }

  #[tokio::test]
  async fn test_concurrency_bound_is_respected() {
    let gauge = Gauge::new();

    let tasks: Vec<_> = (0..10)
      .map(|i| {
        let gauge = gauge.clone();
        move || async move {
          gauge.enter();
          tokio::time::sleep(Duration::from_millis(10)).await;
          gauge.exit();
          Ok::<_, color_eyre::Report>(i)
        }
      })
      .collect();

    let results = run_all(tasks, 3).await.unwrap();
    assert_eq!(results.len(), 10);
    assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
  }

  #[tokio::test]
  async fn test_results_arrive_in_completion_order() {
    // Task 0 sleeps longest, so with enough concurrency it finishes last.
    let tasks: Vec<_> = (0..4u64)
      .map(|i| {
        move || async move {
          tokio::time::sleep(Duration::from_millis(160 - i * 40)).await;
          Ok::<_, color_eyre::Report>(i)
        }
      })
      .collect();

    let results = run_all(tasks, 4).await.unwrap();
    assert_eq!(results, vec![3, 2, 1, 0]);
  }

  #[tokio::test]
  async fn test_ordered_variant_preserves_input_order() {
    let tasks: Vec<_> = (0..4u64)
      .map(|i| {
        move || async move {
          tokio::time::sleep(Duration::from_millis(160 - i * 40)).await;
          Ok::<_, color_eyre::Report>(i)
        }
      })
      .collect();

    let results = run_all_ordered(tasks, 4).await.unwrap();
    assert_eq!(results, vec![0, 1, 2, 3]);
  }

  #[tokio::test]
  async fn test_single_failure_fails_the_call() {
    let tasks: Vec<_> = (0..5)
      .map(|i| {
        move || async move {
          if i == 2 {
            Err(eyre!("task {} failed", i))
          } else {
            Ok(i)
          }
        }
      })
      .collect();

    let result = run_all(tasks, 2).await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_zero_max_concurrent_still_runs() {
    let tasks: Vec<_> = (0..3)
      .map(|i| move || async move { Ok::<_, color_eyre::Report>(i) })
      .collect();

    let results = run_all(tasks, 0).await.unwrap();
    assert_eq!(results.len(), 3);
  }

  #[tokio::test]
  async fn test_empty_task_list() {
    let tasks: Vec<fn() -> std::future::Ready<Result<i32>>> = Vec::new();
    let results = run_all(tasks, 3).await.unwrap();
    assert!(results.is_empty());
  }
}

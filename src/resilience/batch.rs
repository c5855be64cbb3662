//! Concurrency-bounded batch fetching.
//!
//! # Algorithm
//! ```text
//! ids → drop deny-listed ids (counted, not returned)
//!     → split into chunks of `concurrency_limit`, order preserved
//!     → for each chunk, strictly one after another:
//!         spawn fetch_one(id) for every id in the chunk
//!         race join(all) against `batch_timeout`
//!         timer wins → unresolved ids become None
//!     → concatenate chunk results
//! ```
//!
//! # Design Decisions
//! - At most `concurrency_limit` calls are outstanding from one invocation
//! - Item failures become None and never affect siblings
//! - Abandoned calls keep running in the background unless
//!   `abort_on_timeout` is set; their late results are discarded

use futures_util::future::join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::observability::metrics;
use crate::upstream::types::UpstreamResult;

/// Ids excluded up front because of known pathological upstream behavior.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    ids: HashSet<String>,
}

impl DenyList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// Result of one `fetch_all` invocation.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// One slot per non-filtered id, in input order.
    pub results: Vec<Option<T>>,
    /// Ids dropped by the deny-list.
    pub filtered: usize,
    /// Ids left unresolved when their chunk deadline fired.
    pub timed_out: usize,
}

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    concurrency_limit: usize,
    batch_timeout: Duration,
    deny_list: DenyList,
    abort_on_timeout: bool,
}

impl BatchOrchestrator {
    pub fn new(concurrency_limit: usize, batch_timeout: Duration, deny_list: DenyList) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
            batch_timeout,
            deny_list,
            abort_on_timeout: false,
        }
    }

    /// Abort abandoned calls instead of letting them run to completion.
    pub fn with_abort_on_timeout(mut self, abort: bool) -> Self {
        self.abort_on_timeout = abort;
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }

    pub async fn fetch_all<T, F, Fut>(&self, ids: &[String], fetch_one: F) -> BatchOutcome<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = UpstreamResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let allowed: Vec<&String> = ids.iter().filter(|id| !self.deny_list.contains(id)).collect();
        let filtered = ids.len() - allowed.len();
        if filtered > 0 {
            tracing::debug!(filtered, "Skipping deny-listed ids");
        }

        let mut results = Vec::with_capacity(allowed.len());
        let mut timed_out = 0;

        for (chunk_index, chunk) in allowed.chunks(self.concurrency_limit).enumerate() {
            let slots: Arc<Mutex<Vec<Option<T>>>> =
                Arc::new(Mutex::new(chunk.iter().map(|_| None).collect()));

            let handles: Vec<_> = chunk
                .iter()
                .enumerate()
                .map(|(slot, id)| {
                    let call = fetch_one((*id).clone());
                    let slots = slots.clone();
                    let id = (*id).clone();
                    tokio::spawn(async move {
                        match call.await {
                            Ok(value) => {
                                if let Some(entry) = lock(&slots).get_mut(slot) {
                                    *entry = Some(value);
                                }
                            }
                            Err(e) => {
                                tracing::warn!(id = %id, error = %e, "Failed to fetch item");
                            }
                        }
                    })
                })
                .collect();
            let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

            match tokio::time::timeout(self.batch_timeout, join_all(handles)).await {
                Ok(joined) => {
                    for err in joined.into_iter().filter_map(Result::err) {
                        tracing::warn!(error = %err, "Fetch task did not complete");
                    }
                }
                Err(_) => {
                    let unresolved: Vec<_> = abort_handles.iter().filter(|h| !h.is_finished()).collect();
                    timed_out += unresolved.len();

                    tracing::warn!(
                        chunk = chunk_index,
                        unresolved = unresolved.len(),
                        timeout_ms = self.batch_timeout.as_millis() as u64,
                        "Batch deadline exceeded"
                    );

                    if self.abort_on_timeout {
                        for handle in unresolved {
                            handle.abort();
                        }
                    }
                }
            }

            // Late writers find an already-taken slot; their result is dropped.
            results.extend(lock(&slots).iter_mut().map(Option::take));
        }

        metrics::record_batch(filtered, timed_out);

        BatchOutcome {
            results,
            filtered,
            timed_out,
        }
    }
}

fn lock<T>(slots: &Mutex<T>) -> MutexGuard<'_, T> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::types::UpstreamError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_run_sequentially_and_preserve_order() {
        let orchestrator = BatchOrchestrator::new(2, Duration::from_secs(5), DenyList::default());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let origin = Instant::now();

        let outcome = orchestrator
            .fetch_all(&ids(&["a", "b", "c", "d", "e"]), |id| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                let starts = starts.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    starts.lock().unwrap().push((id.clone(), origin.elapsed().as_millis()));
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(id.to_uppercase())
                }
            })
            .await;

        let values: Vec<_> = outcome.results.into_iter().map(Option::unwrap).collect();
        assert_eq!(values, ["A", "B", "C", "D", "E"]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.filtered, 0);
        assert_eq!(outcome.timed_out, 0);

        // Each chunk starts only once the previous one (10ms per call) has resolved.
        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        let chunk_of = |ms: u128| ms / 10;
        let observed: Vec<_> = starts.iter().map(|(id, ms)| (id.as_str(), chunk_of(*ms))).collect();
        assert_eq!(observed, [("a", 0), ("b", 0), ("c", 1), ("d", 1), ("e", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_failure_becomes_gap() {
        let orchestrator = BatchOrchestrator::new(3, Duration::from_secs(5), DenyList::default());

        let outcome = orchestrator
            .fetch_all(&ids(&["1", "2", "3"]), |id| async move {
                if id == "2" {
                    Err(UpstreamError::NotFound(id))
                } else {
                    Ok(id)
                }
            })
            .await;

        assert_eq!(outcome.results, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deny_listed_ids_are_omitted() {
        let orchestrator = BatchOrchestrator::new(2, Duration::from_secs(5), DenyList::new(["10000"]));
        let called = Arc::new(Mutex::new(Vec::new()));
        let c = called.clone();

        let outcome = orchestrator
            .fetch_all(&ids(&["2", "10000", "3"]), move |id| {
                c.lock().unwrap().push(id.clone());
                async move { Ok(id) }
            })
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.filtered, 1);
        assert_eq!(*called.lock().unwrap(), ["2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_deadline_nulls_unresolved_and_abandons() {
        let orchestrator = BatchOrchestrator::new(2, Duration::from_millis(100), DenyList::default());
        let slow_finished = Arc::new(AtomicBool::new(false));
        let sf = slow_finished.clone();
        let start = Instant::now();

        let outcome = orchestrator
            .fetch_all(&ids(&["fast", "slow", "next"]), move |id| {
                let sf = sf.clone();
                async move {
                    if id == "slow" {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        sf.store(true, Ordering::SeqCst);
                    }
                    Ok(id)
                }
            })
            .await;

        assert_eq!(
            outcome.results,
            vec![Some("fast".to_string()), None, Some("next".to_string())]
        );
        assert_eq!(outcome.timed_out, 1);
        assert!(start.elapsed() < Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(slow_finished.load(Ordering::SeqCst), "abandoned call runs to completion");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_on_timeout_cancels_abandoned_calls() {
        let orchestrator = BatchOrchestrator::new(2, Duration::from_millis(100), DenyList::default())
            .with_abort_on_timeout(true);
        let slow_finished = Arc::new(AtomicBool::new(false));
        let sf = slow_finished.clone();

        let outcome = orchestrator
            .fetch_all(&ids(&["slow"]), move |id| {
                let sf = sf.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    sf.store(true, Ordering::SeqCst);
                    Ok(id)
                }
            })
            .await;

        assert_eq!(outcome.results, vec![None]);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!slow_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let orchestrator = BatchOrchestrator::new(0, Duration::from_millis(100), DenyList::new(["x"]));
        assert_eq!(orchestrator.concurrency_limit(), 1);

        let outcome = orchestrator
            .fetch_all(&ids(&["x"]), |id| async move { Ok(id) })
            .await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.filtered, 1);
    }
}

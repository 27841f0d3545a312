#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use futures::FutureExt;
use tokio::task;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::models::RawResponse;

const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

pub type RequestHandle = JoinHandle<Result<RawResponse>>;
pub type Completion = Box<dyn FnOnce(Result<RawResponse>) + Send>;

/// An in-flight request and the callback waiting for it. The callback takes
/// ownership of the response, so it can never outlive the data it reads.
pub struct PendingRequest {
    handle: RequestHandle,
    on_complete: Completion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was queued.
    Idle,
    /// The head request was still running and went to the back of the queue.
    Requeued,
    /// The head request had finished and its callback ran.
    Completed,
}

/// Round-robin completion tracking for requests running on the runtime.
/// Clones share the same queue, which lets callbacks enqueue follow-ups.
#[derive(Clone, Default)]
pub struct RequestScheduler {
    queue: Arc<Mutex<VecDeque<PendingRequest>>>,
}

impl RequestScheduler {
    fn queue(&self) -> MutexGuard<'_, VecDeque<PendingRequest>> {
        return self.queue.lock().unwrap_or_else(PoisonError::into_inner);
    }

    pub fn enqueue<F>(&self, handle: RequestHandle, on_complete: F)
    where
        F: FnOnce(Result<RawResponse>) + Send + 'static,
    {
        self.queue().push_back(PendingRequest {
            handle,
            on_complete: Box::new(on_complete),
        });
    }

    pub fn len(&self) -> usize {
        return self.queue().len();
    }

    pub fn is_empty(&self) -> bool {
        return self.queue().is_empty();
    }

    /// Advances the queue by exactly one entry. Meant to be called once per
    /// host step; the lock is never held while a callback runs.
    pub fn tick(&self) -> TickOutcome {
        let pending = self.queue().pop_front();
        let pending = match pending {
            Some(pending) => pending,
            None => return TickOutcome::Idle,
        };

        if !pending.handle.is_finished() {
            self.queue().push_back(pending);
            return TickOutcome::Requeued;
        }

        let PendingRequest {
            mut handle,
            on_complete,
        } = pending;

        // A finished handle still reads as pending once the task's coop
        // budget is spent, so poll it outside the budget.
        let res = match task::unconstrained(&mut handle).now_or_never() {
            Some(Ok(res)) => res,
            Some(Err(err)) if err.is_cancelled() => Err(anyhow!("Request was cancelled")),
            Some(Err(err)) => Err(anyhow!("Request task failed: {err}")),
            None => {
                self.queue().push_back(PendingRequest {
                    handle,
                    on_complete,
                });
                return TickOutcome::Requeued;
            }
        };

        on_complete(res);
        return TickOutcome::Completed;
    }

    /// Ticks until every queued request, including ones enqueued by
    /// callbacks along the way, has completed.
    pub async fn flush(&self) {
        while !self.is_empty() {
            if self.tick() != TickOutcome::Completed {
                time::sleep(FLUSH_INTERVAL).await;
            }
        }
    }
}

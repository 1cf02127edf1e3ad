// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker/async-call primitive (spec.md §4.1, §5, REDESIGN FLAGS §9):
//! a long-lived `tokio::task` owning a private FIFO request queue,
//! alternating between draining queued calls and stepping a cooperative
//! background [`Load`]. "Parallel OS threads" becomes "one task per
//! worker"; "poll own queue" becomes a `tokio::select!` with no
//! busy-waiting.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Boxed, `Send` future, used to type-erase a worker's per-call futures.
/// Calls borrow `&'a mut L` for the duration of one job, so this carries
/// an explicit lifetime rather than `'static`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One step of a worker's cooperative background load: the sync-daemon
/// event long-poll, or a no-op for workers with nothing of their own to
/// drive between requests.
#[async_trait::async_trait]
pub trait Load: Send + 'static {
    async fn step(&mut self) -> LoadControl;
}

/// What the run loop should do after a [`Load::step`] returns.
pub enum LoadControl {
    /// There is more work queued; run another step immediately.
    Continue,
    /// Nothing to do; wait up to `Duration` or until a request arrives.
    Idle(Duration),
}

/// A worker with no background load of its own — used by processors that
/// exist purely to drain their event queue (e.g. a per-project manager).
pub struct NoLoad;

#[async_trait::async_trait]
impl Load for NoLoad {
    async fn step(&mut self) -> LoadControl {
        LoadControl::Idle(Duration::from_secs(3600))
    }
}

/// A queued call: given a mutable borrow of the load for one job's
/// duration, returns the future that resolves it. `for<'a>` because the
/// future's captured reference lives exactly as long as the borrow the
/// run loop hands it.
trait Call<L>: Send {
    fn invoke<'a>(self: Box<Self>, load: &'a mut L) -> BoxFuture<'a, ()>;
}

struct CallOnce<F> {
    f: F,
}

impl<L, F> Call<L> for CallOnce<F>
where
    F: for<'a> FnOnce(&'a mut L) -> BoxFuture<'a, ()> + Send,
{
    fn invoke<'a>(self: Box<Self>, load: &'a mut L) -> BoxFuture<'a, ()> {
        (self.f)(load)
    }
}

type Job<L> = Box<dyn Call<L>>;

enum Request<L> {
    Call(Job<L>),
    Batch(Vec<Job<L>>),
}

/// Retry policy for a queued call (spec.md §4.1: "re-enqueued for retry
/// when its exception type is in a configured retry set until a timeout
/// elapses"). Retries run inline within the same job rather than
/// re-entering the queue, since the policy already knows which errors are
/// worth retrying and for how long.
pub struct RetryPolicy<E> {
    pub retry_if: fn(&E) -> bool,
    pub timeout: Duration,
    pub backoff: Duration,
}

// Manual impls: a derive would add a spurious `E: Clone`/`E: Copy` bound
// even though `E` only appears behind a `fn` pointer.
impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

/// Handle to a running worker's request queue (spec.md §4.1).
pub struct WorkerHandle<L> {
    tx: mpsc::Sender<Request<L>>,
    cancel: CancellationToken,
}

impl<L> Clone for WorkerHandle<L> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<L: Send + 'static> WorkerHandle<L> {
    /// Enqueue a call. `f` takes a borrow of the load and returns a
    /// boxed, pinned future (callers write `Box::pin(async move { .. })`)
    /// so the future may hold that borrow across awaits.
    pub fn call<F, T, E>(&self, f: F) -> AsyncHandle<T, E>
    where
        F: for<'a> FnOnce(&'a mut L) -> BoxFuture<'a, Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<L> = Box::new(CallOnce {
            f: move |load: &mut L| -> BoxFuture<'_, ()> {
                Box::pin(async move {
                    let _ = tx.send(f(load).await);
                })
            },
        });
        if self.tx.try_send(Request::Call(job)).is_err() {
            warn!("worker queue closed or full; caller should treat this call as dropped");
        }
        AsyncHandle::pending(rx)
    }

    /// Like [`call`](Self::call), but re-runs `f` while `policy.retry_if`
    /// matches the error and the policy's timeout has not elapsed.
    pub fn call_with_retry<F, T, E>(&self, f: F, policy: RetryPolicy<E>) -> AsyncHandle<T, E>
    where
        F: for<'a> Fn(&'a mut L) -> BoxFuture<'a, Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<L> = Box::new(CallOnce {
            f: move |load: &mut L| -> BoxFuture<'_, ()> {
                Box::pin(async move {
                    let start = Instant::now();
                    loop {
                        let result = f(load).await;
                        match &result {
                            Err(e) if (policy.retry_if)(e) && start.elapsed() < policy.timeout => {
                                tokio::time::sleep(policy.backoff).await;
                                continue;
                            }
                            _ => {
                                let _ = tx.send(result);
                                return;
                            }
                        }
                    }
                })
            },
        });
        if self.tx.try_send(Request::Call(job)).is_err() {
            warn!("worker queue closed or full; retrying call was dropped");
        }
        AsyncHandle::pending(rx)
    }

    /// Open a [`MethodBatch`] scoped to this handle (spec.md §4.1 "batch
    /// mode").
    pub fn batch(&self) -> MethodBatch<'_, L> {
        MethodBatch::new(self)
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Handle to a call's eventual result (spec.md §4.1: wait / poll / result
/// / on_complete). `T`/`E` must be `Clone` so repeated `poll()`s can hand
/// back a copy without consuming the stored result.
pub struct AsyncHandle<T, E> {
    state: Mutex<HandleState<T, E>>,
}

enum HandleState<T, E> {
    Pending(oneshot::Receiver<Result<T, E>>),
    Ready(Result<T, E>),
    Taken,
}

impl<T: Clone + Send + 'static, E: Clone + Send + 'static> AsyncHandle<T, E> {
    fn pending(rx: oneshot::Receiver<Result<T, E>>) -> Self {
        Self {
            state: Mutex::new(HandleState::Pending(rx)),
        }
    }

    /// Await completion, returning the result.
    pub async fn wait(&self) -> Result<T, E> {
        // Take the receiver out from under the lock so the guard never
        // crosses an await point.
        let rx = {
            let mut guard = self.state.lock();
            match &mut *guard {
                HandleState::Ready(r) => return r.clone(),
                HandleState::Taken => unreachable!("wait() called after the handle was consumed"),
                HandleState::Pending(_) => {
                    let HandleState::Pending(rx) =
                        std::mem::replace(&mut *guard, HandleState::Taken)
                    else {
                        unreachable!()
                    };
                    rx
                }
            }
        };
        let result = rx
            .await
            .unwrap_or_else(|_| panic!("worker dropped a call without sending a result"));
        *self.state.lock() = HandleState::Ready(result.clone());
        result
    }

    /// Non-blocking poll: `None` if still pending.
    pub fn poll(&self) -> Option<Result<T, E>> {
        let mut guard = self.state.lock();
        if let HandleState::Pending(rx) = &mut *guard {
            if let Ok(result) = rx.try_recv() {
                *guard = HandleState::Ready(result);
            }
        }
        match &*guard {
            HandleState::Ready(r) => Some(r.clone()),
            _ => None,
        }
    }
}

/// A scoped guard that queues calls to a side buffer and atomically
/// transfers them into the worker's real queue on drop (spec.md §4.1:
/// "batch mode"). Must not be entered re-entrantly from the same caller.
pub struct MethodBatch<'a, L> {
    handle: &'a WorkerHandle<L>,
    jobs: Vec<Job<L>>,
    committed: bool,
}

thread_local! {
    static BATCH_OPEN: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

impl<'h, L: Send + 'static> MethodBatch<'h, L> {
    fn new(handle: &'h WorkerHandle<L>) -> Self {
        BATCH_OPEN.with(|open| {
            if open.replace(true) {
                panic!("MethodBatch entered re-entrantly on the same caller");
            }
        });
        Self {
            handle,
            jobs: Vec::new(),
            committed: false,
        }
    }

    /// Queue a call into this batch without executing it. Every batched
    /// call is raise-immediately: a failure is logged as soon as it
    /// happens rather than silently stashed in the handle.
    pub fn push<F, T, E>(&mut self, f: F) -> AsyncHandle<T, E>
    where
        F: for<'a> FnOnce(&'a mut L) -> BoxFuture<'a, Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<L> = Box::new(CallOnce {
            f: move |load: &mut L| -> BoxFuture<'_, ()> {
                Box::pin(async move {
                    let result = f(load).await;
                    if let Err(e) = &result {
                        warn!("batched call failed: {}", e);
                    }
                    let _ = tx.send(result);
                })
            },
        });
        self.jobs.push(job);
        AsyncHandle::pending(rx)
    }

    /// Explicitly commit the batch now instead of waiting for drop.
    pub fn commit(mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        if self.committed || self.jobs.is_empty() {
            self.committed = true;
            return;
        }
        self.committed = true;
        let jobs = std::mem::take(&mut self.jobs);
        if let Err(mpsc::error::TrySendError::Full(Request::Batch(jobs))) =
            self.handle.tx.try_send(Request::Batch(jobs))
        {
            let tx = self.handle.tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(Request::Batch(jobs)).await;
            });
        }
    }
}

impl<L> Drop for MethodBatch<'_, L> {
    fn drop(&mut self) {
        if !self.committed {
            self.flush();
        }
        BATCH_OPEN.with(|open| open.set(false));
    }
}

/// Spawn a worker owning `load`, returning a handle and the task's join
/// handle (which yields the load back on clean shutdown).
pub fn spawn<L: Load>(load: L, queue_capacity: usize) -> (WorkerHandle<L>, JoinHandle<L>) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let cancel = CancellationToken::new();
    let handle = WorkerHandle {
        tx,
        cancel: cancel.clone(),
    };
    let join = tokio::spawn(run_loop(load, rx, cancel));
    (handle, join)
}

/// Requests drained per iteration before a background-load step runs
/// (spec.md §4.1: "draining up to N queued requests").
const MAX_DRAIN_PER_TICK: usize = 16;

async fn run_loop<L: Load>(
    mut load: L,
    mut rx: mpsc::Receiver<Request<L>>,
    cancel: CancellationToken,
) -> L {
    loop {
        if cancel.is_cancelled() {
            return load;
        }

        let mut drained = 0;
        while drained < MAX_DRAIN_PER_TICK {
            match rx.try_recv() {
                Ok(Request::Call(job)) => {
                    job.invoke(&mut load).await;
                    drained += 1;
                }
                Ok(Request::Batch(jobs)) => {
                    for job in jobs {
                        job.invoke(&mut load).await;
                    }
                    drained += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return load,
            }
        }

        match load.step().await {
            LoadControl::Continue => continue,
            LoadControl::Idle(dur) => {
                tokio::select! {
                    _ = cancel.cancelled() => return load,
                    maybe_req = rx.recv() => {
                        match maybe_req {
                            Some(Request::Call(job)) => { job.invoke(&mut load).await; }
                            Some(Request::Batch(jobs)) => {
                                for job in jobs {
                                    job.invoke(&mut load).await;
                                }
                            }
                            None => return load,
                        }
                    }
                    _ = tokio::time::sleep(dur) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[async_trait::async_trait]
    impl Load for Counter {
        async fn step(&mut self) -> LoadControl {
            LoadControl::Idle(Duration::from_millis(5))
        }
    }

    #[tokio::test]
    async fn call_increments_and_returns_result() {
        let (handle, _join) = spawn(Counter(0), 8);
        let h: AsyncHandle<u32, ()> = handle.call(|c| {
            c.0 += 1;
            let v = c.0;
            Box::pin(async move { Ok(v) })
        });
        assert_eq!(h.wait().await, Ok(1));
    }

    #[tokio::test]
    async fn poll_is_none_until_complete() {
        let (handle, _join) = spawn(Counter(0), 8);
        let h: AsyncHandle<u32, ()> = handle.call(|_| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(7)
            })
        });
        assert_eq!(h.poll(), None);
        assert_eq!(h.wait().await, Ok(7));
        assert_eq!(h.poll(), Some(Ok(7)));
    }

    #[tokio::test]
    async fn batch_transfers_all_jobs_on_drop() {
        let (handle, _join) = spawn(Counter(0), 8);
        let h1: AsyncHandle<u32, String>;
        let h2: AsyncHandle<u32, String>;
        {
            let mut batch = handle.batch();
            h1 = batch.push(|c| {
                c.0 += 1;
                let v = c.0;
                Box::pin(async move { Ok::<_, String>(v) })
            });
            h2 = batch.push(|c| {
                c.0 += 1;
                let v = c.0;
                Box::pin(async move { Ok::<_, String>(v) })
            });
        }
        assert_eq!(h1.wait().await, Ok(1));
        assert_eq!(h2.wait().await, Ok(2));
    }

    #[tokio::test]
    async fn retry_policy_retries_until_ok() {
        let (handle, _join) = spawn(Counter(0), 8);
        let attempt = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let h: AsyncHandle<u32, &'static str> = handle.call_with_retry(
            move |_| {
                let attempt = attempt.clone();
                Box::pin(async move {
                    if attempt.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                })
            },
            RetryPolicy {
                retry_if: |e: &&str| *e == "not yet",
                timeout: Duration::from_secs(1),
                backoff: Duration::from_millis(1),
            },
        );
        assert_eq!(h.wait().await, Ok(42));
    }
}

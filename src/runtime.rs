//! Cooperative task runtime.
//!
//! Every background worker (relay PWM, current sampler) and the control loop
//! share one thread.  Workers are spawned onto an `edge_executor`
//! [`LocalExecutor`](edge_executor::LocalExecutor) and yield only at timed
//! waits, so a worker never observes another worker's state half-updated.
//!
//! ```text
//!  ┌───────────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                           │
//!  │  ┌───────────────────────────┐  ┌──────────────────────┐  │
//!  │  │ control loop (borrowed)   │  │ TaskExecutor ticker  │  │
//!  │  │ tick · publish · pace     │  │ relay PWM · CT RMS   │  │
//!  │  └───────────────────────────┘  └──────────────────────┘  │
//!  └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is by dropping the [`Task`] handle: the worker's future is
//! dropped in place and never polled again.

use core::future::Future;
use core::time::Duration;

/// Executor for background workers.  Workers own (or `Rc`-share) their state,
/// so the spawned futures are `'static`.
pub type TaskExecutor = edge_executor::LocalExecutor<'static, 8>;

/// Handle to a spawned worker.  Dropping it cancels the worker.
pub type Task<T> = edge_executor::Task<T>;

/// Suspend the current task for `duration` (reactor timer, no busy-wait).
pub async fn sleep(duration: Duration) {
    async_io_mini::Timer::after(duration).await;
}

/// Run `fut` to completion on the current thread while servicing every
/// worker spawned on `executor`.
pub fn run<F: Future>(executor: &TaskExecutor, fut: F) -> F::Output {
    futures_lite::future::block_on(futures_lite::future::or(fut, drive(executor)))
}

async fn drive<T>(executor: &TaskExecutor) -> T {
    loop {
        executor.run(core::future::pending::<()>()).await;
    }
}

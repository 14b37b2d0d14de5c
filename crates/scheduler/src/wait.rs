//! Blocking waits that do not starve the worker pool.
//!
//! A task body may wait for other queued work (`add_tasks(.., true)`,
//! `wait_until_finished`, ...). On a scheduler worker the wait keeps running
//! pending pool jobs between short timed waits, so the awaited tasks still get
//! dispatched when every worker is inside such a wait.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};
use rayon::Yield;

use crate::context::SchedulerContext;

/// Longest a worker sleeps before looking for pool work again.
const WORKER_WAIT_SLICE: Duration = Duration::from_millis(2);

/// Wait on `signal` while `pending` holds, or until `deadline`.
///
/// Returns `true` once `pending` is false. The guard may be released while
/// waiting, so callers must re-check anything they read before.
pub(crate) fn wait_while<T, F>(
    guard: &mut MutexGuard<'_, T>,
    signal: &Condvar,
    deadline: Option<Instant>,
    mut pending: F,
) -> bool
where
    F: FnMut(&mut T) -> bool,
{
    let on_worker = SchedulerContext::on_worker_thread();
    while pending(&mut **guard) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
        }
        if on_worker {
            let ran_job = MutexGuard::unlocked(guard, || {
                matches!(rayon::yield_now(), Some(Yield::Executed))
            });
            if ran_job {
                continue;
            }
            let slice = Instant::now() + WORKER_WAIT_SLICE;
            let until = deadline.map_or(slice, |d| d.min(slice));
            signal.wait_until(guard, until);
        } else {
            match deadline {
                Some(deadline) => {
                    signal.wait_until(guard, deadline);
                }
                None => signal.wait(guard),
            }
        }
    }
    true
}

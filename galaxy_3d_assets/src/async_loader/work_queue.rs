/// Priority work queue shared by the worker pool.
///
/// Pending tasks are ordered by priority, then by submission order within a
/// priority tier. With priority ordering disabled every task lands in one tier
/// and the queue is strict FIFO.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use crate::error::{Galaxy3dError, Galaxy3dResult};
use super::task::AsyncTask;

const SOURCE: &str = "galaxy3d::WorkQueue";

struct QueuedTask {
    /// Priority tier (0 for every task when priority ordering is off)
    tier: u8,
    seq: u64,
    task: Arc<AsyncTask>,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    /// Max-heap: higher tier first, then lower sequence number first
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
    closed: bool,
}

pub(crate) struct WorkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    max_depth: usize,
    priority_ordering: bool,
}

impl WorkQueue {
    /// `max_depth == 0` means unbounded
    pub(crate) fn new(max_depth: usize, priority_ordering: bool) -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
            max_depth,
            priority_ordering,
        }
    }

    fn lock(&self) -> Galaxy3dResult<MutexGuard<'_, QueueState>> {
        self.state.lock().map_err(|_| {
            crate::engine_error!(SOURCE, "Work queue lock poisoned");
            Galaxy3dError::LockPoisoned("work queue".to_string())
        })
    }

    /// Queue a task and wake one idle worker
    ///
    /// # Errors
    ///
    /// `ShutDown` once the queue is closed, `QueueFull` at `max_depth`.
    pub(crate) fn push(&self, task: Arc<AsyncTask>) -> Galaxy3dResult<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(Galaxy3dError::ShutDown);
        }
        if self.max_depth > 0 && state.heap.len() >= self.max_depth {
            return Err(Galaxy3dError::QueueFull(state.heap.len()));
        }

        let tier = if self.priority_ordering { task.priority() as u8 } else { 0 };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(QueuedTask { tier, seq, task });
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Block until a task is available; `None` once the queue is closed
    ///
    /// Tasks still queued at close are left for `close` to hand back.
    pub(crate) fn pop_blocking(&self) -> Option<Arc<AsyncTask>> {
        let mut state = self.lock().ok()?;
        loop {
            if state.closed {
                return None;
            }
            if let Some(queued) = state.heap.pop() {
                return Some(queued.task);
            }
            state = match self.available.wait(state) {
                Ok(guard) => guard,
                Err(_) => {
                    crate::engine_error!(SOURCE, "Work queue lock poisoned while waiting");
                    return None;
                }
            };
        }
    }

    /// Remove a still-queued task; `false` if a worker already took it
    pub(crate) fn remove(&self, task_id: u64) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        let before = state.heap.len();
        state.heap.retain(|queued| queued.task.id() != task_id);
        state.heap.len() != before
    }

    /// Close the queue, wake every worker and return what was still pending
    /// in dequeue order
    pub(crate) fn close(&self) -> Vec<Arc<AsyncTask>> {
        let pending = match self.lock() {
            Ok(mut state) => {
                state.closed = true;
                let heap = std::mem::take(&mut state.heap);
                heap.into_sorted_vec().into_iter().rev().map(|queued| queued.task).collect()
            }
            Err(_) => Vec::new(),
        };
        self.available.notify_all();
        pending
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().map(|state| state.heap.len()).unwrap_or(0)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().map(|state| state.closed).unwrap_or(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "work_queue_tests.rs"]
mod tests;

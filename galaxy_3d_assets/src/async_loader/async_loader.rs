/// Async front end of the asset loaders.
///
/// Submitting never blocks on the load itself. Finished tasks wait in a
/// channel until the owning thread calls `process_completed_tasks`, which is
/// the only place completion callbacks run. `AsyncLoader` is `Send` but not
/// `Sync`, so that drain stays on one thread.

use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use crossbeam_channel::{Receiver, Sender};
use crate::config::AsyncConfig;
use crate::error::Galaxy3dResult;
use crate::resource::{MaterialData, MeshData, ResourceLoaders, TextureData};
use super::task::{AsyncTask, TaskCallback, TaskKind, TaskPayload, TaskPriority, TaskStatus};
use super::work_queue::WorkQueue;
use super::worker_pool::{AsyncCounters, WorkerPool};

const SOURCE: &str = "galaxy3d::AsyncLoader";

/// Snapshot of async loader counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AsyncStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Tasks still waiting in the queue
    pub pending: usize,
}

pub struct AsyncLoader {
    queue: Arc<WorkQueue>,
    pool: Option<WorkerPool>,
    completed_tx: Sender<Arc<AsyncTask>>,
    completed_rx: Receiver<Arc<AsyncTask>>,
    counters: Arc<AsyncCounters>,
    next_id: AtomicU64,
    _not_sync: PhantomData<Cell<()>>,
}

impl AsyncLoader {
    /// Start the worker pool
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if a worker thread cannot be spawned.
    pub fn new(config: &AsyncConfig, loaders: ResourceLoaders) -> Galaxy3dResult<Self> {
        let queue = Arc::new(WorkQueue::new(config.max_queue_depth, config.priority_ordering));
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();
        let counters = Arc::new(AsyncCounters::default());

        let pool = WorkerPool::spawn(
            config.resolved_worker_threads(),
            queue.clone(),
            loaders,
            completed_tx.clone(),
            counters.clone(),
        )?;

        Ok(Self {
            queue,
            pool: Some(pool),
            completed_tx,
            completed_rx,
            counters,
            next_id: AtomicU64::new(1),
            _not_sync: PhantomData,
        })
    }

    // ===== SUBMISSION =====

    /// Queue a task of `kind`; returns immediately
    ///
    /// # Errors
    ///
    /// - `QueueFull` when the queue is at its configured depth
    /// - `ShutDown` after `shutdown`
    pub fn submit(
        &self,
        kind: TaskKind,
        payload: TaskPayload,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.enqueue(kind, payload, priority, None, Some(Box::new(callback)))
    }

    /// Queue a `Custom` task running `function` on a worker
    pub fn submit_custom<F, C>(
        &self,
        priority: TaskPriority,
        payload: TaskPayload,
        function: F,
        callback: C,
    ) -> Galaxy3dResult<Arc<AsyncTask>>
    where
        F: FnOnce(TaskPayload) -> Galaxy3dResult<Box<dyn Any + Send>> + Send + 'static,
        C: FnOnce(&AsyncTask) + Send + 'static,
    {
        self.enqueue(TaskKind::Custom, payload, priority, Some(Box::new(function)), Some(Box::new(callback)))
    }

    pub fn load_mesh_async(
        &self,
        mesh: MeshData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.submit(TaskKind::MeshLoad, TaskPayload::Mesh(mesh), priority, callback)
    }

    pub fn load_texture_async(
        &self,
        texture: TextureData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.submit(TaskKind::TextureLoad, TaskPayload::Texture(texture), priority, callback)
    }

    pub fn load_material_async(
        &self,
        material: MaterialData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.submit(TaskKind::MaterialLoad, TaskPayload::Material(material), priority, callback)
    }

    /// Read a scene file off-thread; the callback receives `TaskOutput::Bytes`
    pub fn load_scene_async(
        &self,
        path: impl Into<PathBuf>,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.submit(TaskKind::SceneLoad, TaskPayload::Path(path.into()), priority, callback)
    }

    fn enqueue(
        &self,
        kind: TaskKind,
        payload: TaskPayload,
        priority: TaskPriority,
        function: Option<super::task::CustomTaskFn>,
        callback: Option<TaskCallback>,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Arc::new(AsyncTask::new(id, kind, priority, payload, function, callback));

        self.queue.push(task.clone()).inspect_err(|e| {
            crate::engine_warn!(SOURCE, "Rejected {} task {}: {}", kind, id, e);
        })?;

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        crate::engine_trace!(SOURCE, "Submitted {} task {} ({:?})", kind, id, priority);
        Ok(task)
    }

    // ===== COMPLETION =====

    /// Invoke the callbacks of every task finished so far, in completion order
    ///
    /// Never blocks. Tasks finishing while the drain runs are left for the
    /// next call. Returns the number of tasks drained.
    pub fn process_completed_tasks(&self) -> usize {
        let ready = self.completed_rx.len();
        let mut drained = 0;

        for task in self.completed_rx.try_iter().take(ready) {
            if let Some(callback) = task.take_callback() {
                callback(&task);
            }
            drained += 1;
        }

        if drained > 0 {
            crate::engine_trace!(SOURCE, "Drained {} completed task(s)", drained);
        }
        drained
    }

    /// Cancel a task
    ///
    /// A pending task never runs; a running task finishes but its result is
    /// discarded. Either way its callback still fires on the next drain with
    /// status `Cancelled`. Returns `false` if the task had already finished.
    pub fn cancel(&self, task: &Arc<AsyncTask>) -> bool {
        match task.mark_cancelled() {
            Some(TaskStatus::Pending) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                // A worker that already popped it stages it itself
                if self.queue.remove(task.id()) {
                    self.stage(task.clone());
                }
                crate::engine_debug!(SOURCE, "Cancelled pending task {}", task.id());
                true
            }
            Some(_) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                crate::engine_debug!(SOURCE, "Cancelled running task {}", task.id());
                true
            }
            None => false,
        }
    }

    /// Drop the caller's reference to a task, releasing any output it holds
    pub fn free_task(&self, task: Arc<AsyncTask>) {
        drop(task.take_output());
    }

    fn stage(&self, task: Arc<AsyncTask>) {
        // Both channel ends live in `self`, so sending cannot fail here
        let _ = self.completed_tx.send(task);
    }

    // ===== LIFECYCLE =====

    /// Stop the workers and cancel everything still queued
    ///
    /// Running tasks finish first. Cancelled and finished tasks stay
    /// available to one last `process_completed_tasks`. Further submissions
    /// fail with `ShutDown`. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };

        let pending = self.queue.close();
        pool.join();

        let mut cancelled = 0;
        for task in pending {
            if task.mark_cancelled().is_some() {
                cancelled += 1;
                self.stage(task);
            }
        }
        self.counters.cancelled.fetch_add(cancelled, Ordering::Relaxed);

        crate::engine_info!(SOURCE, "Shut down ({} queued task(s) cancelled)", cancelled);
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_some() && !self.queue.is_closed()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::worker_count)
    }

    /// Tasks finished by workers but not drained yet
    pub fn completed_count(&self) -> usize {
        self.completed_rx.len()
    }

    pub fn stats(&self) -> AsyncStats {
        AsyncStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            pending: self.queue.len(),
        }
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "async_loader_tests.rs"]
mod tests;

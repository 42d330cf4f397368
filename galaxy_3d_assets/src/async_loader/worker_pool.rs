/// Fixed pool of worker threads draining the work queue.
///
/// Workers run tasks and hand them to the completed channel; they never
/// invoke completion callbacks. A failing or panicking task is recorded on the
/// task and the worker moves on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use crossbeam_channel::Sender;
use crate::error::{Galaxy3dError, Galaxy3dResult};
use crate::resource::ResourceLoaders;
use super::task::{AsyncTask, CustomTaskFn, TaskKind, TaskOutput, TaskPayload, TaskStatus};
use super::work_queue::WorkQueue;

const SOURCE: &str = "galaxy3d::WorkerPool";

/// Counters shared between the loader and its workers
#[derive(Default)]
pub(crate) struct AsyncCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
}

/// Everything a worker thread needs
#[derive(Clone)]
struct WorkerContext {
    queue: Arc<WorkQueue>,
    loaders: ResourceLoaders,
    completed_tx: Sender<Arc<AsyncTask>>,
    counters: Arc<AsyncCounters>,
}

pub(crate) struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers named `galaxy3d-asset-worker-{i}`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if a thread cannot be spawned; workers already
    /// started are stopped and joined before returning.
    pub(crate) fn spawn(
        count: usize,
        queue: Arc<WorkQueue>,
        loaders: ResourceLoaders,
        completed_tx: Sender<Arc<AsyncTask>>,
        counters: Arc<AsyncCounters>,
    ) -> Galaxy3dResult<Self> {
        let context = WorkerContext { queue, loaders, completed_tx, counters };
        let mut workers = Vec::with_capacity(count);

        for index in 0..count {
            let worker_context = context.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("galaxy3d-asset-worker-{}", index))
                .spawn(move || worker_loop(worker_context));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    crate::engine_error!(SOURCE, "Failed to spawn worker {}: {}", index, e);
                    context.queue.close();
                    WorkerPool { workers }.join();
                    return Err(Galaxy3dError::InitializationFailed(format!("worker thread {}: {}", index, e)));
                }
            }
        }

        crate::engine_info!(SOURCE, "Started {} asset worker(s)", count);
        Ok(Self { workers })
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit (the queue must already be closed)
    pub(crate) fn join(self) {
        for handle in self.workers {
            let name = handle.thread().name().unwrap_or("asset-worker").to_string();
            if handle.join().is_err() {
                crate::engine_error!(SOURCE, "Worker '{}' terminated by a panic", name);
            }
        }
    }
}

fn worker_loop(context: WorkerContext) {
    while let Some(task) = context.queue.pop_blocking() {
        run_task(&task, &context);
        if context.completed_tx.send(task).is_err() {
            // Receiver gone: the loader was dropped, nothing left to report to
            break;
        }
    }
    crate::engine_trace!(SOURCE, "Worker exiting");
}

fn run_task(task: &AsyncTask, context: &WorkerContext) {
    if !task.transition(TaskStatus::Pending, TaskStatus::Running) {
        crate::engine_trace!(SOURCE, "Task {} cancelled before it ran", task.id());
        return;
    }

    let payload = task.take_payload();
    let function = task.take_function();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        execute(task.kind(), payload, function, &context.loaders)
    }))
    .unwrap_or_else(|panic| Err(panic_message(panic.as_ref())));

    match result {
        Ok(output) => {
            task.set_output(output);
            if task.transition(TaskStatus::Running, TaskStatus::Completed) {
                context.counters.completed.fetch_add(1, Ordering::Relaxed);
            } else {
                // Cancelled while running: the result is discarded
                drop(task.take_output());
            }
        }
        Err(message) => {
            crate::engine_warn!(SOURCE, "Task {} ({}) failed: {}", task.id(), task.kind(), message);
            task.set_error(message);
            if task.transition(TaskStatus::Running, TaskStatus::Failed) {
                context.counters.failed.fetch_add(1, Ordering::Relaxed);
            } else {
                // Cancelled while running: a cancelled task carries no error
                task.clear_error();
            }
        }
    }
}

/// Run one task body; the error string is what the callback will see
fn execute(
    kind: TaskKind,
    payload: TaskPayload,
    function: Option<CustomTaskFn>,
    loaders: &ResourceLoaders,
) -> std::result::Result<TaskOutput, String> {
    let output = match (kind, payload) {
        (TaskKind::Custom, payload) => match function {
            Some(function) => function(payload).map(TaskOutput::Custom),
            None => Err(Galaxy3dError::InvalidArgument("custom task has no function".to_string())),
        },
        (kind, TaskPayload::Empty) => {
            Err(Galaxy3dError::InvalidArgument(format!("{} task has no payload", kind)))
        }
        (TaskKind::MeshLoad, TaskPayload::Mesh(mesh)) => {
            loaders.meshes.load(&mesh).map(TaskOutput::Mesh)
        }
        (TaskKind::TextureLoad, TaskPayload::Texture(texture)) => {
            loaders.textures.load(&texture).map(TaskOutput::Texture)
        }
        (TaskKind::MaterialLoad, TaskPayload::Material(material)) => {
            loaders.materials.load(&material).map(TaskOutput::Material)
        }
        (TaskKind::SceneLoad, TaskPayload::Path(path)) => {
            return std::fs::read(&path)
                .map(TaskOutput::Bytes)
                .map_err(|e| format!("failed to read '{}': {}", path.display(), e));
        }
        (TaskKind::BufferUpload, TaskPayload::Bytes(bytes)) => staging_copy(&bytes).map(TaskOutput::Bytes),
        (kind, payload) => Err(Galaxy3dError::InvalidArgument(format!(
            "{} task cannot take a {} payload", kind, payload.describe()))),
    };
    output.map_err(|e| e.to_string())
}

fn staging_copy(bytes: &[u8]) -> Galaxy3dResult<Vec<u8>> {
    let mut staging = Vec::new();
    staging.try_reserve_exact(bytes.len())?;
    staging.extend_from_slice(bytes);
    Ok(staging)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {}", message)
    } else {
        "task panicked".to_string()
    }
}

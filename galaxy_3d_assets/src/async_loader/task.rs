/// Async task objects.
///
/// An `AsyncTask` is shared between the submitting thread and one worker
/// through an `Arc`. Its status is an atomic state machine
///
/// ```text
/// Pending -> Running -> { Completed | Failed | Cancelled }
///    \_______________________________________/^
/// ```
///
/// with sticky terminal states. Payload, output, error and closures sit behind
/// their own small mutexes; each is touched by at most one thread at a time
/// and never while another lock is held.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use crate::error::Galaxy3dResult;
use crate::resource::{Loaded, MaterialData, MeshData, TextureData};

// ===== TASK KIND / PRIORITY / STATUS =====

/// What a task does when a worker runs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// `TaskPayload::Mesh` through the mesh loader
    MeshLoad,
    /// `TaskPayload::Texture` through the texture loader
    TextureLoad,
    /// `TaskPayload::Material` through the material loader
    MaterialLoad,
    /// Read a scene file (`TaskPayload::Path`) off-thread
    SceneLoad,
    /// Staging copy of `TaskPayload::Bytes`
    BufferUpload,
    /// The task's own closure
    Custom,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::MeshLoad => "mesh-load",
            TaskKind::TextureLoad => "texture-load",
            TaskKind::MaterialLoad => "material-load",
            TaskKind::SceneLoad => "scene-load",
            TaskKind::BufferUpload => "buffer-upload",
            TaskKind::Custom => "custom",
        })
    }
}

/// Scheduling priority, higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Lifecycle state of a task
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl TaskStatus {
    /// `Completed`, `Failed` and `Cancelled` never change again
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Running,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            _ => TaskStatus::Cancelled,
        }
    }
}

// ===== PAYLOAD / OUTPUT =====

/// Input handed to a worker
#[derive(Debug, Default)]
pub enum TaskPayload {
    #[default]
    Empty,
    Path(PathBuf),
    Bytes(Vec<u8>),
    Mesh(MeshData),
    Texture(TextureData),
    Material(MaterialData),
}

impl TaskPayload {
    /// Short name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TaskPayload::Empty => "empty",
            TaskPayload::Path(_) => "path",
            TaskPayload::Bytes(_) => "bytes",
            TaskPayload::Mesh(_) => "mesh",
            TaskPayload::Texture(_) => "texture",
            TaskPayload::Material(_) => "material",
        }
    }
}

/// Result of a successful task
///
/// Load outputs own a registry count; dropping the output (or passing the
/// task to `free_task`) releases it.
pub enum TaskOutput {
    Mesh(Loaded<MeshData>),
    Texture(Loaded<TextureData>),
    Material(Loaded<MaterialData>),
    Bytes(Vec<u8>),
    Custom(Box<dyn Any + Send>),
}

impl TaskOutput {
    pub fn into_mesh(self) -> Option<Loaded<MeshData>> {
        match self {
            TaskOutput::Mesh(loaded) => Some(loaded),
            _ => None,
        }
    }

    pub fn into_texture(self) -> Option<Loaded<TextureData>> {
        match self {
            TaskOutput::Texture(loaded) => Some(loaded),
            _ => None,
        }
    }

    pub fn into_material(self) -> Option<Loaded<MaterialData>> {
        match self {
            TaskOutput::Material(loaded) => Some(loaded),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            TaskOutput::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Downcast a custom output
    pub fn into_custom<T: Any>(self) -> Option<T> {
        match self {
            TaskOutput::Custom(value) => value.downcast::<T>().ok().map(|boxed| *boxed),
            _ => None,
        }
    }
}

impl fmt::Debug for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutput::Mesh(loaded) => f.debug_tuple("Mesh").field(&loaded.handle).finish(),
            TaskOutput::Texture(loaded) => f.debug_tuple("Texture").field(&loaded.handle).finish(),
            TaskOutput::Material(loaded) => f.debug_tuple("Material").field(&loaded.handle).finish(),
            TaskOutput::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            TaskOutput::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Work function of a `Custom` task
pub type CustomTaskFn = Box<dyn FnOnce(TaskPayload) -> Galaxy3dResult<Box<dyn Any + Send>> + Send>;

/// Completion callback, invoked once on the draining thread
pub type TaskCallback = Box<dyn FnOnce(&AsyncTask) + Send>;

// ===== ASYNC TASK =====

pub struct AsyncTask {
    id: u64,
    kind: TaskKind,
    priority: TaskPriority,
    status: AtomicU8,
    submitted_at: Instant,
    payload: Mutex<TaskPayload>,
    function: Mutex<Option<CustomTaskFn>>,
    callback: Mutex<Option<TaskCallback>>,
    output: Mutex<Option<TaskOutput>>,
    error: Mutex<Option<String>>,
}

/// Task mutexes only guard plain moves, a poisoned one still holds a valid value
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AsyncTask {
    pub(crate) fn new(
        id: u64,
        kind: TaskKind,
        priority: TaskPriority,
        payload: TaskPayload,
        function: Option<CustomTaskFn>,
        callback: Option<TaskCallback>,
    ) -> Self {
        Self {
            id,
            kind,
            priority,
            status: AtomicU8::new(TaskStatus::Pending as u8),
            submitted_at: Instant::now(),
            payload: Mutex::new(payload),
            function: Mutex::new(function),
            callback: Mutex::new(callback),
            output: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time since submission
    pub fn age(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Error message of a `Failed` task
    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    /// Take the output of a `Completed` task (at most once)
    pub fn take_output(&self) -> Option<TaskOutput> {
        lock(&self.output).take()
    }

    pub fn has_output(&self) -> bool {
        lock(&self.output).is_some()
    }

    // ===== WORKER / LOADER SIDE =====

    /// Atomic `from -> to` transition; fails if another thread moved first
    pub(crate) fn transition(&self, from: TaskStatus, to: TaskStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move a pending or running task to `Cancelled`
    ///
    /// Returns the status it was cancelled from, `None` if already terminal.
    pub(crate) fn mark_cancelled(&self) -> Option<TaskStatus> {
        for from in [TaskStatus::Pending, TaskStatus::Running] {
            if self.transition(from, TaskStatus::Cancelled) {
                return Some(from);
            }
        }
        // Pending -> Running may have happened between the two attempts
        if self.transition(TaskStatus::Running, TaskStatus::Cancelled) {
            return Some(TaskStatus::Running);
        }
        None
    }

    pub(crate) fn take_payload(&self) -> TaskPayload {
        std::mem::take(&mut *lock(&self.payload))
    }

    pub(crate) fn take_function(&self) -> Option<CustomTaskFn> {
        lock(&self.function).take()
    }

    pub(crate) fn take_callback(&self) -> Option<TaskCallback> {
        lock(&self.callback).take()
    }

    pub(crate) fn set_output(&self, output: TaskOutput) {
        *lock(&self.output) = Some(output);
    }

    pub(crate) fn set_error(&self, message: String) {
        *lock(&self.error) = Some(message);
    }

    pub(crate) fn clear_error(&self) {
        lock(&self.error).take();
    }
}

impl fmt::Debug for AsyncTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTask")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("status", &self.status())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

//! Async task queue and worker pool
//!
//! Loads run on worker threads; completion callbacks run on the thread that
//! drains the loader.

mod task;
mod work_queue;
mod worker_pool;
mod async_loader;

pub use task::{
    AsyncTask, TaskKind, TaskPriority, TaskStatus,
    TaskPayload, TaskOutput, TaskCallback, CustomTaskFn,
};
pub use async_loader::{AsyncLoader, AsyncStats};

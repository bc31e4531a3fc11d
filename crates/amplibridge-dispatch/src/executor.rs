// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker pool for action bodies.
//
// Vendor calls block (JNI attach, SDK locks, disk queues), so each action
// runs as a blocking task on a Tokio runtime rather than on the host's
// calling thread. Submission is fire-and-forget.

use amplibridge_core::config::BridgeSettings;
use amplibridge_core::error::Result;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

/// A unit of work submitted by the dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks somewhere other than the caller's thread.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Blocking-task pool backed by a Tokio runtime.
pub struct WorkerPool {
    handle: Handle,
    /// Present when the pool built its own runtime. Must outlive `handle`.
    _runtime: Option<Runtime>,
}

impl WorkerPool {
    /// Build a dedicated runtime sized from `settings`.
    ///
    /// The returned pool must not be dropped from inside an async context.
    pub fn new(settings: &BridgeSettings) -> Result<Self> {
        let threads = settings.worker_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads)
            .thread_name(settings.thread_name.clone())
            .enable_all()
            .build()?;
        info!(threads, name = %settings.thread_name, "worker pool started");
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(runtime),
        })
    }

    /// Run tasks on an existing runtime instead of owning one.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }
}

impl TaskExecutor for WorkerPool {
    fn execute(&self, task: Task) {
        // Detached: completion is reported through the task's own callback.
        drop(self.handle.spawn_blocking(task));
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("owns_runtime", &self._runtime.is_some())
            .finish()
    }
}

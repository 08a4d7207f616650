//! §5 worker contract: a three-state (`NotOk`, `Ok`, `Work`) job handle
//! matching `WebPWorker`, plus the trivial synchronous implementation
//! this crate actually drives its row callbacks through.
//!
//! Grounded in `original_source/src/utils/thread_utils.c`'s state machine
//! (`Init`/`Reset`/`Launch`/`Sync`/`End`, `status` ordering `NOT_OK < OK <
//! WORK`).

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerStatus {
    NotOk,
    Ok,
    Work,
}

/// A unit of work: `hook(data)` runs on the worker thread (or inline, for
/// `SyncWorker`) and returns whether it succeeded.
pub type Hook = Box<dyn FnOnce() -> bool + Send>;

/// Runs its hook inline on `launch()`, for single-threaded builds or
/// callers that don't want a background thread.
pub struct SyncWorker {
    status: WorkerStatus,
    had_error: bool,
}

impl SyncWorker {
    pub fn new() -> Self {
        SyncWorker { status: WorkerStatus::Ok, had_error: false }
    }

    pub fn reset(&mut self) {
        if self.status < WorkerStatus::Ok {
            self.status = WorkerStatus::Ok;
            self.had_error = false;
        }
    }

    pub fn launch(&mut self, hook: Hook) {
        self.had_error |= !hook();
        self.status = WorkerStatus::Ok;
    }

    pub fn sync(&mut self) -> bool {
        !self.had_error
    }

    pub fn end(&mut self) {
        self.status = WorkerStatus::NotOk;
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }
}

impl Default for SyncWorker {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    status: Mutex<WorkerStatus>,
    had_error: Mutex<bool>,
    condvar: Condvar,
}

/// A real background-thread worker, for callers that want row decode
/// overlapped with, e.g., the upsampling/color-conversion pass.
pub struct ThreadWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    pub fn new() -> Self {
        ThreadWorker {
            shared: Arc::new(Shared {
                status: Mutex::new(WorkerStatus::Ok),
                had_error: Mutex::new(false),
                condvar: Condvar::new(),
            }),
            handle: None,
        }
    }

    pub fn reset(&mut self) {
        let mut status = self.shared.status.lock().unwrap();
        if *status < WorkerStatus::Ok {
            *status = WorkerStatus::Ok;
            *self.shared.had_error.lock().unwrap() = false;
        }
    }

    /// Runs `hook` on a dedicated thread, joining any previous launch
    /// first (mirrors `Sync()` being called implicitly by `Launch()`).
    pub fn launch(&mut self, hook: Hook) {
        self.sync();
        let shared = Arc::clone(&self.shared);
        *shared.status.lock().unwrap() = WorkerStatus::Work;
        self.handle = Some(std::thread::spawn(move || {
            let ok = hook();
            let mut had_error = shared.had_error.lock().unwrap();
            *had_error |= !ok;
            drop(had_error);
            let mut status = shared.status.lock().unwrap();
            *status = WorkerStatus::Ok;
            shared.condvar.notify_all();
        }));
    }

    pub fn sync(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        !*self.shared.had_error.lock().unwrap()
    }

    pub fn end(&mut self) {
        self.sync();
        *self.shared.status.lock().unwrap() = WorkerStatus::NotOk;
    }

    pub fn status(&self) -> WorkerStatus {
        *self.shared.status.lock().unwrap()
    }
}

impl Default for ThreadWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn sync_worker_runs_hook_inline_and_reports_success() {
        let mut w = SyncWorker::new();
        w.launch(Box::new(|| true));
        assert!(w.sync());
    }

    #[test]
    fn sync_worker_reports_failure_from_hook() {
        let mut w = SyncWorker::new();
        w.launch(Box::new(|| false));
        assert!(!w.sync());
    }

    #[test]
    fn thread_worker_runs_hook_and_syncs() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = Arc::clone(&flag);
        let mut w = ThreadWorker::new();
        w.launch(Box::new(move || {
            flag2.store(true, Ordering::SeqCst);
            true
        }));
        assert!(w.sync());
        assert!(flag.load(Ordering::SeqCst));
    }
}

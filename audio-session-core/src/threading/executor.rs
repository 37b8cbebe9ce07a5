//! Serialized execution of native-object calls.
//!
//! The platform's object model requires every call into a given native
//! object to originate on one fixed thread. `SerialExecutor` owns that
//! thread: all native calls and callback registrations are funneled
//! through `invoke`/`dispatch`, which run them in FIFO order on a
//! single lazily-spawned worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;

type Job = Box<dyn FnOnce() + Send + 'static>;
type ThreadInit = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    sender: Sender<Job>,
    thread_id: ThreadId,
}

struct Inner {
    name: String,
    thread_init: Mutex<Option<ThreadInit>>,
    worker: OnceLock<Worker>,
}

/// Cloneable handle to a single-worker command queue.
///
/// Created once at process start and passed by reference (or clone) to
/// every controller and service that talks to the native layer. The
/// worker thread is spawned on first use and lives until every handle
/// is dropped; there is no explicit shutdown.
#[derive(Clone)]
pub struct SerialExecutor {
    inner: Arc<Inner>,
}

impl SerialExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Like `new`, but runs `init` on the worker thread before it
    /// services any job. Backends use this to put the worker into the
    /// execution context the native layer requires (e.g. COM
    /// initialization).
    pub fn with_thread_init(
        name: impl Into<String>,
        init: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self::build(name.into(), Some(Box::new(init)))
    }

    fn build(name: String, init: Option<ThreadInit>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                thread_init: Mutex::new(init),
                worker: OnceLock::new(),
            }),
        }
    }

    /// Run `action` on the worker thread and return its result,
    /// blocking the caller until it completes.
    ///
    /// Invocations are strictly serialized in submission order. A panic
    /// inside `action` resumes on the caller; the worker itself keeps
    /// servicing subsequent jobs. Called from the worker thread itself,
    /// `action` runs inline instead of deadlocking.
    pub fn invoke<R, F>(&self, action: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let worker = self.worker();
        if thread::current().id() == worker.thread_id {
            return action();
        }

        let (reply_tx, reply_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let _ = reply_tx.send(panic::catch_unwind(AssertUnwindSafe(action)));
        });
        worker
            .sender
            .send(job)
            .expect("executor worker queue closed");

        match reply_rx
            .recv()
            .expect("executor worker dropped the reply channel")
        {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Fire-and-forget variant of `invoke`.
    ///
    /// Still ordered relative to every other submission. A panic inside
    /// `action` is logged and absorbed so the worker never dies.
    pub fn dispatch<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let worker = self.worker();
        if thread::current().id() == worker.thread_id {
            action();
            return;
        }

        let job: Job = Box::new(move || {
            if panic::catch_unwind(AssertUnwindSafe(action)).is_err() {
                log::error!("dispatched action panicked on executor worker");
            }
        });
        let _ = worker.sender.send(job);
    }

    /// Whether the calling thread is the executor worker.
    pub fn on_worker_thread(&self) -> bool {
        thread::current().id() == self.worker().thread_id
    }

    fn worker(&self) -> &Worker {
        self.inner.worker.get_or_init(|| {
            let (job_tx, job_rx) = unbounded::<Job>();
            let (id_tx, id_rx) = bounded(1);
            let init = self.inner.thread_init.lock().take();

            thread::Builder::new()
                .name(self.inner.name.clone())
                .spawn(move || {
                    let _ = id_tx.send(thread::current().id());
                    if let Some(init) = init {
                        init();
                    }
                    for job in job_rx {
                        job();
                    }
                })
                .expect("failed to spawn executor worker thread");

            let thread_id = id_rx.recv().expect("executor worker did not start");
            Worker {
                sender: job_tx,
                thread_id,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn invoke_returns_value() {
        let exec = SerialExecutor::new("test-exec");
        assert_eq!(exec.invoke(|| 41 + 1), 42);
    }

    #[test]
    fn invoke_runs_on_worker_thread() {
        let exec = SerialExecutor::new("test-exec");
        let caller = thread::current().id();
        let worker = exec.invoke(|| thread::current().id());
        assert_ne!(caller, worker);
        // Same worker every time.
        assert_eq!(worker, exec.invoke(|| thread::current().id()));
    }

    #[test]
    fn reentrant_invoke_runs_inline() {
        let exec = SerialExecutor::new("test-exec");
        let inner = exec.clone();
        let value = exec.invoke(move || inner.invoke(|| 7));
        assert_eq!(value, 7);
    }

    #[test]
    fn invocations_are_mutually_exclusive() {
        let exec = SerialExecutor::new("test-exec");
        let concurrent = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let exec = exec.clone();
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            handles.push(thread::spawn(move || {
                for _ in 0..20 {
                    let concurrent = Arc::clone(&concurrent);
                    let peak = Arc::clone(&peak);
                    exec.invoke(move || {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_preserves_submission_order() {
        let exec = SerialExecutor::new("test-exec");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = Arc::clone(&seen);
            exec.dispatch(move || seen.lock().push(i));
        }
        // invoke acts as a barrier behind the queued dispatches
        exec.invoke(|| ());
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn panic_propagates_and_worker_survives() {
        let exec = SerialExecutor::new("test-exec");
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            exec.invoke(|| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(exec.invoke(|| 5), 5);
    }
}

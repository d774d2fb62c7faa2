//! Background task execution.
//!
//! `work` runs on tokio's blocking pool, gated by a semaphore so at most
//! `max_workers` works run at once. The outcome is always handed back to the
//! UI thread through the [`Dispatcher`]; `on_done`/`on_error` never run on a
//! worker. A failing or panicking work with no `on_error` is reported to the
//! app's error boundary instead of escaping.

use crate::app::controller::App;
use crate::app::error::{panic_message, AppError};
use crate::app::event::{Dispatcher, TaskId};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_WORKERS: usize = 5;

type Work<T> = Box<dyn FnOnce() -> anyhow::Result<T> + Send + 'static>;
type OnDone<T> = Box<dyn FnOnce(&mut App, T) -> anyhow::Result<()> + Send + 'static>;
type OnError = Box<dyn FnOnce(&mut App, AppError) -> anyhow::Result<()> + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A unit of background work plus its UI-thread continuations.
pub struct Task<T> {
    name: String,
    work: Work<T>,
    on_done: Option<OnDone<T>>,
    on_error: Option<OnError>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<W>(work: W) -> Self
    where
        W: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        Self {
            name: "task".to_string(),
            work: Box::new(work),
            on_done: None,
            on_error: None,
        }
    }

    /// Label used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_done<F>(mut self, on_done: F) -> Self
    where
        F: FnOnce(&mut App, T) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_done = Some(Box::new(on_done));
        self
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(&mut App, AppError) -> anyhow::Result<()> + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

pub struct TaskManager {
    dispatcher: Dispatcher,
    runtime: Option<Handle>,
    permits: Arc<Semaphore>,
    max_workers: usize,
    next_id: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

impl TaskManager {
    pub fn new(dispatcher: Dispatcher, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            warn!("task manager created outside a tokio runtime; tasks will fail");
        }
        info!(max_workers, "task manager initialized");
        Self {
            dispatcher,
            runtime,
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            next_id: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedule `task` and return immediately.
    pub fn run<T: Send + 'static>(&self, task: Task<T>) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let Task {
            name,
            work,
            on_done,
            on_error,
        } = task;
        debug!(task = id, name = %name, status = ?TaskStatus::Pending, "task scheduled");

        let dispatcher = self.dispatcher.clone();
        let Some(runtime) = &self.runtime else {
            let err = AppError::TaskFailure("no async runtime available".to_string());
            dispatcher.dispatch(move |app| complete(app, id, &name, Err(err), on_done, on_error));
            return id;
        };

        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        runtime.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => {
                    debug!(task = id, status = ?TaskStatus::Running, "task started");
                    match tokio::task::spawn_blocking(work).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(AppError::TaskFailure(format!("{e:#}"))),
                        Err(join) if join.is_panic() => {
                            Err(AppError::TaskFailure(panic_message(join.into_panic().as_ref())))
                        }
                        Err(join) => Err(AppError::TaskFailure(join.to_string())),
                    }
                }
                Err(_) => Err(AppError::TaskFailure("worker pool closed".to_string())),
            };
            in_flight.fetch_sub(1, Ordering::SeqCst);

            let queued =
                dispatcher.dispatch(move |app| complete(app, id, &name, outcome, on_done, on_error));
            if !queued {
                warn!(task = id, "UI loop closed, completion dropped");
            }
        });
        id
    }

    /// Tasks whose work has not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

/// Runs on the UI thread.
fn complete<T>(
    app: &mut App,
    id: TaskId,
    name: &str,
    outcome: Result<T, AppError>,
    on_done: Option<OnDone<T>>,
    on_error: Option<OnError>,
) {
    let handled = match outcome {
        Ok(value) => {
            info!(task = id, name = %name, status = ?TaskStatus::Completed, "task finished");
            match on_done {
                Some(on_done) => catch_unwind(AssertUnwindSafe(|| on_done(app, value))),
                None => return,
            }
        }
        Err(err) => {
            warn!(task = id, name = %name, status = ?TaskStatus::Failed, error = %err, "task failed");
            match on_error {
                Some(on_error) => catch_unwind(AssertUnwindSafe(|| on_error(app, err))),
                None => {
                    app.report_failure(&format!("unhandled failure in task '{name}'"), err);
                    return;
                }
            }
        }
    };

    let message = match handled {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => panic_message(panic.as_ref()),
    };
    app.report_failure(
        &format!("completion handler error in task '{name}'"),
        AppError::TaskFailure(message),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::controller::tests::test_app;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_on_done_runs_on_ui_thread() {
        let (mut app, mut rx) = test_app();
        let ui_thread = thread::current().id();
        let worker_thread = Arc::new(Mutex::new(None));
        let done_thread = Arc::new(Mutex::new(None));

        let w = worker_thread.clone();
        let d = done_thread.clone();
        app.tasks.run(
            Task::new(move || {
                *w.lock().unwrap() = Some(thread::current().id());
                Ok(21 * 2)
            })
            .on_done(move |app, value: i32| {
                *d.lock().unwrap() = Some(thread::current().id());
                app.state.set("answer", value)?;
                Ok(())
            }),
        );

        assert!(app.next_job(&mut rx, Duration::from_secs(5)).await);
        assert_eq!(app.state.get::<i32>("answer").unwrap(), 42);
        assert_eq!(*done_thread.lock().unwrap(), Some(ui_thread));
        assert_ne!(*worker_thread.lock().unwrap(), Some(ui_thread));
        assert_eq!(app.tasks.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_routed_to_on_error() {
        let (mut app, mut rx) = test_app();
        let ui_thread = thread::current().id();
        let captured = Arc::new(Mutex::new(None));

        let c = captured.clone();
        app.tasks.run(
            Task::new(|| -> anyhow::Result<i32> {
                let divisor: i32 = "0".parse()?;
                1_i32.checked_div(divisor).ok_or_else(|| anyhow::anyhow!("division by zero"))
            })
            .on_error(move |_app, err| {
                *c.lock().unwrap() = Some((thread::current().id(), err.to_string()));
                Ok(())
            }),
        );

        assert!(app.next_job(&mut rx, Duration::from_secs(5)).await);
        let (thread_id, message) = captured.lock().unwrap().take().unwrap();
        assert_eq!(thread_id, ui_thread);
        assert!(message.contains("division by zero"));
        assert_eq!(app.notifications().count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panic_without_on_error_becomes_notification() {
        let (mut app, mut rx) = test_app();
        app.tasks
            .run(Task::new(|| -> anyhow::Result<()> { panic!("worker blew up") }).named("doomed"));

        assert!(app.next_job(&mut rx, Duration::from_secs(5)).await);
        let notes: Vec<_> = app.notifications().collect();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("worker blew up"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_on_done_is_contained() {
        let (mut app, mut rx) = test_app();
        app.tasks.run(Task::new(|| Ok(())).on_done(|_app, ()| anyhow::bail!("handler broke")));

        assert!(app.next_job(&mut rx, Duration::from_secs(5)).await);
        assert_eq!(app.notifications().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_limit_is_respected() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let manager = TaskManager::new(Dispatcher::new(tx), 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            manager.run(Task::new(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        for _ in 0..6 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
            assert!(matches!(event, Ok(Some(_))));
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(manager.in_flight(), 0);
    }

    #[test]
    fn test_run_without_runtime_reports_failure() {
        let (mut app, mut rx) = test_app();
        let failed = Arc::new(Mutex::new(false));
        let f = failed.clone();
        app.tasks.run(Task::new(|| Ok(1)).on_error(move |_app, err| {
            assert!(matches!(err, AppError::TaskFailure(_)));
            *f.lock().unwrap() = true;
            Ok(())
        }));
        app.drain(&mut rx);
        assert!(*failed.lock().unwrap());
    }
}

//! Synchronous hand-off of work to the host's UI context.
//!
//! Some vendor SDKs may only display ads from the UI thread, while the
//! mediator calls `show()` from wherever it likes and expects it to return
//! only once the vendor call has completed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use error_stack::Report;

use crate::error::MediationError;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// The host's UI context.
pub trait UiDispatcher: Send + Sync {
    /// Whether the calling thread is the UI context.
    fn is_current(&self) -> bool;

    /// Queues `task` to run on the UI context.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Display`] when the UI context no longer accepts work.
    fn post(&self, task: UiTask) -> Result<(), Report<MediationError>>;
}

/// Runs `task` on the UI context and blocks until it completes.
///
/// Runs inline when already on the UI context. A panic inside the task is
/// captured and returned as a display error. `timeout` bounds the wait for the
/// UI context to start the task: a task not started in time is abandoned and
/// never runs, while a task already running is waited for.
///
/// # Errors
///
/// Returns the task's own error, or [`MediationError::Display`] when the task
/// panicked, timed out or was dropped by the UI context.
pub fn run_blocking<T, F>(
    dispatcher: &dyn UiDispatcher,
    timeout: Option<Duration>,
    task: F,
) -> Result<T, Report<MediationError>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Report<MediationError>> + Send + 'static,
{
    if dispatcher.is_current() {
        return guarded(task);
    }

    // set by whichever comes first: the task starting or the caller giving up
    let claimed = Arc::new(AtomicBool::new(false));
    let task_claim = Arc::clone(&claimed);
    let (sender, receiver) = mpsc::sync_channel(1);
    dispatcher.post(Box::new(move || {
        if task_claim.swap(true, Ordering::SeqCst) {
            log::warn!("skipping UI task abandoned after a timeout");
            return;
        }
        let _ = sender.send(guarded(task));
    }))?;

    let dropped = || "UI context dropped the task".to_string();
    let received = match timeout {
        Some(timeout) => match receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) if !claimed.swap(true, Ordering::SeqCst) => {
                Err(format!("UI hand-off timed out after {timeout:?}"))
            }
            // the task started before the deadline and runs to completion
            Err(RecvTimeoutError::Timeout) => receiver.recv().map_err(|_| dropped()),
            Err(RecvTimeoutError::Disconnected) => Err(dropped()),
        },
        None => receiver.recv().map_err(|_| dropped()),
    };

    received.map_err(|message| Report::new(MediationError::Display { message }))?
}

fn guarded<T, F>(task: F) -> Result<T, Report<MediationError>>
where
    F: FnOnce() -> Result<T, Report<MediationError>>,
{
    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(Report::new(MediationError::Display {
            message: format!("display task panicked: {detail}"),
        }))
    })
}

/// Dedicated thread standing in for a UI event loop.
pub struct UiThread {
    sender: Mutex<Option<Sender<UiTask>>>,
    thread_id: ThreadId,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl UiThread {
    /// Spawns the UI thread.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Display`] if the thread cannot be spawned.
    pub fn spawn(name: &str) -> Result<Self, Report<MediationError>> {
        let (sender, receiver) = mpsc::channel::<UiTask>();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    task();
                }
            })
            .map_err(|e| {
                Report::new(MediationError::Display {
                    message: format!("failed to spawn UI thread: {e}"),
                })
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread_id: join.thread().id(),
            join: Mutex::new(Some(join)),
        })
    }

    /// Stops accepting work and waits for queued tasks to finish.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let join = self.join.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(join) = join {
            if thread::current().id() != self.thread_id && join.join().is_err() {
                log::error!("UI thread terminated with a panic");
            }
        }
    }
}

impl UiDispatcher for UiThread {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn post(&self, task: UiTask) -> Result<(), Report<MediationError>> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(Report::new(MediationError::Display {
                message: "UI thread is shut down".to_string(),
            }));
        };
        sender.send(task).map_err(|_| {
            Report::new(MediationError::Display {
                message: "UI thread is gone".to_string(),
            })
        })
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

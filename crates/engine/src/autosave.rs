//! Background autosave task
//!
//! A dedicated thread that writes a snapshot every configured interval.
//! A failed save is logged and retried on the next tick; stopping the
//! worker wakes the thread immediately and joins it.

use crate::database::Inner;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

struct Signal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

pub(crate) struct AutosaveWorker {
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl AutosaveWorker {
    pub(crate) fn spawn(inner: Arc<Inner>, interval: Duration) -> Self {
        let signal = Arc::new(Signal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("coffer-autosave".to_string())
            .spawn(move || run(inner, thread_signal, interval));
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "could not spawn autosave thread");
                None
            }
        };
        AutosaveWorker { signal, handle }
    }

    pub(crate) fn stop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(inner: Arc<Inner>, signal: Arc<Signal>, interval: Duration) {
    debug!(interval_ms = interval.as_millis() as u64, "autosave started");
    loop {
        let mut stopped = signal.stopped.lock();
        if *stopped {
            break;
        }
        let timed_out = signal.wake.wait_for(&mut stopped, interval).timed_out();
        if *stopped {
            break;
        }
        drop(stopped);
        if timed_out {
            let _write_guard = inner.writer.lock();
            match inner.save_locked() {
                Ok(()) => debug!("autosave snapshot written"),
                Err(err) => warn!(error = %err, "autosave failed, retrying next interval"),
            }
        }
    }
    debug!("autosave stopped");
}

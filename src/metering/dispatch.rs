//! Detached telemetry tasks.
//!
//! Every record leaves the caller's path through a [`Dispatcher`]: the
//! delivery runs on a spawned tokio task the caller never joins. The
//! dispatcher counts those tasks so short-lived programs can [`drain`] them
//! before the runtime shuts down.
//!
//! [`drain`]: Dispatcher::drain

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{error, warn};

use super::sink::MeteringSink;
use crate::telemetry;
use crate::types::TelemetryRecord;

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the task finishes or is dropped.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Runs telemetry work off the caller's path.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn MeteringSink>,
    inflight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn MeteringSink>) -> Self {
        Self {
            sink,
            inflight: Arc::new(InFlight::default()),
        }
    }

    pub fn sink(&self) -> &Arc<dyn MeteringSink> {
        &self.sink
    }

    /// Deliver `record` on a detached task.
    pub fn dispatch(&self, record: TelemetryRecord) {
        let sink = Arc::clone(&self.sink);
        self.spawn(async move { sink.send(&record).await });
    }

    /// Run `work` on a detached task. Panics inside `work` are logged and
    /// counted, never propagated.
    ///
    /// Outside a tokio runtime the work is dropped with a warning.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!("no tokio runtime available, dropping telemetry task");
            return;
        };

        self.inflight.count.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(Arc::clone(&self.inflight));
        handle.spawn(async move {
            let _guard = guard;
            guarded(work).await;
        });
    }

    /// Number of detached tasks still running.
    pub fn in_flight(&self) -> usize {
        self.inflight.count.load(Ordering::Acquire)
    }

    /// Wait until every detached task has finished.
    pub async fn drain(&self) {
        loop {
            let mut idle = pin!(self.inflight.idle.notified());
            idle.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// [`drain`](Self::drain) with an upper bound. Returns `false` if tasks
    /// were still running when `timeout` elapsed.
    pub async fn drain_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.drain()).await.is_ok()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// Await `work`, containing any panic.
pub(crate) async fn guarded<F>(work: F)
where
    F: Future<Output = ()>,
{
    if let Err(panic) = AssertUnwindSafe(work).catch_unwind().await {
        report_panic(panic.as_ref());
    }
}

pub(crate) fn report_panic(panic: &(dyn Any + Send)) {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    error!(panic = %message, "telemetry task panicked");
    metrics::counter!(telemetry::TASK_PANICS_TOTAL).increment(1);
}

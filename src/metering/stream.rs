//! Stream observation.
//!
//! [`ObservedStream`] sits between a provider's chunk stream and the
//! consumer. It forwards every item untouched while noting when the first
//! chunk arrived, which chunk came last, and whether the producer failed.
//! When the stream ends (exhausted, failed, or dropped early) it hands a
//! [`StreamSummary`] to its finalizer exactly once.
//!
//! # Finalization
//!
//! - On exhaustion the finalizer future is awaited inside `poll_next`
//!   before the terminal `None` reaches the consumer, so a consumer that
//!   reads to the end has its record delivered by the time it sees `None`.
//! - On drop (before exhaustion, or while the finalizer is still running)
//!   the remaining work moves to the [`Dispatcher`] as a detached task.
//!
//! Panics inside the finalizer are contained and never reach the consumer.

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use futures_util::future::BoxFuture;
use pin_project_lite::pin_project;

use super::dispatch::{Dispatcher, guarded, report_panic};
use crate::Result;
use crate::record::OperationClock;
use crate::signals::StreamEnd;

/// What was observed over the life of a stream.
#[derive(Debug, Clone)]
pub struct StreamSummary<T> {
    pub first_chunk_at: Option<DateTime<Utc>>,
    pub last_chunk: Option<T>,
    pub chunks: usize,
    /// First producer error, if any.
    pub error: Option<String>,
    pub ended_at: DateTime<Utc>,
    pub end: StreamEnd,
}

type Finalizer<T> = Box<dyn FnOnce(StreamSummary<T>) -> BoxFuture<'static, ()> + Send>;

pin_project! {
    /// Pass-through stream that reports a [`StreamSummary`] once it ends.
    pub struct ObservedStream<S, T> {
        #[pin]
        inner: S,
        clock: OperationClock,
        first_chunk_at: Option<DateTime<Utc>>,
        last_chunk: Option<T>,
        chunks: usize,
        error: Option<String>,
        finalizer: Option<Finalizer<T>>,
        finalizing: Option<BoxFuture<'static, ()>>,
        dispatcher: Dispatcher,
        done: bool,
    }

    impl<S, T> PinnedDrop for ObservedStream<S, T> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(pending) = this.finalizing.take() {
                this.dispatcher.spawn(pending);
                return;
            }
            let Some(finalizer) = this.finalizer.take() else {
                return;
            };
            let end = if this.error.is_some() {
                StreamEnd::Failed
            } else {
                StreamEnd::Abandoned
            };
            let summary = StreamSummary {
                first_chunk_at: this.first_chunk_at.take(),
                last_chunk: this.last_chunk.take(),
                chunks: *this.chunks,
                error: this.error.take(),
                ended_at: this.clock.now(),
                end,
            };
            if let Some(work) = start(finalizer, summary) {
                this.dispatcher.spawn(work);
            }
        }
    }
}

impl<S, T> ObservedStream<S, T> {
    /// Observe `inner`, timing it against `clock`. `finalizer` runs once when
    /// the stream ends; if that happens on drop it runs on `dispatcher`.
    pub fn new<F, Fut>(
        inner: S,
        clock: OperationClock,
        dispatcher: Dispatcher,
        finalizer: F,
    ) -> Self
    where
        F: FnOnce(StreamSummary<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        T: 'static,
    {
        Self {
            inner,
            clock,
            first_chunk_at: None,
            last_chunk: None,
            chunks: 0,
            error: None,
            finalizer: Some(Box::new(
                move |summary: StreamSummary<T>| -> BoxFuture<'static, ()> {
                    Box::pin(finalizer(summary))
                },
            )),
            finalizing: None,
            dispatcher,
            done: false,
        }
    }

    /// Chunks forwarded so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn first_chunk_at(&self) -> Option<DateTime<Utc>> {
        self.first_chunk_at
    }
}

/// Call the finalizer, containing a panic raised before its future exists.
fn start<T>(finalizer: Finalizer<T>, summary: StreamSummary<T>) -> Option<BoxFuture<'static, ()>> {
    match panic::catch_unwind(AssertUnwindSafe(move || finalizer(summary))) {
        Ok(work) => Some(work),
        Err(panic) => {
            report_panic(panic.as_ref());
            None
        }
    }
}

impl<S, T> Stream for ObservedStream<S, T>
where
    S: Stream<Item = Result<T>>,
    T: Clone,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(work) = this.finalizing.as_mut() {
                ready!(work.as_mut().poll(cx));
                *this.finalizing = None;
                *this.done = true;
                return Poll::Ready(None);
            }
            if *this.done {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if this.first_chunk_at.is_none() {
                        *this.first_chunk_at = Some(this.clock.now());
                    }
                    *this.chunks += 1;
                    *this.last_chunk = Some(chunk.clone());
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Some(Err(err)) => {
                    if this.error.is_none() {
                        *this.error = Some(err.to_string());
                    }
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    let Some(finalizer) = this.finalizer.take() else {
                        *this.done = true;
                        continue;
                    };
                    let end = if this.error.is_some() {
                        StreamEnd::Failed
                    } else {
                        StreamEnd::Exhausted
                    };
                    let summary = StreamSummary {
                        first_chunk_at: *this.first_chunk_at,
                        last_chunk: this.last_chunk.take(),
                        chunks: *this.chunks,
                        error: this.error.clone(),
                        ended_at: this.clock.now(),
                        end,
                    };
                    match start(finalizer, summary) {
                        Some(work) => *this.finalizing = Some(Box::pin(guarded(work))),
                        None => *this.done = true,
                    }
                }
            }
        }
    }
}

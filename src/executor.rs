//! Bounded concurrent executor for corrective operations.
//!
//! A pump task walks the input items once, acquiring a permit before each
//! submission, and spawns one task per item. Completed `(item, result)` pairs
//! are delivered in completion order through the [`Stream`] implementation.
//!
//! Per-item failures are values of `R` and never stop the batch. Only faults
//! of the executor itself (a panicking operation or pump) surface as
//! [`ExecutorError`], and they cancel everything still in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use log::{debug, error};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error_handling::ExecutorError;

enum Completion<T, R> {
    Done(T, R),
    Fault(ExecutorError),
}

/// Stream of `(item, result)` pairs produced by at most `limit` concurrent operations.
pub struct BoundedExecutor<T, R> {
    results: UnboundedReceiver<Completion<T, R>>,
    cancel: CancellationToken,
    pump: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T, R> BoundedExecutor<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Starts the pump. Must be called within a Tokio runtime.
    ///
    /// `make_op` returns `None` for items that should be skipped; skipped
    /// items are neither submitted nor yielded.
    pub fn spawn<I, F, Fut>(items: I, limit: usize, make_op: F) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        F: FnMut(&T) -> Option<Fut> + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let (tx, results) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(pump(
            items.into_iter(),
            limit.max(1),
            make_op,
            tx,
            cancel.clone(),
        ));
        BoundedExecutor {
            results,
            cancel,
            pump: Some(pump),
            finished: false,
        }
    }

    /// Stops submitting, aborts every in-flight operation and waits for them.
    ///
    /// Returns the number of completed results that were discarded unread.
    pub async fn cancel(mut self) -> usize {
        self.cancel.cancel();
        if let Some(pump) = self.pump.take() {
            if let Err(err) = pump.await {
                debug!("Executor pump ended abnormally: {}", panic_message(err));
            }
        }
        self.results.close();
        let mut discarded = 0;
        while let Ok(completion) = self.results.try_recv() {
            if let Completion::Done(..) = completion {
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!("Executor cancelled; discarded {discarded} completed results");
        }
        discarded
    }

    /// Feeds every pair to `f`. An error from `f` or from the executor
    /// cancels the remaining work before it is returned.
    pub async fn try_for_each<E, F>(mut self, mut f: F) -> Result<(), E>
    where
        E: From<ExecutorError>,
        F: FnMut(T, R) -> Result<(), E>,
    {
        while let Some(next) = self.next().await {
            let step = match next {
                Ok((item, result)) => f(item, result),
                Err(fault) => Err(E::from(fault)),
            };
            if let Err(e) = step {
                self.cancel().await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Gathers every pair, in completion order.
    pub async fn collect_all(self) -> Result<Vec<(T, R)>, ExecutorError> {
        let mut pairs = Vec::new();
        self.try_for_each(|item, result| {
            pairs.push((item, result));
            Ok::<_, ExecutorError>(())
        })
        .await?;
        Ok(pairs)
    }
}

impl<T, R> Stream for BoundedExecutor<T, R> {
    type Item = Result<(T, R), ExecutorError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.results.poll_recv(cx) {
            Poll::Ready(Some(Completion::Done(item, result))) => Poll::Ready(Some(Ok((item, result)))),
            Poll::Ready(Some(Completion::Fault(fault))) => Poll::Ready(Some(Err(fault))),
            Poll::Ready(None) => {
                // Every sender is gone; surface a pump panic before ending.
                if let Some(pump) = this.pump.as_mut() {
                    match Pin::new(pump).poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(joined) => {
                            this.pump = None;
                            if matches!(joined, Err(ref e) if e.is_panic()) {
                                this.finished = true;
                                return Poll::Ready(Some(Err(ExecutorError::PumpPanicked)));
                            }
                        }
                    }
                }
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, R> Drop for BoundedExecutor<T, R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn pump<T, R, It, F, Fut>(
    items: It,
    limit: usize,
    mut make_op: F,
    tx: UnboundedSender<Completion<T, R>>,
    cancel: CancellationToken,
) where
    T: Send + 'static,
    R: Send + 'static,
    It: Iterator<Item = T>,
    F: FnMut(&T) -> Option<Fut>,
    Fut: Future<Output = R> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit));
    let mut running: JoinSet<()> = JoinSet::new();

    for item in items {
        let Some(op) = make_op(&item) else {
            continue;
        };

        let permit = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    shutdown(&mut running).await;
                    return;
                }
                Some(joined) = running.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            let fault = ExecutorError::OperationPanicked(panic_message(e));
                            fail(&mut running, &tx, &cancel, fault).await;
                            return;
                        }
                    }
                }
                acquired = Arc::clone(&permits).acquire_owned() => {
                    match acquired {
                        Ok(permit) => break permit,
                        Err(_) => {
                            fail(&mut running, &tx, &cancel, ExecutorError::SemaphoreClosed).await;
                            return;
                        }
                    }
                }
            }
        };

        let tx = tx.clone();
        running.spawn(async move {
            let result = op.await;
            let _ = tx.send(Completion::Done(item, result));
            drop(permit);
        });
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shutdown(&mut running).await;
                return;
            }
            joined = running.join_next() => {
                match joined {
                    None => break,
                    Some(Err(e)) if e.is_panic() => {
                        let fault = ExecutorError::OperationPanicked(panic_message(e));
                        fail(&mut running, &tx, &cancel, fault).await;
                        return;
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

async fn shutdown(running: &mut JoinSet<()>) {
    running.abort_all();
    while running.join_next().await.is_some() {}
}

async fn fail<T, R>(
    running: &mut JoinSet<()>,
    tx: &UnboundedSender<Completion<T, R>>,
    cancel: &CancellationToken,
    fault: ExecutorError,
) {
    error!("{fault}; cancelling {} in-flight operations", running.len());
    let _ = tx.send(Completion::Fault(fault));
    cancel.cancel();
    shutdown(running).await;
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}

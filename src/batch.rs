use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use tracing::info;

use crate::domain::{
    Error,
    traits::{AccountRepository, DeadLetterQueue, NotificationSink, TransferStream},
};
use crate::engine::TransferEngine;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub committed: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Drains a transfer stream through the engine, running up to `workers`
/// transfers at once.
#[derive(Debug)]
pub struct BatchRunner<R, N, D>
where
    R: AccountRepository,
    N: NotificationSink,
    D: DeadLetterQueue,
{
    engine: Arc<TransferEngine<R, N>>,
    dlq: D,
    workers: usize,
}

impl<R, N, D> BatchRunner<R, N, D>
where
    R: AccountRepository + 'static,
    N: NotificationSink + 'static,
    D: DeadLetterQueue,
{
    pub fn new(engine: Arc<TransferEngine<R, N>>, dlq: D, workers: usize) -> Self {
        Self {
            engine,
            dlq,
            workers: workers.max(1),
        }
    }

    /// Rejected transfers and unreadable rows go to the dead letter queue;
    /// neither stops the batch.
    pub async fn process<S: TransferStream>(&self, source: &mut S) -> BatchSummary {
        let committed = AtomicUsize::new(0);
        let rejected = AtomicUsize::new(0);
        let malformed = AtomicUsize::new(0);

        source
            .stream()
            .for_each_concurrent(self.workers, |row| {
                let engine = Arc::clone(&self.engine);
                let (committed, rejected, malformed) = (&committed, &rejected, &malformed);
                let dlq = &self.dlq;

                async move {
                    let transfer = match row {
                        Ok(transfer) => transfer,
                        Err(e) => {
                            malformed.fetch_add(1, Ordering::Relaxed);
                            dlq.report(&e);
                            return;
                        }
                    };

                    // The lock protocol parks OS threads, so keep it off the
                    // async workers.
                    let outcome =
                        tokio::task::spawn_blocking(move || engine.make_transfer(&transfer)).await;

                    match outcome {
                        Ok(Ok(())) => {
                            committed.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(Err(e)) => {
                            rejected.fetch_add(1, Ordering::Relaxed);
                            dlq.report(&Error::Transfer(e));
                        }
                        Err(e) => {
                            rejected.fetch_add(1, Ordering::Relaxed);
                            dlq.report(&Error::Engine(format!("transfer task failed: {}", e)));
                        }
                    }
                }
            })
            .await;

        let summary = BatchSummary {
            committed: committed.into_inner(),
            rejected: rejected.into_inner(),
            malformed: malformed.into_inner(),
        };
        info!(
            committed = summary.committed,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "batch finished"
        );
        summary
    }
}

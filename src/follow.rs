//! Continuous consumption on top of the blocking batch API.
//!
//! The consumer is moved onto a blocking worker for each batch and moved back
//! when the batch returns, so the async side never holds it while it polls.

use crate::kafka::{Consumer, ConsumerEngine, Record};
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Consumes batches until `shutdown` resolves or `on_batch` returns
/// [`Error::Shutdown`], handing every batch to `on_batch`.
///
/// A batch already in progress when `shutdown` fires is finished and
/// delivered before returning. The consumer is handed back to the caller.
pub async fn follow<E, S, F>(
    mut consumer: Consumer<E>,
    max_count: usize,
    timeout: Duration,
    shutdown: S,
    mut on_batch: F,
) -> Result<Consumer<E>>
where
    E: ConsumerEngine + Send + 'static,
    S: Future<Output = ()>,
    F: FnMut(Vec<Record>) -> Result<()>,
{
    tokio::pin!(shutdown);
    let mut batches: u64 = 0;

    loop {
        let mut worker = tokio::task::spawn_blocking(move || {
            let records = consumer.consume_batch(max_count, timeout);
            (consumer, records)
        });

        let finished = tokio::select! {
            joined = &mut worker => Some(joined),
            _ = &mut shutdown => None,
        };

        let (stopping, joined) = match finished {
            Some(joined) => (false, joined),
            None => {
                info!("Shutdown requested, finishing current batch");
                (true, worker.await)
            }
        };

        let (returned, records) = joined?;
        consumer = returned;
        batches += 1;
        debug!(batch = batches, records = records.len(), "Batch consumed");

        match on_batch(records) {
            Ok(()) => {}
            Err(Error::Shutdown) => {
                info!(batches, "Batch handler requested shutdown");
                return Ok(consumer);
            }
            Err(e) => return Err(e),
        }

        if stopping {
            info!(batches, "Follow loop stopped");
            return Ok(consumer);
        }
    }
}

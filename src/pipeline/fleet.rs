use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::item::{ItemPipeline, ItemResult};
use crate::catalog::CatalogRecord;

/// Runs one item pipeline per record, all at once, bounded only by the
/// pipeline's class limiters.
pub struct FleetScheduler {
    pipeline: Arc<ItemPipeline>,
}

impl FleetScheduler {
    pub fn new(pipeline: Arc<ItemPipeline>) -> Self {
        Self { pipeline }
    }

    /// Process every record and wait for all of them.
    ///
    /// Results come back in completion order, one per record. A panicking
    /// item is reported as failed and does not disturb the others.
    pub async fn run_all(&self, records: Vec<CatalogRecord>) -> Vec<ItemResult> {
        let total = records.len();
        info!("Starting {} items", total);

        let mut tasks = JoinSet::new();
        for record in records {
            let pipeline = self.pipeline.clone();
            tasks.spawn(async move {
                match AssertUnwindSafe(pipeline.process(&record))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => {
                        error!(
                            "Item {} ({}) panicked: {}",
                            record.id,
                            record.title,
                            panic_message(panic.as_ref())
                        );
                        ItemResult::failed(&record)
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Item task aborted: {}", e),
            }
        }

        let done = results.iter().filter(|r| r.succeeded()).count();
        info!("Main pass finished: {}/{} items saved", done, total);
        results
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

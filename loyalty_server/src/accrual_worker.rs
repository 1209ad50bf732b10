use log::*;
use loyalty_engine::{events::EventProducers, ReconciliationScheduler, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle};

use crate::{accrual_client::HttpAccrualClient, config::AccrualConfig};

/// Starts the accrual reconciliation worker, unless it is disabled in the configuration.
///
/// The worker runs until `shutdown` is set to `true` (or its sender is dropped). Await the returned handle after
/// signalling shutdown to let the current order finish.
pub fn start_accrual_worker(
    db: SqliteDatabase,
    client: HttpAccrualClient,
    producers: EventProducers,
    config: &AccrualConfig,
    shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    if !config.worker_enabled {
        warn!("🕰️ The accrual worker is disabled. Orders will not be reconciled.");
        return None;
    }
    let scheduler = ReconciliationScheduler::new(db, client, producers, config.scheduler_config());
    Some(tokio::spawn(scheduler.run(shutdown)))
}

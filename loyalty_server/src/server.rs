use std::{future::Future, pin::Pin};

use log::*;
use loyalty_engine::{
    events::{EventHandlers, EventHooks, OrderCreditedEvent},
    LoyaltyDatabase,
    SqliteDatabase,
};
use tokio::sync::watch;

use crate::{
    accrual_client::HttpAccrualClient,
    accrual_worker::start_accrual_worker,
    config::ServerConfig,
    errors::ServerError,
};

const EVENT_BUFFER_SIZE: usize = 64;

/// Prepares the database, starts the accrual worker and event hooks, and runs until Ctrl-C is received.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let mut db = prepare_database(&config).await?;
    let client = HttpAccrualClient::new(&config.accrual.address, config.accrual.order_timeout)?;

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    let hook_tasks = handlers.start_handlers();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = start_accrual_worker(db.clone(), client, producers, &config.accrual, shutdown_rx);

    info!("🚀️ Server is up. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        if let Err(e) = worker.await {
            error!("🚀️ The accrual worker did not shut down cleanly. {e}");
        }
    }
    // The hooks finish once the worker has dropped its producers
    for task in hook_tasks {
        if let Err(e) = task.await {
            error!("🚀️ An event hook did not shut down cleanly. {e}");
        }
    }
    db.close().await?;
    Ok(())
}

/// Connects to the database, wiping it first if so configured, and brings the schema up to date.
pub async fn prepare_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    let url = config.database_url.reveal();
    if config.reinit_database {
        warn!("🚀️ Reinitialising the database");
        SqliteDatabase::reset_database(url).await?;
    }
    let db = SqliteDatabase::new_with_url(url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await?;
    Ok(db)
}

fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_credited(|ev: OrderCreditedEvent| {
        Box::pin(async move {
            info!(
                "📬️ User #{} earned {} for order {}. Their balance is now {}",
                ev.order.user_id, ev.operation.amount, ev.order.number, ev.balance
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

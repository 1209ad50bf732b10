//! Periodic reconciliation of pending orders with the accrual authority.
//!
//! A single [`ReconciliationScheduler`] runs per deployment. Every tick it fetches a batch of orders that are not
//! final yet, asks the authority about each one in turn, and hands the answer to the [`OrderReconciler`]. A failure
//! on one order is logged and the order is retried on a later tick; it never stops the rest of the batch.
//!
//! Every fetched order is marked as polled, whatever the outcome, and the next batch starts with the orders polled
//! longest ago. Orders the authority never answers for therefore cannot hold the head of the queue.
//!
//! The per-order deadline covers the authority call and the unit of work. Publishing the credit event happens after
//! the commit and is not subject to it.
use std::time::Duration;

use chrono::Utc;
use log::*;
use thiserror::Error;
use tokio::{
    sync::watch,
    time::{timeout_at, Instant, MissedTickBehavior},
};

use crate::{
    accrual::{AccrualClient, AccrualClientError},
    db::traits::LoyaltyDatabase,
    db_types::{Order, PENDING_ORDER_STATUSES},
    events::EventProducers,
    LoyaltyError,
    OrderReconciler,
    ReconcileOutcome,
};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the start of consecutive ticks
    pub interval: Duration,
    /// The most orders fetched per tick
    pub batch_size: u32,
    /// Deadline for querying and reconciling a single order
    pub order_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), batch_size: 20, order_timeout: Duration::from_secs(10) }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub fetched: usize,
    pub credited: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub not_registered: usize,
    pub failed: usize,
    /// The authority asked us to back off. The rest of the batch was skipped.
    pub rate_limited: bool,
    /// Shutdown was requested part-way through the batch.
    pub interrupted: bool,
}

impl TickSummary {
    pub fn processed(&self) -> usize {
        self.credited + self.updated + self.unchanged + self.not_registered + self.failed
    }
}

enum OrderStep {
    Reconciled(ReconcileOutcome),
    NotRegistered,
}

#[derive(Debug, Error)]
enum StepError {
    #[error("{0}")]
    Client(#[from] AccrualClientError),
    #[error("{0}")]
    Reconcile(#[from] LoyaltyError),
    #[error("The order took longer than {0:?} to reconcile")]
    TimedOut(Duration),
}

pub struct ReconciliationScheduler<B, C> {
    db: B,
    client: C,
    reconciler: OrderReconciler<B>,
    config: SchedulerConfig,
    paused_until: Option<Instant>,
}

impl<B, C> ReconciliationScheduler<B, C>
where
    B: LoyaltyDatabase,
    C: AccrualClient,
{
    pub fn new(db: B, client: C, producers: EventProducers, config: SchedulerConfig) -> Self {
        let reconciler = OrderReconciler::new(db.clone(), producers);
        Self { db, client, reconciler, config, paused_until: None }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// When the authority last rate-limited us, the instant before which it will not be called again.
    pub fn paused_until(&self) -> Option<Instant> {
        self.paused_until
    }

    /// Runs ticks on a fixed interval until `shutdown` turns `true`, or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "🕰️ Reconciliation worker started. Polling every {}s, {} orders at a time",
            self.config.interval.as_secs_f32(),
            self.config.batch_size
        );
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                },
            }
            if *shutdown.borrow() {
                break;
            }
            let summary = self.tick(&shutdown).await;
            if summary.fetched > 0 {
                info!(
                    "🕰️ Reconciliation tick: {} fetched, {} credited, {} updated, {} not registered, {} failed",
                    summary.fetched, summary.credited, summary.updated, summary.not_registered, summary.failed
                );
            } else {
                trace!("🕰️ Reconciliation tick: nothing to do");
            }
        }
        info!("🕰️ Reconciliation worker stopped");
    }

    /// Runs a single reconciliation pass over at most `batch_size` pending orders.
    pub async fn tick(&mut self, shutdown: &watch::Receiver<bool>) -> TickSummary {
        let mut summary = TickSummary::default();
        if let Some(until) = self.paused_until {
            if Instant::now() < until {
                debug!("🕰️ The accrual system asked us to back off. Skipping this tick");
                summary.rate_limited = true;
                return summary;
            }
            self.paused_until = None;
        }
        let orders = match self.db.fetch_orders_by_statuses(&PENDING_ORDER_STATUSES, self.config.batch_size).await {
            Ok(orders) => orders,
            Err(e) => {
                error!("🕰️ Could not fetch pending orders. Will try again next tick. {e}");
                return summary;
            },
        };
        summary.fetched = orders.len();
        let ids = orders.iter().map(|o| o.id).collect::<Vec<_>>();
        if let Err(e) = self.db.mark_orders_polled(&ids, Utc::now()).await {
            warn!("🕰️ Could not mark {} order(s) as polled. {e}", ids.len());
        }
        for order in orders {
            if *shutdown.borrow() {
                debug!("🕰️ Shutdown requested. Abandoning the rest of the batch");
                summary.interrupted = true;
                break;
            }
            match self.reconcile_order(&order).await {
                Ok(OrderStep::Reconciled(outcome)) => match outcome {
                    ReconcileOutcome::Credited { .. } => summary.credited += 1,
                    ReconcileOutcome::StatusUpdated(_) => summary.updated += 1,
                    ReconcileOutcome::Unchanged(_) => summary.unchanged += 1,
                },
                Ok(OrderStep::NotRegistered) => {
                    debug!("🕰️ Order {} is not registered with the accrual system yet", order.number);
                    summary.not_registered += 1;
                },
                Err(StepError::Client(AccrualClientError::TooManyRequests { retry_after })) => {
                    warn!(
                        "🕰️ The accrual system is rate limiting us. Pausing for {}s",
                        retry_after.as_secs_f32()
                    );
                    self.paused_until = Some(Instant::now() + retry_after);
                    summary.rate_limited = true;
                    break;
                },
                Err(e) => {
                    warn!("🕰️ Could not reconcile order {}. It will be retried. {e}", order.number);
                    summary.failed += 1;
                },
            }
        }
        summary
    }

    async fn reconcile_order(&self, order: &Order) -> Result<OrderStep, StepError> {
        let limit = self.config.order_timeout;
        let deadline = Instant::now() + limit;
        let accrual = match timeout_at(deadline, self.client.get_accrual(&order.number)).await {
            Err(_) => return Err(StepError::TimedOut(limit)),
            Ok(Ok(accrual)) => accrual,
            Ok(Err(AccrualClientError::NotRegistered(_))) => return Ok(OrderStep::NotRegistered),
            Ok(Err(e)) => return Err(e.into()),
        };
        if accrual.order != order.number {
            warn!("🕰️ Asked about order {} but the accrual system answered for {}", order.number, accrual.order);
        }
        trace!("🕰️ Accrual system says order {} is {}", order.number, accrual.status);
        let outcome = timeout_at(deadline, self.reconciler.apply(&order.number, &accrual.status, accrual.amount))
            .await
            .map_err(|_| StepError::TimedOut(limit))??;
        self.reconciler.notify(&outcome).await;
        Ok(OrderStep::Reconciled(outcome))
    }
}

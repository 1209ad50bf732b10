use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    accrual::AccrualStatus,
    db::traits::{LoyaltyDatabase, UnitOfWork},
    db_types::{Operation, Order, OrderNumber, OrderStatusType, Points},
    engine_api::balance_ledger,
    events::{EventProducers, OrderCreditedEvent},
    LoyaltyError,
};

/// What a call to [`OrderReconciler::reconcile`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was already final. Nothing was written.
    Unchanged(Order),
    /// The order's status (and `updated_at`) changed. No points moved.
    StatusUpdated(Order),
    /// The order was processed and its owner credited.
    Credited { order: Order, operation: Operation, balance: Points },
}

impl ReconcileOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ReconcileOutcome::Unchanged(order) => order,
            ReconcileOutcome::StatusUpdated(order) => order,
            ReconcileOutcome::Credited { order, .. } => order,
        }
    }
}

/// `OrderReconciler` owns the order status lifecycle.
///
/// ```text
/// NEW ──> REGISTERED / PROCESSING ──> PROCESSED (final, credited once)
///                                └──> INVALID   (final)
/// ```
///
/// Every decision is applied in its own unit of work that locks the order first, and the owner's account second.
pub struct OrderReconciler<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderReconciler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReconciler")
    }
}

impl<B> OrderReconciler<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderReconciler<B>
where B: LoyaltyDatabase
{
    /// Applies the accrual authority's decision on an order, and notifies the hook subscribers of any credit.
    ///
    /// * Unknown orders are rejected with [`LoyaltyError::NotFound`].
    /// * Final orders are left alone, whatever the decision, so replaying a decision is harmless and an order is
    ///   credited at most once.
    /// * `PROCESSED` with a positive amount credits the owner and marks the order processed, atomically.
    /// * `PROCESSED` without an amount (or with zero) only marks the order processed.
    /// * `REGISTERED`, `PROCESSING` and `INVALID` update the status and `updated_at` only.
    /// * Anything else is rejected with [`LoyaltyError::UnexpectedStatus`] and nothing is written.
    pub async fn reconcile(
        &self,
        number: &OrderNumber,
        status: &AccrualStatus,
        amount: Option<Points>,
    ) -> Result<ReconcileOutcome, LoyaltyError> {
        let outcome = self.apply(number, status, amount).await?;
        self.notify(&outcome).await;
        Ok(outcome)
    }

    /// The part of [`OrderReconciler::reconcile`] that writes. Nothing is published; once this returns, the outcome is
    /// committed and the caller owes the subscribers a [`OrderReconciler::notify`].
    pub(crate) async fn apply(
        &self,
        number: &OrderNumber,
        status: &AccrualStatus,
        amount: Option<Points>,
    ) -> Result<ReconcileOutcome, LoyaltyError> {
        let mut tx = self.db.begin().await?;
        match apply_decision(&mut tx, number, status, amount).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            },
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!("🔄️ Could not roll back the reconciliation of order {number}: {rb}");
                }
                Err(e)
            },
        }
    }

    pub(crate) async fn notify(&self, outcome: &ReconcileOutcome) {
        if let ReconcileOutcome::Credited { order, operation, balance } = outcome {
            debug!("🔄️📬️ Notifying order credited hook subscribers");
            let event = OrderCreditedEvent::new(order.clone(), operation.clone(), *balance);
            self.producers.publish_order_credited(event).await;
        }
    }
}

async fn apply_decision<T: UnitOfWork>(
    tx: &mut T,
    number: &OrderNumber,
    status: &AccrualStatus,
    amount: Option<Points>,
) -> Result<ReconcileOutcome, LoyaltyError> {
    let order = tx
        .lock_order_by_number(number)
        .await?
        .ok_or_else(|| LoyaltyError::NotFound(format!("Order {number}")))?;
    if order.status.is_terminal() {
        trace!("🔄️ Order {number} is already {}. Nothing to do.", order.status);
        return Ok(ReconcileOutcome::Unchanged(order));
    }
    let target = status
        .order_status()
        .ok_or_else(|| LoyaltyError::UnexpectedStatus { order: number.clone(), status: status.to_string() })?;
    if let Some(a) = amount.filter(Points::is_negative) {
        return Err(LoyaltyError::BadParam(format!("Accrual for order {number} is negative ({a})")));
    }
    let now = Utc::now();
    match target {
        OrderStatusType::Processed => match amount.filter(Points::is_positive) {
            Some(amount) => {
                let (operation, account) = balance_ledger::credit(tx, &order, amount, now).await?;
                let order = tx.update_order_status(order.id, OrderStatusType::Processed, now).await?;
                info!(
                    "🔄️ Order {number} processed. {amount} credited to user #{}. Their balance is now {}",
                    order.user_id, account.balance
                );
                Ok(ReconcileOutcome::Credited { order, operation, balance: account.balance })
            },
            None => {
                let order = tx.update_order_status(order.id, OrderStatusType::Processed, now).await?;
                warn!("🔄️ Order {number} was processed without an accrual. No points were credited.");
                Ok(ReconcileOutcome::StatusUpdated(order))
            },
        },
        OrderStatusType::Registered | OrderStatusType::Processing | OrderStatusType::Invalid => {
            let old_status = order.status;
            let order = tx.update_order_status(order.id, target, now).await?;
            debug!("🔄️ Order {number} moved from {old_status} to {}", order.status);
            Ok(ReconcileOutcome::StatusUpdated(order))
        },
        OrderStatusType::New => {
            Err(LoyaltyError::UnexpectedStatus { order: number.clone(), status: target.to_string() })
        },
    }
}

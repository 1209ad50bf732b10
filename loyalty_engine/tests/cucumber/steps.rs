use cucumber::{given, then, when};
use loyalty_engine::{
    accrual::AccrualStatus,
    db_types::{OperationType, OrderNumber, OrderStatusType, Points},
    LoyaltyDatabase,
};

use crate::cucumber::{error_kind, LoyaltyWorld};

#[given(expr = "user {int} has an account")]
async fn open_account(world: &mut LoyaltyWorld, user_id: i64) {
    world.accounts().open_account(user_id).await.expect("Error opening account");
}

#[given(expr = "user {int} has been credited {int} points")]
async fn seed_balance(world: &mut LoyaltyWorld, user_id: i64, amount: i64) {
    world.seed_counter += 1;
    let number = format!("seed-{user_id}-{}", world.seed_counter);
    let orders = world.orders().with_validation(false);
    orders.submit_order(user_id, &number).await.expect("Error submitting seed order");
    world
        .reconciler()
        .reconcile(&OrderNumber::from(number), &AccrualStatus::Processed, Some(Points::from(amount)))
        .await
        .expect("Error crediting seed order");
}

#[when(expr = "user {int} submits order {word}")]
async fn submit_order(world: &mut LoyaltyWorld, user_id: i64, number: String) {
    let result = world.orders().submit_order(user_id, &number).await;
    world.record(result);
}

#[when(expr = "the accrual system reports order {word} as {word} with {int} points")]
async fn reconcile_with_points(world: &mut LoyaltyWorld, number: String, status: String, amount: i64) {
    let status = AccrualStatus::from(status);
    let result = world.reconciler().reconcile(&OrderNumber::from(number), &status, Some(Points::from(amount))).await;
    world.record(result);
}

#[when(expr = "the accrual system reports order {word} as {word}")]
async fn reconcile_status(world: &mut LoyaltyWorld, number: String, status: String) {
    let status = AccrualStatus::from(status);
    let result = world.reconciler().reconcile(&OrderNumber::from(number), &status, None).await;
    world.record(result);
}

#[when(expr = "user {int} withdraws {int} points against order {word}")]
async fn withdraw(world: &mut LoyaltyWorld, user_id: i64, amount: i64, number: String) {
    let result = world.withdrawals().withdraw(user_id, &number, Points::from(amount)).await;
    world.record(result);
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut LoyaltyWorld) {
    if let Some(err) = &world.last_error {
        panic!("Expected success, but got {err}");
    }
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut LoyaltyWorld, kind: String) {
    let err = world.last_error.as_ref().expect("Expected the request to fail, but it succeeded");
    assert_eq!(error_kind(err), kind, "Unexpected error: {err}");
}

#[then(expr = "order {word} has status {word}")]
async fn order_status(world: &mut LoyaltyWorld, number: String, status: String) {
    let order = world
        .db()
        .fetch_order_by_number(&OrderNumber::from(number.as_str()))
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {number} does not exist"));
    let expected = status.parse::<OrderStatusType>().expect("Not an order status");
    assert_eq!(order.status, expected, "Status is incorrect");
}

#[then(expr = "user {int} has {int} order(s)")]
async fn order_count(world: &mut LoyaltyWorld, user_id: i64, count: usize) {
    let orders = world.orders().orders_for_user(user_id).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count, "Order count is incorrect");
}

#[then(expr = "user {int} has a balance of {int} points")]
async fn check_balance(world: &mut LoyaltyWorld, user_id: i64, amount: i64) {
    let balance = world.accounts().get_balance(user_id).await.expect("Error fetching balance");
    assert_eq!(balance.current, Points::from(amount), "Current balance is incorrect");
}

#[then(expr = "user {int} has withdrawn {int} points")]
async fn check_withdrawn(world: &mut LoyaltyWorld, user_id: i64, amount: i64) {
    let balance = world.accounts().get_balance(user_id).await.expect("Error fetching balance");
    assert_eq!(balance.withdrawn, Points::from(amount), "Withdrawn total is incorrect");
}

#[then(expr = "user {int} has {int} {word} operation(s)")]
async fn operation_count(world: &mut LoyaltyWorld, user_id: i64, count: usize, kind: String) {
    let operation_type = match kind.as_str() {
        "CREDIT" => OperationType::Credit,
        "DEBIT" => OperationType::Debit,
        _ => panic!("Unknown operation type {kind}"),
    };
    let ops = world.db().fetch_operations_for_user(user_id, Some(operation_type)).await.expect("Error fetching ops");
    assert_eq!(ops.len(), count, "Operation count is incorrect");
}

#[then(expr = "the ledger for user {int} balances")]
async fn ledger_balances(world: &mut LoyaltyWorld, user_id: i64) {
    let db = world.db();
    let account = db.fetch_account_for_user(user_id).await.expect("Error fetching account").expect("No account");
    assert!(account.is_consistent(), "Account totals are inconsistent: {account:?}");
    let from_ledger = db.ledger_balance_for_user(user_id).await.expect("Error summing ledger");
    assert_eq!(from_ledger, Some(account.balance), "Ledger does not explain the balance");
}

use loyalty_engine::{
    accrual::AccrualStatus,
    db_types::{OperationType, OrderStatusType, Points},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path, tear_down},
    AccountApi,
    LoyaltyDatabase,
    LoyaltyError,
    OrderApi,
    OrderReconciler,
    SqliteDatabase,
    WithdrawalApi,
};

/// Gives the user a balance by registering an order and having it processed.
async fn fund(db: &SqliteDatabase, user_id: i64, number: &str, amount: i64) {
    OrderApi::new(db.clone()).submit_order(user_id, number).await.expect("Error submitting order");
    OrderReconciler::new(db.clone(), EventProducers::default())
        .reconcile(&number.into(), &AccrualStatus::Processed, Some(Points::from(amount)))
        .await
        .expect("Error reconciling order");
}

async fn assert_ledger_consistent(db: &SqliteDatabase, user_id: i64) {
    let account = db.fetch_account_for_user(user_id).await.unwrap().expect("Account should exist");
    assert!(account.is_consistent(), "{account:?}");
    let from_ledger = db.ledger_balance_for_user(user_id).await.unwrap();
    assert_eq!(from_ledger, Some(account.balance));
}

#[tokio::test]
async fn withdraw_part_of_the_balance() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 1, "79927398713", 100).await;
    let op = WithdrawalApi::new(db.clone()).withdraw(1, "2377225624", Points::from(60)).await.unwrap();
    assert_eq!(op.operation_type, OperationType::Debit);
    assert_eq!(op.amount, Points::from(60));
    assert_eq!(op.order_id, None);

    let accounts = AccountApi::new(db.clone());
    let balance = accounts.get_balance(1).await.unwrap();
    assert_eq!(balance.current, Points::from(40));
    assert_eq!(balance.withdrawn, Points::from(60));
    let history = accounts.get_withdrawal_history(1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order_number.as_str(), "2377225624");
    assert_eq!(history[0].amount, Points::from(60));
    assert_ledger_consistent(&db, 1).await;
    tear_down(db).await;
}

#[tokio::test]
async fn overdrawing_is_rejected_without_side_effects() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 1, "79927398713", 50).await;
    let err = WithdrawalApi::new(db.clone()).withdraw(1, "2377225624", Points::from(51)).await.unwrap_err();
    assert!(matches!(
        err,
        LoyaltyError::InsufficientFunds { balance, requested } if balance == Points::from(50) && requested == Points::from(51)
    ));
    let accounts = AccountApi::new(db.clone());
    assert_eq!(accounts.get_balance(1).await.unwrap().current, Points::from(50));
    assert!(accounts.get_withdrawal_history(1).await.unwrap().is_empty());
    assert_eq!(accounts.operations_for_user(1).await.unwrap().len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 7, "4111111111111111", 100).await;
    let api_a = WithdrawalApi::new(db.clone());
    let api_b = WithdrawalApi::new(db.clone());
    let (a, b) = tokio::join!(
        api_a.withdraw(7, "2377225624", Points::from(70)),
        api_b.withdraw(7, "9278923470", Points::from(70)),
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(LoyaltyError::InsufficientFunds { .. }))).count(),
        1,
        "{results:?}"
    );
    let balance = AccountApi::new(db.clone()).get_balance(7).await.unwrap();
    assert_eq!(balance.current, Points::from(30));
    assert_eq!(balance.withdrawn, Points::from(70));
    assert_ledger_consistent(&db, 7).await;
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_credits_and_debits_agree_with_the_ledger() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 2, "79927398713", 100).await;
    let credits = ["9101", "9102", "9103", "9104", "9105"];
    let orders = OrderApi::new(db.clone()).with_validation(false);
    for number in credits {
        orders.submit_order(2, number).await.expect("Error submitting order");
    }
    let withdrawals = ["1234567897", "12345678903", "9876543217", "2377225624", "9278923470"];

    let mut credit_tasks = Vec::new();
    for number in credits {
        let reconciler = OrderReconciler::new(db.clone(), EventProducers::default());
        credit_tasks.push(tokio::spawn(async move {
            reconciler.reconcile(&number.into(), &AccrualStatus::Processed, Some(Points::from(10))).await
        }));
    }
    let mut debit_tasks = Vec::new();
    for number in withdrawals {
        let api = WithdrawalApi::new(db.clone());
        debit_tasks.push(tokio::spawn(async move { api.withdraw(2, number, Points::from(30)).await }));
    }
    for task in credit_tasks {
        task.await.unwrap().expect("Every credit should apply");
    }
    let mut withdrawn = 0;
    for task in debit_tasks {
        match task.await.unwrap() {
            Ok(_) => withdrawn += 1,
            Err(LoyaltyError::InsufficientFunds { .. }) => {},
            Err(e) => panic!("Unexpected withdrawal failure: {e}"),
        }
    }
    // 100 covers three withdrawals of 30 before any credit lands, and 150 covers five
    assert!((3..=5).contains(&withdrawn), "{withdrawn} withdrawals went through");

    let balance = AccountApi::new(db.clone()).get_balance(2).await.unwrap();
    assert_eq!(balance.current, Points::from(150 - 30 * withdrawn));
    assert_eq!(balance.withdrawn, Points::from(30 * withdrawn));
    let ops = db.fetch_operations_for_user(2, None).await.unwrap();
    assert_eq!(ops.iter().filter(|op| op.operation_type == OperationType::Credit).count(), 6);
    assert_eq!(ops.iter().filter(|op| op.operation_type == OperationType::Debit).count() as i64, withdrawn);
    assert_ledger_consistent(&db, 2).await;
    tear_down(db).await;
}

#[tokio::test]
async fn credits_that_would_overflow_are_refused() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 1, "79927398713", i64::MAX).await;
    OrderApi::new(db.clone()).submit_order(1, "1234567897").await.unwrap();
    let err = OrderReconciler::new(db.clone(), EventProducers::default())
        .reconcile(&"1234567897".into(), &AccrualStatus::Processed, Some(Points::from(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LoyaltyError::BadParam(_)), "{err:?}");
    let order = db.fetch_order_by_number(&"1234567897".into()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(AccountApi::new(db.clone()).get_balance(1).await.unwrap().current, Points::from(i64::MAX));
    assert_eq!(db.fetch_operations_for_user(1, None).await.unwrap().len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn withdrawal_validation() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = WithdrawalApi::new(db.clone());
    assert!(matches!(api.withdraw(0, "2377225624", Points::from(1)).await, Err(LoyaltyError::BadParam(_))));
    assert!(matches!(api.withdraw(1, "2377225625", Points::from(1)).await, Err(LoyaltyError::BadOrderNumber(_))));
    assert!(matches!(api.withdraw(1, "", Points::from(1)).await, Err(LoyaltyError::BadOrderNumber(_))));
    assert!(matches!(api.withdraw(1, "2377225624", Points::from(0)).await, Err(LoyaltyError::BadParam(_))));
    assert!(matches!(api.withdraw(1, "2377225624", Points::from(-5)).await, Err(LoyaltyError::BadParam(_))));
    // No account yet
    assert!(matches!(api.withdraw(1, "2377225624", Points::from(5)).await, Err(LoyaltyError::NotFound(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn withdrawal_history_is_oldest_first() {
    let db = prepare_test_env(&random_db_path()).await;
    fund(&db, 3, "12345678903", 100).await;
    let api = WithdrawalApi::new(db.clone());
    for (number, amount) in [("2377225624", 10), ("9278923470", 20), ("1234567897", 30)] {
        api.withdraw(3, number, Points::from(amount)).await.unwrap();
    }
    let history = AccountApi::new(db.clone()).get_withdrawal_history(3).await.unwrap();
    let amounts = history.iter().map(|w| w.amount.value()).collect::<Vec<_>>();
    assert_eq!(amounts, vec![10, 20, 30]);
    let balance = AccountApi::new(db.clone()).get_balance(3).await.unwrap();
    assert_eq!(balance.current, Points::from(40));
    assert_eq!(balance.withdrawn, Points::from(60));
    assert_ledger_consistent(&db, 3).await;
    tear_down(db).await;
}

#[tokio::test]
async fn accounts_open_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = AccountApi::new(db.clone());
    assert!(matches!(api.get_balance(9).await, Err(LoyaltyError::NotFound(_))));
    let first = api.open_account(9).await.unwrap();
    let second = api.open_account(9).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.balance, Points::from(0));
    let balance = api.get_balance(9).await.unwrap();
    assert_eq!(balance.current, Points::from(0));
    assert_eq!(balance.withdrawn, Points::from(0));
    assert!(api.get_withdrawal_history(9).await.unwrap().is_empty());
    assert!(matches!(api.open_account(-1).await, Err(LoyaltyError::BadParam(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn order_numbers_are_registered_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    let order = api.submit_order(1, "79927398713").await.unwrap();
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.user_id, 1);
    assert_eq!(order.uploaded_at, order.updated_at);

    let err = api.submit_order(1, "79927398713").await.unwrap_err();
    assert!(matches!(err, LoyaltyError::OrderAlreadyRegistered(_)));
    let err = api.submit_order(2, "79927398713").await.unwrap_err();
    assert!(matches!(err, LoyaltyError::OrderRegisteredByAnotherUser(_)));

    assert_eq!(api.orders_for_user(1).await.unwrap().len(), 1);
    assert!(api.orders_for_user(2).await.unwrap().is_empty());
    let stored = api.order_by_number(&"79927398713".into()).await.unwrap().unwrap();
    assert_eq!(stored, order);
    tear_down(db).await;
}

#[tokio::test]
async fn order_submission_validation() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    assert!(matches!(api.submit_order(1, "").await, Err(LoyaltyError::BadParam(_))));
    assert!(matches!(api.submit_order(0, "79927398713").await, Err(LoyaltyError::BadParam(_))));
    assert!(matches!(api.submit_order(1, "79927398710").await, Err(LoyaltyError::BadOrderNumber(_))));
    assert!(matches!(api.submit_order(1, "12a45").await, Err(LoyaltyError::BadOrderNumber(_))));
    // The checksum can be switched off, e.g. for trusted imports
    let lenient = OrderApi::new(db.clone()).with_validation(false);
    assert!(lenient.submit_order(1, "123456789").await.is_ok());
    tear_down(db).await;
}

#[tokio::test]
async fn concurrent_submissions_create_one_order() {
    let db = prepare_test_env(&random_db_path()).await;
    let api_a = OrderApi::new(db.clone());
    let api_b = OrderApi::new(db.clone());
    let (a, b) = tokio::join!(api_a.submit_order(1, "5555555555554444"), api_b.submit_order(2, "5555555555554444"));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let owners = [1, 2];
    let mut total = 0;
    for user in owners {
        total += api_a.orders_for_user(user).await.unwrap().len();
    }
    assert_eq!(total, 1);
    tear_down(db).await;
}

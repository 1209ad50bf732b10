use cucumber::World;
use loyalty_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    LoyaltyError,
    OrderApi,
    OrderReconciler,
    SqliteDatabase,
    WithdrawalApi,
};

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
    pub validate_numbers: bool,
    pub last_error: Option<LoyaltyError>,
    /// Used to make up order numbers for seeded balances
    pub seed_counter: u64,
}

#[derive(Debug)]
pub struct LoyaltySystem {
    pub db: SqliteDatabase,
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        Self { db }
    }
}

impl LoyaltyWorld {
    pub fn db(&self) -> SqliteDatabase {
        self.system.as_ref().expect("System not initialised").db.clone()
    }

    pub fn orders(&self) -> OrderApi<SqliteDatabase> {
        OrderApi::new(self.db()).with_validation(self.validate_numbers)
    }

    pub fn reconciler(&self) -> OrderReconciler<SqliteDatabase> {
        OrderReconciler::new(self.db(), EventProducers::default())
    }

    pub fn withdrawals(&self) -> WithdrawalApi<SqliteDatabase> {
        WithdrawalApi::new(self.db())
    }

    pub fn accounts(&self) -> AccountApi<SqliteDatabase> {
        AccountApi::new(self.db())
    }

    pub fn record<T>(&mut self, result: Result<T, LoyaltyError>) {
        self.last_error = result.err();
    }
}

/// The variant name of the error, as used in the feature files.
pub fn error_kind(err: &LoyaltyError) -> &'static str {
    match err {
        LoyaltyError::BadParam(_) => "BadParam",
        LoyaltyError::BadOrderNumber(_) => "BadOrderNumber",
        LoyaltyError::NotFound(_) => "NotFound",
        LoyaltyError::OrderAlreadyRegistered(_) => "OrderAlreadyRegistered",
        LoyaltyError::OrderRegisteredByAnotherUser(_) => "OrderRegisteredByAnotherUser",
        LoyaltyError::InsufficientFunds { .. } => "InsufficientFunds",
        LoyaltyError::UnexpectedStatus { .. } => "UnexpectedStatus",
        LoyaltyError::Transient(_) => "Transient",
    }
}

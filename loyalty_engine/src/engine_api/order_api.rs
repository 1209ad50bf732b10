use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{InsertOrderResult, LoyaltyDatabase, OrderStore, UnitOfWork},
    db_types::{NewOrder, Order, OrderNumber, UserOrder},
    helpers::is_valid_order_number,
    LoyaltyError,
};

/// `OrderApi` registers order numbers for customers. A number can only ever be registered once, by one user.
pub struct OrderApi<B> {
    db: B,
    validate_numbers: bool,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?}, validate: {})", self.db, self.validate_numbers)
    }
}

impl<B> OrderApi<B>
where B: LoyaltyDatabase
{
    pub fn new(db: B) -> Self {
        Self { db, validate_numbers: true }
    }

    /// Turns the checksum validation of order numbers on or off. It is on by default.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_numbers = validate;
        self
    }

    /// Registers `number` for the user, with status `NEW`.
    ///
    /// Submitting a number that is already registered never creates a second order. The error says whether the
    /// number belongs to this user ([`LoyaltyError::OrderAlreadyRegistered`]) or somebody else
    /// ([`LoyaltyError::OrderRegisteredByAnotherUser`]).
    pub async fn submit_order(&self, user_id: i64, number: &str) -> Result<Order, LoyaltyError> {
        if user_id <= 0 {
            return Err(LoyaltyError::BadParam(format!("Invalid user id: {user_id}")));
        }
        if number.is_empty() {
            return Err(LoyaltyError::BadParam("The order number is empty".into()));
        }
        if self.validate_numbers && !is_valid_order_number(number) {
            return Err(LoyaltyError::BadOrderNumber(number.to_string()));
        }
        let number = OrderNumber::from(number);
        let mut tx = self.db.begin().await?;
        match tx.insert_order(NewOrder::new(user_id, number.clone())).await? {
            InsertOrderResult::Inserted(order) => {
                tx.commit().await?;
                info!("📦️ Order {number} registered for user #{user_id}");
                Ok(order)
            },
            InsertOrderResult::AlreadyExists(existing) => {
                tx.rollback().await?;
                if existing.user_id == user_id {
                    debug!("📦️ User #{user_id} resubmitted order {number}");
                    Err(LoyaltyError::OrderAlreadyRegistered(number))
                } else {
                    warn!("📦️ User #{user_id} submitted order {number}, which belongs to user #{}", existing.user_id);
                    Err(LoyaltyError::OrderRegisteredByAnotherUser(number))
                }
            },
        }
    }

    /// The user's orders, oldest first, each with the points credited for it.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<UserOrder>, LoyaltyError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("📦️ User #{user_id} has {} orders", orders.len());
        Ok(orders)
    }

    pub async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, LoyaltyError> {
        Ok(self.db.fetch_order_by_number(number).await?)
    }
}

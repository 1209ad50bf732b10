use crate::db_types::Order;

#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// The order number was already taken. Carries the existing order, which may belong to another user.
    AlreadyExists(Order),
}

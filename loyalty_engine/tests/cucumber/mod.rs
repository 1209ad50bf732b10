mod loyalty_world;
mod setups;
mod steps;

pub use loyalty_world::{error_kind, LoyaltySystem, LoyaltyWorld};

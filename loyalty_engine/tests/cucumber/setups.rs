use cucumber::given;

use crate::cucumber::{LoyaltySystem, LoyaltyWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LoyaltyWorld) {
    let system = LoyaltySystem::new().await;
    world.system = Some(system);
    world.validate_numbers = true;
}

#[given("order number validation is disabled")]
async fn disable_validation(world: &mut LoyaltyWorld) {
    world.validate_numbers = false;
}

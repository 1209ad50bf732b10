//! Stateless pub-sub for engine events.
//!
//! Components of the system can subscribe to engine events and react to them, e.g. to notify a customer that points
//! have been credited. Handlers only ever see the event itself, never the engine state, and run after the change that
//! raised the event has been committed.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};

use std::{future::Future, pin::Pin, sync::Arc};

use log::debug;
use tokio::task::JoinHandle;

use crate::events::{EventHandler, EventProducer, Handler, OrderCreditedEvent};

/// The producer side of the configured hooks. Cheap to clone; hand one to every API that raises events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_credited_producer: Vec<EventProducer<OrderCreditedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_credited(&self, event: OrderCreditedEvent) {
        for producer in &self.order_credited_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_credited: Option<EventHandler<OrderCreditedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_credited = hooks.on_order_credited.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_credited }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_credited {
            result.order_credited_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured hook. Each task ends once all of its producers have been dropped.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_order_credited {
            debug!("📬️ Starting the order credited hook");
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_credited: Option<Handler<OrderCreditedEvent>>,
}

impl EventHooks {
    pub fn on_order_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_credited = Some(Arc::new(f));
        self
    }
}

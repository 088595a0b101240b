use std::{future::Future, pin::Pin, sync::Arc};

use futures_util::future::join_all;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCompletedEvent,
    OrderFailedEvent,
    TopupCreditedEvent,
};

/// The producer ends of every registered hook channel. Cloneable, and injected into the APIs that
/// raise events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_completed_producers: Vec<EventProducer<OrderCompletedEvent>>,
    pub order_failed_producers: Vec<EventProducer<OrderFailedEvent>>,
    pub topup_credited_producers: Vec<EventProducer<TopupCreditedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_completed(&self, event: OrderCompletedEvent) {
        join_all(self.order_completed_producers.iter().map(|p| p.publish_event(event.clone()))).await;
    }

    pub async fn publish_order_failed(&self, event: OrderFailedEvent) {
        join_all(self.order_failed_producers.iter().map(|p| p.publish_event(event.clone()))).await;
    }

    pub async fn publish_topup_credited(&self, event: TopupCreditedEvent) {
        join_all(self.topup_credited_producers.iter().map(|p| p.publish_event(event.clone()))).await;
    }
}

pub struct EventHandlers {
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_order_failed: Option<EventHandler<OrderFailedEvent>>,
    pub on_topup_credited: Option<EventHandler<TopupCreditedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_failed = hooks.on_order_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_topup_credited = hooks.on_topup_credited.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_completed, on_order_failed, on_topup_credited }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_failed {
            result.order_failed_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_topup_credited {
            result.topup_credited_producers.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_topup_credited {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

/// Hook registration, consumed by [`EventHandlers::new`].
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_order_failed: Option<Handler<OrderFailedEvent>>,
    pub on_topup_credited: Option<Handler<TopupCreditedEvent>>,
}

impl EventHooks {
    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn on_order_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_failed = Some(Arc::new(f));
        self
    }

    pub fn on_topup_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TopupCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_topup_credited = Some(Arc::new(f));
        self
    }
}

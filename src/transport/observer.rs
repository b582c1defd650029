//! Subscriber lists with isolated failures
//!
//! A handler that returns an error or panics is logged and skipped; the
//! remaining handlers still receive the event.

use std::panic::{self, AssertUnwindSafe};

/// Outcome of a handler call
pub type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Handler<T> = Box<dyn FnMut(&T) -> HandlerResult + Send>;

/// Token returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of event handlers
pub struct Subscribers<T> {
    name: &'static str,
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler<T>)>,
}

impl<T> Subscribers<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) -> HandlerResult + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns `false` if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn broadcast(&mut self, event: &T) -> usize {
        let mut delivered = 0;
        for (id, handler) in &mut self.handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => log::warn!("{} handler {:?} failed: {}", self.name, id, e),
                Err(_) => log::error!("{} handler {:?} panicked", self.name, id),
            }
        }
        delivered
    }
}

/// Synchronous label-keyed publish/subscribe.
///
/// Handlers run in registration order on the publishing thread. The handler
/// list is cloned before dispatch so a handler may publish, subscribe or
/// unsubscribe without deadlocking the registry.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{DomainEvent, EventKind};

pub type Handler = Rc<dyn Fn(&DomainEvent)>;

#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: Handler) {
        self.handlers.borrow_mut().entry(kind).or_default().push(handler);
    }

    /// Remove the first registration of this exact handler.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Handler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        match list.iter().position(|h| Rc::ptr_eq(h, handler)) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Dispatch to every handler of the event's kind; `false` if there were none.
    pub fn publish(&self, event: &DomainEvent) -> bool {
        let handlers = match self.handlers.borrow().get(&event.kind()) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return false,
        };
        log::debug!(
            "[foldboard.events.publish] {} to {} handler(s)",
            event.kind(),
            handlers.len()
        );
        for handler in handlers {
            handler(event);
        }
        true
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .handlers
            .borrow()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

//! Event handler registry.
//!
//! Handlers are looked up by event name. The runtime's dispatch layer owns
//! what a handler does; this registry only tracks which events exist, which
//! are raised from native code ("used") and which have a script-level body.

use std::cell::Cell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use netpolicy_core::IdentId;

#[derive(Debug)]
pub struct EventHandler {
    name: String,
    used: Cell<bool>,
    local: Cell<Option<IdentId>>,
}

pub type HandlerRef = Rc<EventHandler>;

impl EventHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            used: Cell::new(false),
            local: Cell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn set_used(&self) {
        self.used.set(true);
    }

    /// Script identifier implementing this event, if any.
    pub fn local(&self) -> Option<IdentId> {
        self.local.get()
    }

    pub fn set_local(&self, id: IdentId) {
        self.local.set(Some(id));
    }
}

#[derive(Debug, Default)]
pub struct EventRegistry {
    handlers: FxHashMap<String, HandlerRef>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<HandlerRef> {
        self.handlers.get(name).cloned()
    }

    /// Fetch the handler for `name`, creating it if needed.
    pub fn register(&mut self, name: &str) -> HandlerRef {
        self.handlers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(event = name, "event handler registered");
                Rc::new(EventHandler::new(name))
            })
            .clone()
    }

    /// Names of handlers raised by the runtime, sorted.
    pub fn used_handlers(&self) -> Vec<String> {
        self.collect(|h| h.is_used())
    }

    /// Names of handlers never raised, sorted.
    pub fn unused_handlers(&self) -> Vec<String> {
        self.collect(|h| !h.is_used())
    }

    fn collect(&self, keep: impl Fn(&EventHandler) -> bool) -> Vec<String> {
        let mut names: Vec<_> = self
            .handlers
            .values()
            .filter(|h| keep(h))
            .map(|h| h.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

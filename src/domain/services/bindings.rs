#[cfg(test)]
#[path = "bindings_test.rs"]
mod tests;

use std::sync::Arc;

use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use crate::domain::models::HostHook;
use crate::domain::models::HostHooks;

/// Keeps the tracker subscribed to every host hook.
pub struct EventBindings {
    hooks: Arc<dyn HostHooks>,
    tx: mpsc::UnboundedSender<HostHook>,
}

impl EventBindings {
    pub fn new(hooks: Arc<dyn HostHooks>, tx: mpsc::UnboundedSender<HostHook>) -> EventBindings {
        return EventBindings { hooks, tx };
    }

    pub fn register(&self) {
        for hook in HostHook::iter() {
            self.hooks.subscribe(hook, self.tx.clone());
        }

        tracing::debug!("Registered host hooks");
    }

    /// Registrations made before a reload are gone, drop whatever is left
    /// and subscribe again.
    pub fn rebind(&self) {
        self.hooks.unsubscribe_all();
        self.register();
    }
}

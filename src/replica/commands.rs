use crate::api::Command;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// CommandRegistry maps command names to handlers. Written at startup, read on every
/// ExecuteCommand call.
#[derive(Default)]
pub(crate) struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<dyn Command>>>,
}

impl CommandRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Later registrations under the same name replace earlier ones.
    pub(crate) fn register(&self, name: String, command: Arc<dyn Command>) {
        self.commands
            .write()
            .expect("CommandRegistry.register() lock poison")
            .insert(name, command);
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands
            .read()
            .expect("CommandRegistry.get() lock poison")
            .get(name)
            .cloned()
    }
}

#![forbid(unsafe_code)]

mod lifecycle;

#[cfg(test)]
mod tests;

use crate::McpServer;
use crate::controllers::forms::FormContext;
use crate::identity::Identity;
use crate::notify::ToastBuffer;
use pb_storage::SqliteStore;
use std::collections::HashMap;

impl McpServer {
    pub(crate) fn new(store: SqliteStore, identity: Box<dyn Identity>) -> Self {
        Self {
            initialized: false,
            store,
            identity,
            toasts: ToastBuffer::default(),
            boards: HashMap::new(),
        }
    }

    pub(crate) fn form_context(&mut self) -> FormContext<'_> {
        FormContext {
            store: &mut self.store,
            identity: self.identity.as_ref(),
            sink: &mut self.toasts,
        }
    }
}

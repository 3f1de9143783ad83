//! Shared context for the dispatcher and all handlers: frozen registry plus
//! the store and file capabilities. Constructed once at startup after all
//! registrations; cloning shares the same underlying state.

use crate::files::FileStore;
use crate::registry::Registry;
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AdminContext {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn DataStore>,
    pub files: Arc<dyn FileStore>,
}

impl AdminContext {
    pub fn new(registry: Registry, store: Arc<dyn DataStore>, files: Arc<dyn FileStore>) -> Self {
        AdminContext {
            registry: Arc::new(registry),
            store,
            files,
        }
    }
}

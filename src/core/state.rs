// Application state (AppState)

use crate::stores::UserStorage;
use std::sync::Arc;

/// Shared application state
///
/// Constructed once at startup and handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// User persistence backend
    pub storage: Arc<dyn UserStorage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn UserStorage>) -> Self {
        Self { storage }
    }
}

//! Application state shared across HTTP handlers.

use crate::admission::Admission;
use crate::lifecycle::Lifecycle;
use crate::stores::RentalStore;
use std::sync::Arc;

/// Shared dependencies for the API endpoints, cloned (cheaply via `Arc`)
/// per request.
#[derive(Clone)]
pub struct AppState {
    /// Order admission component.
    pub admission: Admission,
    /// Order lifecycle component.
    pub lifecycle: Lifecycle,
    /// Store handle for read-side queries.
    pub store: Arc<dyn RentalStore>,
}

impl AppState {
    /// Build the state around one store handle.
    #[must_use]
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self {
            admission: Admission::new(Arc::clone(&store)),
            lifecycle: Lifecycle::new(Arc::clone(&store)),
            store,
        }
    }
}

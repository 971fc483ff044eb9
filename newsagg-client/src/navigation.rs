//! Navigation port used by the transport's unauthorized path.

use std::sync::{Mutex, PoisonError};

use tracing::info;

/// Application-level navigation.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn navigate(&self, route: &str);
}

/// Whether `route` is one of the unauthenticated entry routes.
///
/// Matching is by prefix, so `/login?next=/admin` counts as `/login`.
pub fn is_public_route<S: AsRef<str>>(route: &str, public_routes: &[S]) -> bool {
    public_routes
        .iter()
        .any(|public| route.starts_with(public.as_ref()))
}

/// Navigator that records every navigation.
#[derive(Debug)]
pub struct InMemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl InMemoryNavigator {
    pub fn new(initial_route: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![initial_route.into()]),
        }
    }

    /// All routes visited, oldest first, including the initial one.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for InMemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for InMemoryNavigator {
    fn current_route(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, route: &str) {
        info!(route, "navigating");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}

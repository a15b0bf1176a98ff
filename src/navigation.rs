//! Navigation contract
//!
//! The console does not own routing. It only needs to know the current route
//! and to push a new one when the session expires. `HistoryNavigator` is an
//! in-memory router used by the CLI and by tests.

use parking_lot::Mutex;

/// Router primitives consumed by the session-expiry interceptor
pub trait Navigator: Send + Sync {
    /// Path of the route currently displayed
    fn current_path(&self) -> String;

    /// Navigate to `path`
    fn push(&self, path: &str);
}

/// In-memory route history
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    /// Create a navigator positioned on `initial`
    pub fn new(initial: &str) -> Self {
        Self {
            history: Mutex::new(vec![initial.to_string()]),
        }
    }

    /// Every route visited, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Number of `push` calls that targeted `path`
    pub fn visits(&self, path: &str) -> usize {
        self.history.lock().iter().skip(1).filter(|p| p.as_str() == path).count()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn push(&self, path: &str) {
        self.history.lock().push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_moves_current_path() {
        let nav = HistoryNavigator::new("/dashboard");
        assert_eq!(nav.current_path(), "/dashboard");

        nav.push("/login");
        assert_eq!(nav.current_path(), "/login");
        assert_eq!(nav.history(), vec!["/dashboard", "/login"]);
    }

    #[test]
    fn test_visits_ignore_initial_route() {
        let nav = HistoryNavigator::new("/login");
        assert_eq!(nav.visits("/login"), 0);

        nav.push("/login");
        assert_eq!(nav.visits("/login"), 1);
    }
}

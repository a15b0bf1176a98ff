//! Root Store
//!
//! Composes the session and every resource module around one API client.
//!
//! ```text
//! views ──► ConsoleStore ──► module action ──► Authorized guard ──► ApiClient ──► master
//!              │                   │                                   │
//!              │                   └── mutation (write lock) ◄─────────┤
//!              └── getters / snapshot                                  └── SessionExpiryInterceptor
//!                                                                          (401 → logout + /login)
//! ```
//!
//! Modules never see each other; the only shared piece is the read-only
//! `AuthState` handed to the API client at construction.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::auth::{AuthHeader, AuthModule, AuthState, Claims, Credentials};
use crate::config::Config;
use crate::http::{ApiClient, SessionExpiryInterceptor};
use crate::navigation::Navigator;
use crate::slaves::{Slave, SlavesModule};
use crate::status::{StatusModule, StatusSnapshot};
use crate::targets::{Target, TargetsModule};
use crate::traces::{GraphWindow, TraceRecord, TracesModule};
use crate::users::{User, UsersModule};

/// Serializable view of the whole state tree.
///
/// The raw token is left out; `authorized` and `claims` describe the session.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub authorized: bool,
    pub claims: Claims,
    pub status: StatusSnapshot,
    pub slaves: Vec<Slave>,
    pub targets: Vec<Target>,
    pub users: Vec<User>,
    pub traces: Vec<TraceRecord>,
    pub graph: GraphWindow,
}

/// Which read actions succeeded during `refresh_all`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub status: bool,
    pub slaves: bool,
    pub targets: bool,
    pub users: bool,
    pub traces: bool,
}

impl RefreshReport {
    pub fn all_ok(&self) -> bool {
        self.status && self.slaves && self.targets && self.users && self.traces
    }
}

/// The console's state container
pub struct ConsoleStore {
    config: Config,
    api: ApiClient,
    auth: AuthModule,
    status: StatusModule,
    slaves: SlavesModule,
    targets: TargetsModule,
    users: UsersModule,
    traces: TracesModule,
}

impl ConsoleStore {
    /// Build the store; `navigator` is the router the interceptor redirects with
    pub fn new(config: Config, navigator: Arc<dyn Navigator>) -> Self {
        let auth_state = Arc::new(AuthState::new());
        let interceptor = Arc::new(SessionExpiryInterceptor::new(
            auth_state.clone(),
            navigator.clone(),
            &config.login_route,
        ));
        let api = ApiClient::new(&config.api_url, auth_state.clone()).with_interceptor(interceptor);

        debug!(api_url = %config.api_url, "Console store created");

        Self {
            auth: AuthModule::new(auth_state, api.clone(), navigator, &config.login_route),
            status: StatusModule::new(api.clone(), &config),
            slaves: SlavesModule::new(api.clone(), &config),
            targets: TargetsModule::new(api.clone(), &config),
            users: UsersModule::new(api.clone(), &config),
            traces: TracesModule::new(api.clone(), &config),
            api,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> &AuthModule {
        &self.auth
    }

    pub fn status(&self) -> &StatusModule {
        &self.status
    }

    pub fn slaves(&self) -> &SlavesModule {
        &self.slaves
    }

    pub fn targets(&self) -> &TargetsModule {
        &self.targets
    }

    pub fn users(&self) -> &UsersModule {
        &self.users
    }

    pub fn traces(&self) -> &TracesModule {
        &self.traces
    }

    pub fn is_authorized(&self) -> bool {
        self.auth.is_authorized()
    }

    pub fn auth_header(&self) -> AuthHeader {
        self.auth.auth_header()
    }

    pub async fn login(&self, credentials: &Credentials) -> bool {
        self.auth.fetch_auth_token(credentials).await
    }

    pub fn logout(&self) {
        self.auth.logout();
    }

    /// Dispatch every read action concurrently
    pub async fn refresh_all(&self, limit: u32) -> RefreshReport {
        let (status, slaves, targets, users, traces) = futures_util::join!(
            self.status.fetch_status(),
            self.slaves.fetch(limit),
            self.targets.fetch(limit),
            self.users.fetch(limit),
            self.traces.fetch_traces(limit),
        );

        RefreshReport {
            status,
            slaves,
            targets,
            users,
            traces,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            authorized: self.auth.is_authorized(),
            claims: self.auth.claims(),
            status: self.status.status(),
            slaves: self.slaves.items(),
            targets: self.targets.items(),
            users: self.users.items(),
            traces: self.traces.traces(),
            graph: self.traces.graph(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::HistoryNavigator;

    fn store() -> ConsoleStore {
        ConsoleStore::new(Config::default(), Arc::new(HistoryNavigator::default()))
    }

    #[test]
    fn test_new_store_is_empty_and_logged_out() {
        let store = store();
        let snapshot = store.snapshot();

        assert!(!snapshot.authorized);
        assert!(snapshot.claims.is_empty());
        assert!(snapshot.slaves.is_empty());
        assert!(snapshot.targets.is_empty());
        assert!(snapshot.users.is_empty());
        assert_eq!(snapshot.status.uptime, "n/a");
    }

    #[tokio::test]
    async fn test_refresh_all_unauthorized_is_noop() {
        let store = store();
        let report = store.refresh_all(10).await;

        assert_eq!(report, RefreshReport::default());
        assert!(!report.all_ok());
    }

    #[test]
    fn test_snapshot_hides_token() {
        let store = store();
        store.auth().state().set_token("T1").unwrap();

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        assert!(json.contains("\"authorized\":true"));
        assert!(!json.contains("T1"));
    }

    #[test]
    fn test_logout_moves_to_login_route() {
        let nav = Arc::new(HistoryNavigator::new("/dashboard"));
        let store = ConsoleStore::new(Config::default(), nav.clone());
        store.auth().state().set_token("T1").unwrap();

        store.logout();

        assert!(!store.is_authorized());
        assert_eq!(nav.current_path(), "/login");
    }
}

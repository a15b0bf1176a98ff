//! disttrace-console
//!
//! Client-side state layer of the dist-traceroute admin console.
//!
//! # Features
//!
//! - **Session**: bearer-token login with decoded JWT claims
//! - **Authorization guard**: every authenticated call goes through one capability check
//! - **Session expiry**: HTTP 401 clears the session and redirects to the login route
//! - **Resource modules**: slaves, targets and users mirrored with local reconciliation
//! - **Read-only mirrors**: master status, trace history, hop graph windows
//! - **Fetch sequencing**: stale list responses never overwrite newer ones
//!
//! # Architecture
//!
//! ```text
//! UI / Router ──► ConsoleStore ──► ApiClient ──► dist-traceroute master (/api)
//!                    │                │
//!                    ├── AuthModule    └── SessionExpiryInterceptor ──► Navigator
//!                    ├── StatusModule
//!                    ├── SlavesModule / TargetsModule / UsersModule
//!                    └── TracesModule
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod resource;
pub mod slaves;
pub mod status;
pub mod store;
pub mod targets;
pub mod traces;
pub mod users;

pub use auth::{AuthHeader, AuthModule, AuthState, Claims, Credentials};
pub use config::Config;
pub use error::{ApiError, AuthError};
pub use http::{ApiClient, Authorized, ResponseInterceptor, SessionExpiryInterceptor};
pub use navigation::{HistoryNavigator, Navigator};
pub use resource::{Collection, DeleteReceipt, Entity, EntityId, Resource, ResourceModule};
pub use slaves::{NewSlave, Slave, SlavesModule};
pub use status::{StatusModule, StatusSnapshot};
pub use store::{ConsoleStore, RefreshReport, StoreSnapshot};
pub use targets::{NewTarget, Target, TargetsModule};
pub use traces::{GraphQuery, GraphWindow, TraceRecord, TracesModule};
pub use users::{NewUser, User, UsersModule};

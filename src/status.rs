//! Master Status
//!
//! Read-only snapshot of the master: uptime and the configuration last
//! handed to a slave.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::ApiClient;
use crate::resource::FetchSequencer;

/// Status record served by `/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StatusSnapshot {
    pub uptime: String,
    pub current_master_config: Value,
    pub last_slave_config_time: String,
    pub last_slave_config: Value,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            uptime: "n/a".to_string(),
            current_master_config: Value::Object(Default::default()),
            last_slave_config_time: "n/a".to_string(),
            last_slave_config: Value::Object(Default::default()),
        }
    }
}

/// Store module owning the status snapshot
pub struct StatusModule {
    api: ApiClient,
    status: RwLock<StatusSnapshot>,
    sequencer: FetchSequencer,
}

impl StatusModule {
    pub fn new(api: ApiClient, config: &Config) -> Self {
        Self {
            api,
            status: RwLock::new(StatusSnapshot::default()),
            sequencer: FetchSequencer::new(config.sequenced_fetch),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.read().clone()
    }

    pub fn set_status(&self, status: StatusSnapshot) {
        *self.status.write() = status;
    }

    /// Replace the snapshot with the master's current status
    pub async fn fetch_status(&self) -> bool {
        let Some(api) = self.api.authorized() else {
            debug!("Not authorized, skipping status fetch");
            return false;
        };

        let ticket = self.sequencer.ticket();
        match api.get::<StatusSnapshot>("/status", &[]).await {
            Ok(snapshot) => {
                let mut status = self.status.write();
                if !self.sequencer.try_commit(ticket) {
                    debug!(ticket, "Discarding stale status response");
                    return false;
                }
                *status = snapshot;
                true
            }
            Err(e) => {
                warn!("Status fetch failed: {}", e);
                false
            }
        }
    }
}

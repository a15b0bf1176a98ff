//! Traces
//!
//! Trace history and per-destination hop graph data. Both are read-only
//! mirrors replaced wholesale on every fetch.

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::ApiClient;
use crate::resource::{EntityId, FetchSequencer};

/// One traceroute run as listed by `/traces`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceRecord {
    #[serde(rename = "TraceID")]
    pub trace_id: EntityId,
    #[serde(rename = "SlaveID")]
    pub slave_id: EntityId,
    #[serde(default)]
    pub slave_name: String,
    #[serde(rename = "DestID")]
    pub dest_id: EntityId,
    #[serde(default)]
    pub dest_name: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub hop_cnt: i64,
    /// Per-hop details, JSON-encoded by the master
    #[serde(rename = "DetailJSON", default)]
    pub detail_json: String,
}

/// Hop graph for one destination, bounded by the first and last trace start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphWindow {
    #[serde(rename = "Data", default, deserialize_with = "sequence_or_empty")]
    pub data: Vec<Value>,
    #[serde(rename = "Start", default)]
    pub start: String,
    #[serde(rename = "End", default)]
    pub end: String,
}

/// The master answers `{}` instead of `[]` when a destination has no hops
fn sequence_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// Parameters of a graph fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQuery {
    /// Destination (target) identifier
    pub dest: String,
    /// Hops to skip from the source side
    #[serde(default)]
    pub skip: u32,
    /// Restrict to the traces of one slave
    #[serde(default)]
    pub slave: Option<String>,
}

impl GraphQuery {
    pub fn new(dest: &str, skip: u32) -> Self {
        Self {
            dest: dest.to_string(),
            skip,
            slave: None,
        }
    }

    pub fn with_slave(mut self, slave: &str) -> Self {
        self.slave = Some(slave.to_string());
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("dest", self.dest.clone()), ("skip", self.skip.to_string())];
        if let Some(slave) = &self.slave {
            query.push(("slaveID", slave.clone()));
        }
        query
    }
}

/// Store module owning trace history and graph data
pub struct TracesModule {
    api: ApiClient,
    traces: RwLock<Vec<TraceRecord>>,
    graph: RwLock<GraphWindow>,
    traces_seq: FetchSequencer,
    graph_seq: FetchSequencer,
}

impl TracesModule {
    pub fn new(api: ApiClient, config: &Config) -> Self {
        Self {
            api,
            traces: RwLock::new(Vec::new()),
            graph: RwLock::new(GraphWindow::default()),
            traces_seq: FetchSequencer::new(config.sequenced_fetch),
            graph_seq: FetchSequencer::new(config.sequenced_fetch),
        }
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn traces(&self) -> Vec<TraceRecord> {
        self.traces.read().clone()
    }

    pub fn graph(&self) -> GraphWindow {
        self.graph.read().clone()
    }

    pub fn graph_data(&self) -> Vec<Value> {
        self.graph.read().data.clone()
    }

    pub fn graph_start(&self) -> String {
        self.graph.read().start.clone()
    }

    pub fn graph_end(&self) -> String {
        self.graph.read().end.clone()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn set_traces(&self, traces: Vec<TraceRecord>) {
        *self.traces.write() = traces;
    }

    /// Data and window bounds are always replaced together
    pub fn set_graph(&self, graph: GraphWindow) {
        *self.graph.write() = graph;
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Replace the trace history with the latest `limit` runs
    pub async fn fetch_traces(&self, limit: u32) -> bool {
        let Some(api) = self.api.authorized() else {
            debug!("Not authorized, skipping traces fetch");
            return false;
        };

        let ticket = self.traces_seq.ticket();
        let result = api
            .get::<Option<Vec<TraceRecord>>>("/traces", &[("limit", limit.to_string())])
            .await;

        match result {
            Ok(records) => {
                let mut traces = self.traces.write();
                if !self.traces_seq.try_commit(ticket) {
                    debug!(ticket, "Discarding stale traces response");
                    return false;
                }
                *traces = records.unwrap_or_default();
                debug!(count = traces.len(), "Traces replaced");
                true
            }
            Err(e) => {
                warn!("Traces fetch failed: {}", e);
                false
            }
        }
    }

    /// Replace the graph window for one destination
    pub async fn fetch_graph_data(&self, query: &GraphQuery) -> bool {
        let Some(api) = self.api.authorized() else {
            debug!("Not authorized, skipping graph fetch");
            return false;
        };

        let ticket = self.graph_seq.ticket();
        match api.get::<GraphWindow>("/graph", &query.to_query()).await {
            Ok(window) => {
                let mut graph = self.graph.write();
                if !self.graph_seq.try_commit(ticket) {
                    debug!(ticket, dest = %query.dest, "Discarding stale graph response");
                    return false;
                }
                *graph = window;
                true
            }
            Err(e) => {
                warn!(dest = %query.dest, "Graph fetch failed: {}", e);
                false
            }
        }
    }
}

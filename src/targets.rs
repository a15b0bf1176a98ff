//! Targets
//!
//! Destinations the slaves trace towards, with per-target probe settings.

use serde::{Deserialize, Serialize};

use crate::resource::{Entity, EntityId, Resource, ResourceModule};

/// Trace target as served by `/targets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    #[serde(rename = "ID")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub retries: i32,
    #[serde(default)]
    pub max_hops: i32,
    #[serde(default, alias = "Timeout")]
    pub timeout_ms: i32,
}

impl Entity for Target {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Payload for creating a target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewTarget {
    pub name: String,
    pub address: String,
    pub retries: i32,
    pub max_hops: i32,
    /// Probe timeout in milliseconds
    pub timeout: i32,
}

pub struct Targets;

impl Resource for Targets {
    type Entity = Target;
    type Draft = NewTarget;

    const NAME: &'static str = "targets";
    const PATH: &'static str = "/targets";

    fn create_query(draft: &NewTarget) -> Vec<(&'static str, String)> {
        vec![
            ("name", draft.name.clone()),
            ("address", draft.address.clone()),
            ("retries", draft.retries.to_string()),
            ("maxHops", draft.max_hops.to_string()),
            ("timeout", draft.timeout.to_string()),
        ]
    }
}

pub type TargetsModule = ResourceModule<Targets>;

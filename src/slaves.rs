//! Slaves
//!
//! Traceroute probes registered on the master. A slave authenticates with
//! its name and secret when it pulls its configuration.

use serde::{Deserialize, Serialize};

use crate::resource::{Entity, EntityId, Resource, ResourceModule};

/// Slave record as served by `/slaves`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Slave {
    #[serde(rename = "ID")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub secret: String,
}

impl Entity for Slave {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Payload for creating a slave
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewSlave {
    pub name: String,
    pub secret: String,
}

pub struct Slaves;

impl Resource for Slaves {
    type Entity = Slave;
    type Draft = NewSlave;

    const NAME: &'static str = "slaves";
    const PATH: &'static str = "/slaves";

    fn create_query(draft: &NewSlave) -> Vec<(&'static str, String)> {
        vec![("name", draft.name.clone()), ("secret", draft.secret.clone())]
    }
}

pub type SlavesModule = ResourceModule<Slaves>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_query() {
        let draft = NewSlave {
            name: "probe1".to_string(),
            secret: "s3cr3t".to_string(),
        };
        assert_eq!(
            Slaves::create_query(&draft),
            vec![("name", "probe1".to_string()), ("secret", "s3cr3t".to_string())]
        );
    }

    #[test]
    fn test_slave_wire_format() {
        let slave: Slave = serde_json::from_value(json!({
            "ID": "0d3c5a8e-5f7e-4a43-9d6b-8d7c0f1e2a11",
            "Name": "probe1",
            "Secret": "s3cr3t"
        }))
        .unwrap();
        assert_eq!(slave.name, "probe1");
        assert_eq!(slave.id.to_string(), "0d3c5a8e-5f7e-4a43-9d6b-8d7c0f1e2a11");

        let back = serde_json::to_value(&slave).unwrap();
        assert_eq!(back["ID"], "0d3c5a8e-5f7e-4a43-9d6b-8d7c0f1e2a11");
        assert_eq!(back["Secret"], "s3cr3t");
    }
}

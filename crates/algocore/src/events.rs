use crate::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle and advisory notification published on a node's channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEvent {
    pub node_id: NodeId,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub kind: NodeEventKind,
}

impl NodeEvent {
    pub(crate) fn now(node_id: NodeId, label: &str, kind: NodeEventKind) -> Self {
        Self {
            node_id,
            label: label.to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEventKind {
    Started,
    Finished,
    /// Advisory error relayed along graph edges. Each listener decides what
    /// to do with it; nothing is halted by the broadcast itself.
    Aborted { origin: NodeId, message: String },
}

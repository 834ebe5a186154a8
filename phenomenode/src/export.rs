// export.rs — Serializable diagram export and structural fingerprint
//
// `DiagramExport` is what an external renderer consumes: one record per node
// of the tree (stable key, label, kind, has-children flag, depth, parent)
// and the flattened producer → varnode → consumer triples between leaves.
//
// The fingerprint is the SHA-256 of the compact JSON encoding, so two
// builds of the same tree hash identically.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::ContextFormat;
use crate::error::Result;
use crate::id::NodeId;
use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: String,
    pub label: String,
    pub kind: String,
    pub has_children: bool,
    pub depth: usize,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub source: Option<String>,
    pub source_index: Option<usize>,
    pub varnode: String,
    pub sink: Option<String>,
    pub sink_index: Option<usize>,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramExport {
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<ConnectionRecord>,
}

impl DiagramExport {
    /// Export the tree under `root`, root first, then descendants pre-order.
    pub fn from_tree(model: &Model, root: NodeId, mode: ContextFormat) -> Result<Self> {
        let mut ids = vec![root];
        ids.extend(model.descendants(root)?);

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let node = model.node(id)?;
            nodes.push(NodeRecord {
                key: id.to_string(),
                label: node.label(),
                kind: node.kind().name().to_string(),
                has_children: !node.is_leaf(),
                depth: model.depth(id)?,
                parent: node.parent().filter(|_| id != root).map(|p| p.to_string()),
            });
        }

        let mut connections = Vec::new();
        for c in model.connections(root)? {
            connections.push(ConnectionRecord {
                source: c.source.map(|n| n.to_string()),
                source_index: c.source_index,
                varnode: c.varnode.to_string(),
                sink: c.sink.map(|n| n.to_string()),
                sink_index: c.sink_index,
                label: model.label(c.varnode, mode)?,
            });
        }
        Ok(DiagramExport { nodes, connections })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 over the compact JSON encoding.
pub fn fingerprint(export: &DiagramExport) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(export)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

//! Serializable snapshots of nodes, links and whole graphs.
//!
//! A [`NodeSnapshot`] is the shape captured before any destructive operation
//! and the shape stored on the clipboard: id, kind, geometry, attributes,
//! properties, flags, ports, parent and embedded-children ids. It is
//! detached from the live graph and safe to keep across arbitrary mutations.

use crate::error::GraphError;
use crate::factory::NodeFactory;
use crate::id::NodeId;
use crate::model::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    /// Explicit kind. When absent the kind is re-derived from shape, label
    /// and flags on restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    pub position: Point,
    pub size: Size,
    pub style: NodeStyle,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub flags: NodeFlags,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<NodeId>,
}

impl NodeSnapshot {
    pub fn capture(node: &Node) -> Self {
        Self {
            id: node.id,
            kind: Some(node.kind),
            position: node.position,
            size: node.size,
            style: node.style.clone(),
            properties: node.properties.clone(),
            flags: node.flags,
            ports: node.ports.to_vec(),
            parent: node.parent(),
            embeds: node.embeds().to_vec(),
        }
    }

    pub fn resolve_kind(&self) -> Result<NodeKind, GraphError> {
        match self.kind {
            Some(kind) => Ok(kind),
            None => NodeKind::infer(self.style.shape, &self.style.label, &self.flags).ok_or_else(|| {
                GraphError::UnknownKind {
                    id: self.id,
                    shape: self.style.shape.as_str().to_string(),
                }
            }),
        }
    }

    /// Rebuild a detached node: factory defaults for the kind first, then the
    /// captured size, attributes, properties, flags and exact port set.
    pub fn rebuild(&self, factory: &dyn NodeFactory) -> Result<Node, GraphError> {
        let kind = self.resolve_kind()?;
        let mut node = factory.create(self.id, kind, self.position);
        node.size = self.size;
        node.style = self.style.clone();
        node.properties = self.properties.clone();
        node.flags = self.flags;
        node.ports = self.ports.iter().cloned().collect();
        Ok(node)
    }

    /// Rebuild and insert, keeping the original id. The node is added only
    /// once fully restored; embedding is left to the caller.
    pub fn restore(&self, graph: &mut FlowGraph, factory: &dyn NodeFactory) -> Result<NodeId, GraphError> {
        let node = self.rebuild(factory)?;
        graph.add_node(node)?;
        Ok(self.id)
    }

    /// Copy of this snapshot under a new identity and position, with no
    /// embedding relations.
    pub fn relocated(&self, id: NodeId, position: Point) -> Self {
        Self {
            id,
            position,
            parent: None,
            embeds: Vec::new(),
            ..self.clone()
        }
    }
}

/// Re-add a captured link if both endpoints resolve. A link whose
/// counterpart has since been removed is dropped.
pub fn restore_link(graph: &mut FlowGraph, link: &Link) -> bool {
    if !graph.contains(link.source.node) || !graph.contains(link.target.node) {
        log::debug!(
            "dropping link {}: endpoint {} or {} no longer exists",
            link.id,
            link.source.node,
            link.target.node
        );
        return false;
    }
    if graph.link(link.id).is_some() {
        return true;
    }
    match graph.add_link(link.clone()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to restore link {}: {e}", link.id);
            false
        }
    }
}

/// Canonical image of a whole graph. Node, link and embed order are sorted by
/// id so that two graphs with the same content compare equal regardless of
/// insertion history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<Link>,
}

impl GraphSnapshot {
    pub fn capture(graph: &FlowGraph) -> Self {
        let mut nodes: Vec<NodeSnapshot> = graph
            .nodes()
            .map(|n| {
                let mut snap = NodeSnapshot::capture(n);
                snap.embeds.sort_by_key(|id| id.as_str());
                snap
            })
            .collect();
        nodes.sort_by_key(|n| n.id.as_str());
        let mut links: Vec<Link> = graph.links().cloned().collect();
        links.sort_by_key(|l| l.id.as_str());
        Self { nodes, links }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Replace the contents of `graph` with this snapshot. On error `graph`
    /// is left untouched.
    pub fn restore_into(&self, graph: &mut FlowGraph, factory: &dyn NodeFactory) -> Result<(), GraphError> {
        let mut fresh = FlowGraph::new();
        for node in &self.nodes {
            node.restore(&mut fresh, factory)?;
        }
        for link in &self.links {
            fresh.add_link(link.clone())?;
        }
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                fresh.embed(parent, node.id);
            }
        }
        graph.replace_with(fresh);
        Ok(())
    }
}

//! Node commands: create, delete (single and multi), move, resize and
//! property change.

use crate::commands::{Command, CommandMeta, CommandOutput};
use crate::context::Document;
use crate::error::CommandError;
use flow_core::{
    GraphError, Link, LinkId, NodeId, NodeKind, NodeSnapshot, Point, Ports, Properties, Size, case_index,
    restore_link,
};
use serde_json::Value;
use std::collections::HashSet;

// ─── Create ──────────────────────────────────────────────────────────────

/// Overrides applied on top of the factory defaults when creating a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOptions {
    pub label: Option<String>,
    pub size: Option<Size>,
    pub properties: Properties,
}

#[derive(Debug)]
pub struct CreateNodeCommand {
    meta: CommandMeta,
    kind: NodeKind,
    position: Point,
    options: NodeOptions,
    /// Filled on first execute; redo restores from it with the same id.
    snapshot: Option<NodeSnapshot>,
}

impl CreateNodeCommand {
    pub fn new(kind: NodeKind, position: Point, options: NodeOptions) -> Self {
        Self {
            meta: CommandMeta::new(format!("Create {} node", kind.id_prefix())),
            kind,
            position,
            options,
            snapshot: None,
        }
    }

    /// Recreate exactly the node described by `snapshot`, id included.
    pub fn from_snapshot(snapshot: NodeSnapshot) -> Result<Self, GraphError> {
        let kind = snapshot.resolve_kind()?;
        Ok(Self {
            meta: CommandMeta::new(format!("Create {} node", kind.id_prefix())),
            kind,
            position: snapshot.position,
            options: NodeOptions::default(),
            snapshot: Some(snapshot),
        })
    }

    /// Id of the created node, once executed.
    pub fn node_id(&self) -> Option<NodeId> {
        self.snapshot.as_ref().map(|s| s.id)
    }
}

impl Command for CreateNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        if let Some(snapshot) = &self.snapshot {
            let id = snapshot.restore(&mut doc.graph, doc.factory.as_ref())?;
            return Ok(CommandOutput::Node(id));
        }

        let id = doc.graph.fresh_node_id(self.kind.id_prefix());
        let mut node = doc.factory.create(id, self.kind, self.position);
        if let Some(label) = &self.options.label {
            node.style.label = label.clone();
        }
        if let Some(size) = self.options.size {
            node.size = size;
        }
        for (key, value) in &self.options.properties {
            node.properties.insert(key.clone(), value.clone());
        }
        if self.kind == NodeKind::Switch && self.options.properties.contains_key("cases") {
            node.ports = doc.factory.switch_ports(&node.switch_cases());
        }

        self.snapshot = Some(NodeSnapshot::capture(&node));
        doc.graph.add_node(node)?;
        Ok(CommandOutput::Node(id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        let Some(id) = self.node_id() else {
            return Ok(());
        };
        doc.context.release_node(id);
        if doc.graph.remove_node(id).is_none() {
            log::warn!("undo create: node {id} already gone");
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

// ─── Delete ──────────────────────────────────────────────────────────────

/// Everything needed to bring a set of deleted nodes back: node snapshots
/// (with parent and embedded-children ids) and every touching link, all
/// captured from the untouched graph before anything is removed.
#[derive(Debug, Clone)]
struct Tombstone {
    nodes: Vec<NodeSnapshot>,
    links: Vec<Link>,
}

impl Tombstone {
    fn capture(doc: &Document, ids: &[NodeId]) -> Result<Self, CommandError> {
        let mut seen: HashSet<LinkId> = HashSet::new();
        let mut links = Vec::new();
        for id in ids {
            for link in doc.graph.links_touching(*id) {
                if seen.insert(link.id) {
                    links.push(link.clone());
                }
            }
        }

        let nodes = ids
            .iter()
            .map(|id| {
                doc.graph
                    .node(*id)
                    .map(NodeSnapshot::capture)
                    .ok_or(CommandError::Graph(GraphError::NodeNotFound(*id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes, links })
    }

    fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    fn bury(&self, doc: &mut Document) -> Vec<NodeId> {
        let mut removed = Vec::with_capacity(self.nodes.len());
        for snapshot in &self.nodes {
            let id = snapshot.id;
            doc.context.release_node(id);
            for link in &self.links {
                if link.touches(id) {
                    doc.context.release_link(link.id);
                }
            }
            if doc.graph.remove_node(id).is_some() {
                removed.push(id);
            } else {
                log::warn!("delete: node {id} already gone");
            }
        }
        removed
    }

    /// Restore in dependency order: nodes, links, child→parent relations,
    /// then container→children relations. Returns how many nodes came back.
    ///
    /// An id collision aborts the whole restore and removes the nodes
    /// already re-added, so the graph is left as it was.
    fn revive(&self, doc: &mut Document) -> Result<usize, CommandError> {
        let mut revived = Vec::with_capacity(self.nodes.len());
        for snapshot in &self.nodes {
            match snapshot.restore(&mut doc.graph, doc.factory.as_ref()) {
                Ok(id) => revived.push(id),
                Err(e @ GraphError::DuplicateNodeId(_)) => {
                    for id in revived {
                        doc.graph.remove_node(id);
                    }
                    return Err(e.into());
                }
                Err(e) => log::error!("could not restore node {}: {e}", snapshot.id),
            }
        }
        let restored = revived.len();

        for link in &self.links {
            restore_link(&mut doc.graph, link);
        }

        for snapshot in &self.nodes {
            if let Some(parent) = snapshot.parent
                && doc.graph.contains(parent)
                && doc.graph.contains(snapshot.id)
            {
                doc.graph.embed(parent, snapshot.id);
            }
        }

        for snapshot in &self.nodes {
            if !doc.graph.contains(snapshot.id) {
                continue;
            }
            for child in &snapshot.embeds {
                if doc.graph.contains(*child) {
                    doc.graph.embed(snapshot.id, *child);
                }
            }
        }

        if restored < self.nodes.len() {
            log::warn!("restored {restored} of {} deleted nodes", self.nodes.len());
        }
        Ok(restored)
    }
}

#[derive(Debug)]
pub struct DeleteNodeCommand {
    meta: CommandMeta,
    id: NodeId,
    tombstone: Tombstone,
}

impl DeleteNodeCommand {
    /// Captures the node, its links, its parent and its embedded children.
    pub fn new(doc: &Document, id: NodeId) -> Result<Self, CommandError> {
        Ok(Self {
            meta: CommandMeta::new(format!("Delete {id}")),
            id,
            tombstone: Tombstone::capture(doc, &[id])?,
        })
    }

    pub fn snapshot(&self) -> &NodeSnapshot {
        &self.tombstone.nodes[0]
    }

    pub fn captured_links(&self) -> &[Link] {
        &self.tombstone.links
    }
}

impl Command for DeleteNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        if self.tombstone.bury(doc).is_empty() {
            return Ok(CommandOutput::None);
        }
        Ok(CommandOutput::Node(self.id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        self.tombstone.revive(doc)?;
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

/// Deletes several nodes as one step. Links between deleted nodes survive
/// the round trip because they are captured before the first removal.
#[derive(Debug)]
pub struct MultiNodeDeleteCommand {
    meta: CommandMeta,
    tombstone: Tombstone,
}

impl MultiNodeDeleteCommand {
    pub fn new(doc: &Document, ids: &[NodeId]) -> Result<Self, CommandError> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        Ok(Self {
            meta: CommandMeta::new(format!("Delete {} nodes", unique.len())),
            tombstone: Tombstone::capture(doc, &unique)?,
        })
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.tombstone.ids()
    }

    pub fn captured_links(&self) -> &[Link] {
        &self.tombstone.links
    }
}

impl Command for MultiNodeDeleteCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        Ok(CommandOutput::Nodes(self.tombstone.bury(doc)))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        let restored = self.tombstone.revive(doc)?;
        log::debug!("multi-delete undo restored {restored}/{} nodes", self.tombstone.nodes.len());
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

// ─── Move / Resize ───────────────────────────────────────────────────────

/// Embedded children that travel with moved containers, as
/// `(child, before, after)`. Both ends are stored so undo and redo put
/// every child back at its exact coordinates.
pub type CarriedPositions = Vec<(NodeId, Point, Point)>;

/// Pair each `(child, before)` with the child's current position.
pub(crate) fn settle_carried(doc: &Document, before: Vec<(NodeId, Point)>) -> CarriedPositions {
    before
        .into_iter()
        .filter_map(|(child, from)| doc.graph.node(child).map(|n| (child, from, n.position)))
        .collect()
}

pub(crate) fn place_carried(doc: &mut Document, carried: &[(NodeId, Point, Point)], after: bool) {
    for (child, from, to) in carried {
        doc.graph.set_position(*child, if after { *to } else { *from });
    }
}

/// Pure geometry: sets a position, never re-evaluates embedding.
#[derive(Debug)]
pub struct MoveNodeCommand {
    meta: CommandMeta,
    id: NodeId,
    from: Point,
    to: Point,
    /// Filled on first execute unless supplied up front.
    carried: Option<CarriedPositions>,
}

impl MoveNodeCommand {
    pub fn new(id: NodeId, from: Point, to: Point) -> Self {
        Self {
            meta: CommandMeta::new(format!("Move {id}")),
            id,
            from,
            to,
            carried: None,
        }
    }

    /// Record a move whose children were already placed, e.g. by a drag.
    pub fn with_carried(mut self, carried: CarriedPositions) -> Self {
        self.carried = Some(carried);
        self
    }
}

impl Command for MoveNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        if !doc.graph.contains(self.id) {
            log::warn!("move: node {} not found", self.id);
            return Ok(CommandOutput::None);
        }
        match &self.carried {
            Some(carried) => {
                doc.graph.set_position(self.id, self.to);
                place_carried(doc, carried, true);
            }
            None => {
                let before = doc.graph.embedded_positions(self.id);
                doc.graph.move_node(self.id, self.to);
                self.carried = Some(settle_carried(doc, before));
            }
        }
        Ok(CommandOutput::Node(self.id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        if !doc.graph.set_position(self.id, self.from) {
            log::warn!("undo move: node {} not found", self.id);
            return Ok(());
        }
        if let Some(carried) = &self.carried {
            place_carried(doc, carried, false);
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

#[derive(Debug)]
pub struct ResizeContainerCommand {
    meta: CommandMeta,
    id: NodeId,
    old: Size,
    new: Size,
}

impl ResizeContainerCommand {
    pub fn new(doc: &Document, id: NodeId, new: Size) -> Result<Self, CommandError> {
        let node = doc.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if !node.flags.is_resizable {
            log::debug!("resizing {id}, which is not flagged resizable");
        }
        Ok(Self {
            meta: CommandMeta::new(format!("Resize {id}")),
            id,
            old: node.size,
            new,
        })
    }
}

impl Command for ResizeContainerCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        if !doc.graph.resize(self.id, self.new) {
            log::warn!("resize: node {} not found", self.id);
            return Ok(CommandOutput::None);
        }
        Ok(CommandOutput::Node(self.id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        if !doc.graph.resize(self.id, self.old) {
            log::warn!("undo resize: node {} not found", self.id);
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

// ─── Property change ─────────────────────────────────────────────────────

/// Which part of a node a [`PropertyChangeCommand`] edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeField {
    Label,
    Property(String),
}

#[derive(Debug)]
pub struct PropertyChangeCommand {
    meta: CommandMeta,
    id: NodeId,
    field: NodeField,
    new: Value,
    /// `None` when the property did not exist before.
    old: Option<Value>,
    /// Port set before a switch's `cases` changed.
    old_ports: Option<Ports>,
    /// Links leaving the switch's case ports, as they were before the change.
    case_links: Vec<Link>,
}

impl PropertyChangeCommand {
    pub fn new(doc: &Document, id: NodeId, field: NodeField, new: Value) -> Result<Self, CommandError> {
        let node = doc.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        let (old, old_ports) = match &field {
            NodeField::Label => (Some(Value::String(node.style.label.clone())), None),
            NodeField::Property(key) => {
                let ports = (node.kind == NodeKind::Switch && key == "cases").then(|| node.ports.clone());
                (node.properties.get(key).cloned(), ports)
            }
        };
        let case_links: Vec<Link> = if old_ports.is_some() {
            doc.graph
                .links_touching(id)
                .into_iter()
                .filter(|l| l.source.node == id && l.source.port.as_deref().and_then(case_index).is_some())
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let description = match &field {
            NodeField::Label => format!("Rename {id}"),
            NodeField::Property(key) => format!("Set {key} on {id}"),
        };
        Ok(Self {
            meta: CommandMeta::new(description),
            id,
            field,
            new,
            old,
            old_ports,
            case_links,
        })
    }

    /// Relabel case links to the new case names; links whose case port no
    /// longer exists are removed.
    fn sync_case_links(&self, doc: &mut Document, cases: &[String]) {
        for link in &self.case_links {
            let index = link.source.port.as_deref().and_then(case_index);
            match index.and_then(|i| cases.get(i)) {
                Some(case) => {
                    doc.graph.set_link_label(link.id, Some(case.clone()));
                }
                None => {
                    doc.context.release_link(link.id);
                    if doc.graph.remove_link(link.id).is_some() {
                        log::debug!("removed link {} from dropped case port", link.id);
                    }
                }
            }
        }
    }

    fn write(&self, doc: &mut Document, value: Option<&Value>) -> bool {
        match &self.field {
            NodeField::Label => {
                let label = match value {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                doc.graph.set_label(self.id, label).is_some()
            }
            NodeField::Property(key) => doc.graph.set_property(self.id, key, value.cloned()).is_some(),
        }
    }
}

impl Command for PropertyChangeCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        if !self.write(doc, Some(&self.new)) {
            log::warn!("property change: node {} not found", self.id);
            return Ok(CommandOutput::None);
        }
        if self.old_ports.is_some() {
            let cases = doc.graph.node(self.id).map(|n| n.switch_cases()).unwrap_or_default();
            let ports = doc.factory.switch_ports(&cases);
            doc.graph.set_ports(self.id, ports);
            self.sync_case_links(doc, &cases);
        }
        Ok(CommandOutput::Node(self.id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        if !self.write(doc, self.old.as_ref()) {
            log::warn!("undo property change: node {} not found", self.id);
            return Ok(());
        }
        if let Some(ports) = &self.old_ports {
            doc.graph.set_ports(self.id, ports.clone());
        }
        for link in &self.case_links {
            if doc.graph.set_link_label(link.id, link.label.clone()).is_none() {
                restore_link(&mut doc.graph, link);
            }
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

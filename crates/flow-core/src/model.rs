//! Core workflow-graph data model.
//!
//! Nodes and links live in a `StableDiGraph`: nodes are graph vertices and
//! links are directed edges, so removing a node drops every link touching it.
//! Embedding (container → child) is *not* an edge; it is node state kept on
//! both sides (`parent` on the child, `embeds` on the container) and only ever
//! changed through [`FlowGraph::embed`] / [`FlowGraph::unembed`], which consult
//! [`can_embed`](crate::embedding::can_embed).

use crate::embedding::can_embed;
use crate::error::GraphError;
use crate::id::{LinkId, NodeId};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Absolute bounding box of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };
        match bytes.len() {
            6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
            8 => Some(Self {
                r: pair(0)?,
                g: pair(2)?,
                b: pair(4)?,
                a: pair(6)?,
            }),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

// ─── Node kinds & attributes ─────────────────────────────────────────────

/// Outline drawn for a node. Also serves as a marker when a snapshot has
/// no explicit kind (see [`NodeKind::infer`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Circle,
    Rectangle,
    RoundedRectangle,
    Diamond,
    Hexagon,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Rectangle => "rectangle",
            Shape::RoundedRectangle => "rounded_rectangle",
            Shape::Diamond => "diamond",
            Shape::Hexagon => "hexagon",
        }
    }
}

/// The node kinds a workflow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Process,
    Decision,
    Switch,
    Container,
    GroupSetting,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Process,
        NodeKind::Decision,
        NodeKind::Switch,
        NodeKind::Container,
        NodeKind::GroupSetting,
    ];

    /// Start and end nodes bound the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Container)
    }

    /// Terminals are unique per workflow and never go to the clipboard.
    pub fn is_copyable(&self) -> bool {
        !self.is_terminal()
    }

    /// Prefix used when generating fresh ids for this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::Switch => "switch",
            NodeKind::Container => "container",
            NodeKind::GroupSetting => "group_setting",
        }
    }

    /// Re-derive a kind from presentation markers, for snapshots that carry
    /// none: a circle labelled "start" is a start node, a rectangle flagged
    /// as container is a container, and so on.
    pub fn infer(shape: Shape, label: &str, flags: &NodeFlags) -> Option<NodeKind> {
        if flags.is_container {
            return Some(NodeKind::Container);
        }
        if flags.is_switch {
            return Some(NodeKind::Switch);
        }
        match shape {
            Shape::Circle => match label.trim().to_ascii_lowercase().as_str() {
                "start" => Some(NodeKind::Start),
                "end" => Some(NodeKind::End),
                _ => None,
            },
            Shape::RoundedRectangle => Some(NodeKind::Process),
            Shape::Diamond => Some(NodeKind::Decision),
            Shape::Hexagon => Some(NodeKind::Switch),
            Shape::Rectangle => Some(NodeKind::GroupSetting),
        }
    }
}

/// Presentation attributes of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub shape: Shape,
    pub label: String,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeFlags {
    pub is_container: bool,
    pub is_resizable: bool,
    pub is_switch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortGroup {
    In,
    Out,
}

/// A connection point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub group: PortGroup,
    pub visible: bool,
}

impl Port {
    pub fn new(id: impl Into<String>, group: PortGroup) -> Self {
        Self {
            id: id.into(),
            group,
            visible: true,
        }
    }
}

/// Kind-specific key/value properties (decision condition, switch cases, ...).
pub type Properties = BTreeMap<String, serde_json::Value>;

pub type Ports = SmallVec<[Port; 4]>;

/// A node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Point,
    pub size: Size,
    pub style: NodeStyle,
    pub properties: Properties,
    pub flags: NodeFlags,
    pub ports: Ports,
    /// Container holding this node, if any. Maintained by the graph.
    pub(crate) parent: Option<NodeId>,
    /// Nodes embedded in this container. Maintained by the graph.
    pub(crate) embeds: Vec<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, position: Point, size: Size, style: NodeStyle) -> Self {
        Self {
            id,
            kind,
            position,
            size,
            style,
            properties: Properties::new(),
            flags: NodeFlags::default(),
            ports: Ports::new(),
            parent: None,
            embeds: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn embeds(&self) -> &[NodeId] {
        &self.embeds
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.position.x,
            y: self.position.y,
            width: self.size.width,
            height: self.size.height,
        }
    }

    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// The `cases` property of a switch node as a list of names.
    pub fn switch_cases(&self) -> Vec<String> {
        self.properties
            .get("cases")
            .and_then(|v| v.as_array())
            .map(|cases| {
                cases
                    .iter()
                    .map(|c| match c {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─── Links ───────────────────────────────────────────────────────────────

/// One end of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: Option<String>,
}

impl Endpoint {
    pub fn new(node: NodeId, port: Option<&str>) -> Self {
        Self {
            node,
            port: port.map(str::to_string),
        }
    }
}

/// Arrow head placement on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowKind {
    None,
    #[default]
    End,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStyle {
    pub stroke: Color,
    pub width: f32,
    pub arrow: ArrowKind,
}

impl Default for LinkStyle {
    fn default() -> Self {
        Self {
            stroke: Color::rgb(0x5F, 0x63, 0x68),
            width: 2.0,
            arrow: ArrowKind::End,
        }
    }
}

/// A directed connection between two node ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: Endpoint,
    pub target: Endpoint,
    pub style: LinkStyle,
    pub label: Option<String>,
}

impl Link {
    pub fn new(id: LinkId, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id,
            source,
            target,
            style: LinkStyle::default(),
            label: None,
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source.node == node || self.target.node == node
    }
}

// ─── Change notification ─────────────────────────────────────────────────

/// Structural change reported synchronously after each graph mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeMoved(NodeId),
    NodeResized(NodeId),
    NodeChanged(NodeId),
    LinkAdded(LinkId),
    LinkRemoved(LinkId),
    LinkChanged(LinkId),
    Embedded { parent: NodeId, child: NodeId },
    Unembedded { parent: NodeId, child: NodeId },
    Cleared,
    /// Contents swapped for a freshly loaded document.
    Reloaded,
}

/// Host hook notified of every structural change (renderers, minimaps, ...).
pub trait GraphObserver {
    fn on_change(&mut self, event: &GraphEvent);
}

impl<F: FnMut(&GraphEvent)> GraphObserver for F {
    fn on_change(&mut self, event: &GraphEvent) {
        self(event)
    }
}

// ─── Graph store ─────────────────────────────────────────────────────────

/// The live workflow document: nodes, links, embedding and draw order.
pub struct FlowGraph {
    graph: StableDiGraph<Node, Link>,
    id_index: HashMap<NodeId, NodeIndex>,
    link_index: HashMap<LinkId, EdgeIndex>,
    /// Back-to-front paint order. Embedded children always follow their container.
    draw_order: Vec<NodeId>,
    observers: Vec<Box<dyn GraphObserver>>,
}

impl fmt::Debug for FlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowGraph")
            .field("nodes", &self.id_index.len())
            .field("links", &self.link_index.len())
            .field("draw_order", &self.draw_order)
            .finish()
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            link_index: HashMap::new(),
            draw_order: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Register a hook called after every structural change.
    pub fn subscribe(&mut self, observer: impl GraphObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, event: GraphEvent) {
        log::trace!("graph event {event:?}");
        for observer in &mut self.observers {
            observer.on_change(&event);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.id_index.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.link_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in draw order (back to front).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.draw_order.iter().filter_map(|id| self.node(*id))
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.graph.edge_weights()
    }

    pub fn draw_order(&self) -> &[NodeId] {
        &self.draw_order
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn embedded_children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.embeds.as_slice()).unwrap_or(&[])
    }

    /// Embedded children of `id` with their current positions.
    pub fn embedded_positions(&self, id: NodeId) -> Vec<(NodeId, Point)> {
        self.embedded_children(id)
            .iter()
            .filter_map(|c| self.node(*c).map(|n| (*c, n.position)))
            .collect()
    }

    /// Every link with `id` as source or target, each reported once.
    pub fn links_touching(&self, id: NodeId) -> Vec<&Link> {
        let Some(&idx) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .filter(|e| seen.insert(e.id()))
            .map(|e| e.weight())
            .collect()
    }

    /// Top-most container whose bounds contain `point`, skipping `exclude`.
    pub fn container_at(&self, point: Point, exclude: NodeId) -> Option<NodeId> {
        self.draw_order
            .iter()
            .rev()
            .filter(|id| **id != exclude)
            .filter_map(|id| self.node(*id))
            .find(|n| n.kind.is_container() && n.bounds().contains(point.x, point.y))
            .map(|n| n.id)
    }

    /// A prefixed id not yet used by any node.
    pub fn fresh_node_id(&self, prefix: &str) -> NodeId {
        loop {
            let id = NodeId::with_prefix(prefix);
            if !self.contains(id) {
                return id;
            }
        }
    }

    pub fn fresh_link_id(&self) -> LinkId {
        loop {
            let id = LinkId::with_prefix("link");
            if !self.link_index.contains_key(&id) {
                return id;
            }
        }
    }

    // ─── Structural mutations ────────────────────────────────────────────

    /// Insert a fully built node. Embedding is never carried in: the node is
    /// inserted detached and relations are restored through [`Self::embed`].
    pub fn add_node(&mut self, mut node: Node) -> Result<(), GraphError> {
        let id = node.id;
        if self.contains(id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        node.parent = None;
        node.embeds.clear();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.draw_order.push(id);
        self.notify(GraphEvent::NodeAdded(id));
        Ok(())
    }

    /// Remove a node together with every link touching it. The node is
    /// detached from its container and its embedded children are released.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.index_of(id)?;

        let parent = self.graph[idx].parent;
        let children = self.graph[idx].embeds.clone();
        if let Some(parent) = parent {
            self.unembed(parent, id);
        }
        for child in children {
            self.unembed(id, child);
        }

        let touching: Vec<LinkId> = self.links_touching(id).iter().map(|l| l.id).collect();
        for link_id in &touching {
            self.link_index.remove(link_id);
        }

        let removed = self.graph.remove_node(idx);
        self.id_index.remove(&id);
        self.draw_order.retain(|n| *n != id);

        for link_id in touching {
            self.notify(GraphEvent::LinkRemoved(link_id));
        }
        self.notify(GraphEvent::NodeRemoved(id));
        removed
    }

    /// Insert a link. Both endpoints must already exist.
    pub fn add_link(&mut self, link: Link) -> Result<(), GraphError> {
        let id = link.id;
        if self.link_index.contains_key(&id) {
            return Err(GraphError::DuplicateLinkId(id));
        }
        let source = self.index_of(link.source.node).ok_or(GraphError::DanglingEndpoint {
            link: id,
            node: link.source.node,
        })?;
        let target = self.index_of(link.target.node).ok_or(GraphError::DanglingEndpoint {
            link: id,
            node: link.target.node,
        })?;
        let edge = self.graph.add_edge(source, target, link);
        self.link_index.insert(id, edge);
        self.notify(GraphEvent::LinkAdded(id));
        Ok(())
    }

    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let edge = self.link_index.remove(&id)?;
        let removed = self.graph.remove_edge(edge);
        self.notify(GraphEvent::LinkRemoved(id));
        removed
    }

    /// Replace a link's label. Returns the previous label, or `None` if the
    /// link does not exist.
    pub fn set_link_label(&mut self, id: LinkId, label: Option<String>) -> Option<Option<String>> {
        let edge = *self.link_index.get(&id)?;
        let link = self.graph.edge_weight_mut(edge)?;
        let old = std::mem::replace(&mut link.label, label);
        self.notify(GraphEvent::LinkChanged(id));
        Some(old)
    }

    /// Make `child` an embedded node of `parent`. Rejected (returns false,
    /// no mutation) whenever [`can_embed`] refuses. A child already embedded
    /// elsewhere is moved out of its old container first.
    pub fn embed(&mut self, parent: NodeId, child: NodeId) -> bool {
        let (Some(p), Some(c)) = (self.node(parent), self.node(child)) else {
            return false;
        };
        if !can_embed(c, p) {
            log::debug!("embed rejected: {child} into {parent}");
            return false;
        }
        let current_parent = c.parent;
        match current_parent {
            Some(current) if current == parent => return true,
            Some(current) => {
                self.unembed(current, child);
            }
            None => {}
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.embeds.push(child);
        }
        self.raise_embedded(parent);
        self.notify(GraphEvent::Embedded { parent, child });
        true
    }

    /// Release `child` from `parent`. Returns false if it was not embedded there.
    pub fn unembed(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent_of(child) != Some(parent) {
            return false;
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
        if let Some(p) = self.node_mut(parent) {
            p.embeds.retain(|e| *e != child);
        }
        self.notify(GraphEvent::Unembedded { parent, child });
        true
    }

    /// Set a node's position without touching anything else.
    pub fn set_position(&mut self, id: NodeId, position: Point) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.position = position;
        self.notify(GraphEvent::NodeMoved(id));
        true
    }

    /// Move a node; embedded children travel by the same delta.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let dx = position.x - node.position.x;
        let dy = position.y - node.position.y;
        let children = node.embeds.clone();
        self.set_position(id, position);
        if dx != 0.0 || dy != 0.0 {
            for child in children {
                if let Some(p) = self.node(child).map(|c| c.position) {
                    self.set_position(child, p.offset(dx, dy));
                }
            }
        }
        true
    }

    pub fn resize(&mut self, id: NodeId, size: Size) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.size = size;
        self.notify(GraphEvent::NodeResized(id));
        true
    }

    /// Shift `child` so it lies inside `container`, keeping `padding` from
    /// the edges where the child fits. Returns true if the child moved.
    pub fn fit_inside(&mut self, container: NodeId, child: NodeId, padding: f32) -> bool {
        let (Some(c), Some(n)) = (self.node(container), self.node(child)) else {
            return false;
        };
        let outer = c.bounds();
        let min_x = outer.x + padding;
        let min_y = outer.y + padding;
        let max_x = (outer.x + outer.width - padding - n.size.width).max(min_x);
        let max_y = (outer.y + outer.height - padding - n.size.height).max(min_y);
        let target = Point::new(n.position.x.clamp(min_x, max_x), n.position.y.clamp(min_y, max_y));
        if target == n.position {
            return false;
        }
        self.set_position(child, target)
    }

    pub fn set_label(&mut self, id: NodeId, label: String) -> Option<String> {
        let node = self.node_mut(id)?;
        let old = std::mem::replace(&mut node.style.label, label);
        self.notify(GraphEvent::NodeChanged(id));
        Some(old)
    }

    /// Set (`Some`) or remove (`None`) a property. Returns the previous value,
    /// or `None` if the node does not exist.
    pub fn set_property(
        &mut self,
        id: NodeId,
        key: &str,
        value: Option<serde_json::Value>,
    ) -> Option<Option<serde_json::Value>> {
        let node = self.node_mut(id)?;
        let old = match value {
            Some(v) => node.properties.insert(key.to_string(), v),
            None => node.properties.remove(key),
        };
        self.notify(GraphEvent::NodeChanged(id));
        Some(old)
    }

    pub fn set_ports(&mut self, id: NodeId, ports: Ports) -> Option<Ports> {
        let node = self.node_mut(id)?;
        let old = std::mem::replace(&mut node.ports, ports);
        self.notify(GraphEvent::NodeChanged(id));
        Some(old)
    }

    /// Drop every node and link.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index.clear();
        self.link_index.clear();
        self.draw_order.clear();
        self.notify(GraphEvent::Cleared);
    }

    /// Take over the contents of `other`, keeping this graph's observers.
    pub fn replace_with(&mut self, other: FlowGraph) {
        self.graph = other.graph;
        self.id_index = other.id_index;
        self.link_index = other.link_index;
        self.draw_order = other.draw_order;
        self.notify(GraphEvent::Reloaded);
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Post-embed hook: children of `container` are painted right after it,
    /// keeping their relative order, so they are never hidden behind it.
    fn raise_embedded(&mut self, container: NodeId) {
        let Some(pos) = self.draw_order.iter().position(|id| *id == container) else {
            return;
        };
        let children: HashSet<NodeId> = self.embedded_children(container).iter().copied().collect();
        let before: Vec<NodeId> = self.draw_order[..pos]
            .iter()
            .filter(|id| !children.contains(id))
            .copied()
            .collect();
        let moved: Vec<NodeId> = self.draw_order[..pos]
            .iter()
            .filter(|id| children.contains(id))
            .copied()
            .collect();
        if moved.is_empty() {
            return;
        }
        let after = &self.draw_order[pos + 1..];
        let mut order = before;
        order.push(container);
        order.extend(moved);
        order.extend_from_slice(after);
        log::trace!("raised embedded children of {container}");
        self.draw_order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{DefaultNodeFactory, NodeFactory};

    fn add(graph: &mut FlowGraph, name: &str, kind: NodeKind, x: f32, y: f32) -> NodeId {
        let id = NodeId::intern(name);
        let node = DefaultNodeFactory.create(id, kind, Point::new(x, y));
        graph.add_node(node).unwrap();
        id
    }

    #[test]
    fn add_and_lookup() {
        let mut g = FlowGraph::new();
        let a = add(&mut g, "m_a", NodeKind::Process, 10.0, 20.0);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node(a).unwrap().position, Point::new(10.0, 20.0));
        assert_eq!(g.draw_order(), &[a]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut g = FlowGraph::new();
        let a = add(&mut g, "m_dup", NodeKind::Process, 0.0, 0.0);
        let again = DefaultNodeFactory.create(a, NodeKind::Process, Point::default());
        assert_eq!(g.add_node(again), Err(GraphError::DuplicateNodeId(a)));
    }

    #[test]
    fn removing_node_drops_touching_links() {
        let mut g = FlowGraph::new();
        let a = add(&mut g, "m_la", NodeKind::Process, 0.0, 0.0);
        let b = add(&mut g, "m_lb", NodeKind::Process, 200.0, 0.0);
        let c = add(&mut g, "m_lc", NodeKind::Process, 400.0, 0.0);
        g.add_link(Link::new(LinkId::intern("m_ab"), Endpoint::new(a, Some("out")), Endpoint::new(b, Some("in"))))
            .unwrap();
        g.add_link(Link::new(LinkId::intern("m_bc"), Endpoint::new(b, Some("out")), Endpoint::new(c, Some("in"))))
            .unwrap();
        assert_eq!(g.links_touching(b).len(), 2);

        g.remove_node(b);
        assert_eq!(g.link_count(), 0);
        assert!(g.link(LinkId::intern("m_ab")).is_none());
    }

    #[test]
    fn dangling_link_is_refused() {
        let mut g = FlowGraph::new();
        let a = add(&mut g, "m_da", NodeKind::Process, 0.0, 0.0);
        let ghost = NodeId::intern("m_ghost");
        let err = g
            .add_link(Link::new(LinkId::intern("m_dl"), Endpoint::new(a, None), Endpoint::new(ghost, None)))
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingEndpoint { node, .. } if node == ghost));
    }

    #[test]
    fn embed_keeps_both_sides_consistent() {
        let mut g = FlowGraph::new();
        let child = add(&mut g, "m_ec", NodeKind::Process, 50.0, 50.0);
        let group = add(&mut g, "m_eg", NodeKind::Container, 0.0, 0.0);
        assert!(g.embed(group, child));
        assert_eq!(g.parent_of(child), Some(group));
        assert_eq!(g.embedded_children(group), &[child]);
        // draw-order hook lifts the child above the container
        assert_eq!(g.draw_order(), &[group, child]);

        assert!(g.unembed(group, child));
        assert_eq!(g.parent_of(child), None);
        assert!(g.embedded_children(group).is_empty());
    }

    #[test]
    fn embed_rejects_invalid_parents() {
        let mut g = FlowGraph::new();
        let start = add(&mut g, "m_rs", NodeKind::Start, 0.0, 0.0);
        let proc_ = add(&mut g, "m_rp", NodeKind::Process, 0.0, 0.0);
        let c1 = add(&mut g, "m_rc1", NodeKind::Container, 0.0, 0.0);
        let c2 = add(&mut g, "m_rc2", NodeKind::Container, 0.0, 0.0);
        assert!(!g.embed(c1, start));
        assert!(!g.embed(proc_, start));
        assert!(!g.embed(c1, c2));
        assert!(!g.embed(c1, c1));
        assert!(g.embedded_children(c1).is_empty());
    }

    #[test]
    fn removing_container_releases_children() {
        let mut g = FlowGraph::new();
        let group = add(&mut g, "m_rg", NodeKind::Container, 0.0, 0.0);
        let child = add(&mut g, "m_rch", NodeKind::Process, 20.0, 20.0);
        g.embed(group, child);
        g.remove_node(group);
        assert!(g.contains(child));
        assert_eq!(g.parent_of(child), None);
    }

    #[test]
    fn moving_container_carries_children() {
        let mut g = FlowGraph::new();
        let group = add(&mut g, "m_mg", NodeKind::Container, 0.0, 0.0);
        let child = add(&mut g, "m_mc", NodeKind::Process, 20.0, 30.0);
        g.embed(group, child);
        g.move_node(group, Point::new(100.0, 100.0));
        assert_eq!(g.node(child).unwrap().position, Point::new(120.0, 130.0));
    }

    #[test]
    fn fit_inside_clamps_child() {
        let mut g = FlowGraph::new();
        let group = add(&mut g, "m_fg", NodeKind::Container, 100.0, 100.0);
        let child = add(&mut g, "m_fc", NodeKind::Process, 0.0, 0.0);
        assert!(g.fit_inside(group, child, 10.0));
        assert_eq!(g.node(child).unwrap().position, Point::new(110.0, 110.0));
        assert!(!g.fit_inside(group, child, 10.0));
    }

    #[test]
    fn observers_see_structural_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut g = FlowGraph::new();
        g.subscribe(move |e: &GraphEvent| sink.borrow_mut().push(*e));

        let a = add(&mut g, "m_oa", NodeKind::Process, 0.0, 0.0);
        g.remove_node(a);
        assert_eq!(*events.borrow(), vec![GraphEvent::NodeAdded(a), GraphEvent::NodeRemoved(a)]);
    }

    #[test]
    fn replace_with_keeps_observers() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut g = FlowGraph::new();
        add(&mut g, "m_ro", NodeKind::Process, 0.0, 0.0);
        g.subscribe(move |e: &GraphEvent| sink.borrow_mut().push(*e));

        let mut fresh = FlowGraph::new();
        let b = add(&mut fresh, "m_rb", NodeKind::Decision, 5.0, 5.0);
        g.replace_with(fresh);
        assert_eq!(g.node_count(), 1);
        assert!(g.contains(b));
        assert_eq!(g.draw_order(), &[b]);
        assert_eq!(*events.borrow(), vec![GraphEvent::Reloaded]);
    }

    #[test]
    fn embedded_positions_lists_children() {
        let mut g = FlowGraph::new();
        let group = add(&mut g, "m_eg", NodeKind::Container, 0.0, 0.0);
        let child = add(&mut g, "m_ec", NodeKind::Process, 12.5, 30.25);
        g.embed(group, child);
        assert_eq!(g.embedded_positions(group), vec![(child, Point::new(12.5, 30.25))]);
        assert!(g.embedded_positions(child).is_empty());
    }

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");
        let c2 = Color::from_hex("FF000080").unwrap();
        assert_eq!(c2.a, 0x80);
        assert_eq!(c2.to_hex(), "#FF000080");
        assert!(Color::from_hex("#12").is_none());
    }

    #[test]
    fn kind_inference_from_markers() {
        let none = NodeFlags::default();
        assert_eq!(NodeKind::infer(Shape::Circle, "Start", &none), Some(NodeKind::Start));
        assert_eq!(NodeKind::infer(Shape::Circle, " end ", &none), Some(NodeKind::End));
        assert_eq!(NodeKind::infer(Shape::Circle, "loop", &none), None);
        let container = NodeFlags {
            is_container: true,
            ..NodeFlags::default()
        };
        assert_eq!(NodeKind::infer(Shape::Rectangle, "Group", &container), Some(NodeKind::Container));
        assert_eq!(NodeKind::infer(Shape::Diamond, "x", &none), Some(NodeKind::Decision));
    }
}

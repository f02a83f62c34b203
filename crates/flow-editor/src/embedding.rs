//! Embed/unembed commands and the drop-time container check.

use crate::commands::{Command, CommandMeta, CommandOutput};
use crate::context::Document;
use crate::error::CommandError;
use flow_core::{NodeId, Point, can_embed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedAction {
    Embed,
    Unembed,
}

/// Adds or removes one container/child relation.
///
/// Embedding can shift the child into the container's bounds, so the
/// embed direction remembers the child's absolute position and previous
/// container and puts both back on undo.
#[derive(Debug)]
pub struct EmbedNodeCommand {
    meta: CommandMeta,
    container: NodeId,
    child: NodeId,
    action: EmbedAction,
    /// Inset used to pull the child inside the container after embedding.
    padding: Option<f32>,
    pre_embed_position: Option<Point>,
    previous_parent: Option<NodeId>,
    /// False when the graph refused the change; undo is then a no-op.
    applied: bool,
}

impl EmbedNodeCommand {
    fn with_action(container: NodeId, child: NodeId, action: EmbedAction) -> Self {
        let verb = match action {
            EmbedAction::Embed => "Embed",
            EmbedAction::Unembed => "Unembed",
        };
        Self {
            meta: CommandMeta::new(format!("{verb} {child} in {container}")),
            container,
            child,
            action,
            padding: None,
            pre_embed_position: None,
            previous_parent: None,
            applied: false,
        }
    }

    /// Embed without moving the child.
    pub fn embed(container: NodeId, child: NodeId) -> Self {
        Self::with_action(container, child, EmbedAction::Embed)
    }

    pub fn unembed(container: NodeId, child: NodeId) -> Self {
        Self::with_action(container, child, EmbedAction::Unembed)
    }

    /// Also pull the child inside the container, `padding` from its edges.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn action(&self) -> EmbedAction {
        self.action
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn child(&self) -> NodeId {
        self.child
    }

    fn do_embed(&mut self, doc: &mut Document) -> bool {
        let Some(child) = doc.graph.node(self.child) else {
            log::warn!("embed: node {} not found", self.child);
            return false;
        };
        self.pre_embed_position = Some(child.position);
        self.previous_parent = child.parent();

        if !doc.graph.embed(self.container, self.child) {
            return false;
        }
        if let Some(padding) = self.padding {
            doc.graph.fit_inside(self.container, self.child, padding);
        }
        true
    }

    fn undo_embed(&mut self, doc: &mut Document) {
        doc.graph.unembed(self.container, self.child);
        if let Some(previous) = self.previous_parent {
            doc.graph.embed(previous, self.child);
        }
        if let Some(position) = self.pre_embed_position {
            doc.graph.set_position(self.child, position);
        }
    }
}

impl Command for EmbedNodeCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        self.applied = match self.action {
            EmbedAction::Embed => self.do_embed(doc),
            EmbedAction::Unembed => doc.graph.unembed(self.container, self.child),
        };
        if !self.applied {
            log::debug!("`{}` left the graph unchanged", self.meta.description);
            return Ok(CommandOutput::None);
        }
        Ok(CommandOutput::Node(self.child))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        if !self.applied {
            return Ok(());
        }
        match self.action {
            EmbedAction::Embed => self.undo_embed(doc),
            EmbedAction::Unembed => {
                doc.graph.embed(self.container, self.child);
            }
        }
        self.applied = false;
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

/// Decide how a node's embedding should change after it was dropped.
///
/// The top-most container under the node's center that accepts it becomes
/// its new parent. A node dropped outside every container is released from
/// its current one. Returns `None` when nothing changes.
pub fn check_container_embedding(doc: &Document, id: NodeId, padding: f32) -> Option<EmbedNodeCommand> {
    let node = doc.graph.node(id)?;
    let current = node.parent();
    let target = doc
        .graph
        .container_at(node.bounds().center(), id)
        .filter(|c| doc.graph.node(*c).is_some_and(|container| can_embed(node, container)));

    match (target, current) {
        (Some(target), Some(current)) if target == current => None,
        (Some(target), _) => Some(EmbedNodeCommand::embed(target, id).with_padding(padding)),
        (None, Some(current)) => Some(EmbedNodeCommand::unembed(current, id)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{GraphSnapshot, NodeKind};
    use pretty_assertions::assert_eq;

    fn doc_with(nodes: &[(&str, NodeKind, f32, f32)]) -> Document {
        let mut doc = Document::new();
        for (name, kind, x, y) in nodes {
            let node = doc.factory.create(NodeId::intern(name), *kind, Point::new(*x, *y));
            doc.graph.add_node(node).unwrap();
        }
        doc
    }

    #[test]
    fn embed_undo_restores_position_and_relation() {
        let mut doc = doc_with(&[
            ("em_box", NodeKind::Container, 0.0, 0.0),
            ("em_task", NodeKind::Process, 250.0, 170.0),
        ]);
        let (group, task) = (NodeId::intern("em_box"), NodeId::intern("em_task"));
        let before = GraphSnapshot::capture(&doc.graph);

        let mut cmd = EmbedNodeCommand::embed(group, task).with_padding(10.0);
        cmd.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.parent_of(task), Some(group));
        // 300x200 container, 120x60 child, 10 padding
        assert_eq!(doc.graph.node(task).unwrap().position, Point::new(170.0, 130.0));
        let after = GraphSnapshot::capture(&doc.graph);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(GraphSnapshot::capture(&doc.graph), before);
        cmd.execute(&mut doc).unwrap();
        assert_eq!(GraphSnapshot::capture(&doc.graph), after);
    }

    #[test]
    fn reparent_undo_returns_to_previous_container() {
        let mut doc = doc_with(&[
            ("em_left", NodeKind::Container, 0.0, 0.0),
            ("em_right", NodeKind::Container, 400.0, 0.0),
            ("em_item", NodeKind::Decision, 20.0, 20.0),
        ]);
        let (left, right, item) = (
            NodeId::intern("em_left"),
            NodeId::intern("em_right"),
            NodeId::intern("em_item"),
        );
        doc.graph.embed(left, item);

        let mut cmd = EmbedNodeCommand::embed(right, item);
        cmd.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.parent_of(item), Some(right));
        assert!(doc.graph.embedded_children(left).is_empty());

        cmd.undo(&mut doc).unwrap();
        assert_eq!(doc.graph.parent_of(item), Some(left));
        assert!(doc.graph.embedded_children(right).is_empty());
    }

    #[test]
    fn rejected_embed_is_a_no_op() {
        let mut doc = doc_with(&[
            ("em_c1", NodeKind::Container, 0.0, 0.0),
            ("em_c2", NodeKind::Container, 10.0, 10.0),
        ]);
        let before = GraphSnapshot::capture(&doc.graph);
        let mut cmd = EmbedNodeCommand::embed(NodeId::intern("em_c1"), NodeId::intern("em_c2")).with_padding(10.0);
        assert_eq!(cmd.execute(&mut doc).unwrap(), CommandOutput::None);
        cmd.undo(&mut doc).unwrap();
        assert_eq!(GraphSnapshot::capture(&doc.graph), before);
    }

    #[test]
    fn unembed_roundtrip() {
        let mut doc = doc_with(&[
            ("em_ubox", NodeKind::Container, 0.0, 0.0),
            ("em_uitem", NodeKind::Process, 20.0, 20.0),
        ]);
        let (group, item) = (NodeId::intern("em_ubox"), NodeId::intern("em_uitem"));
        doc.graph.embed(group, item);

        let mut cmd = EmbedNodeCommand::unembed(group, item);
        cmd.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.parent_of(item), None);
        cmd.undo(&mut doc).unwrap();
        assert_eq!(doc.graph.parent_of(item), Some(group));
        assert_eq!(doc.graph.node(item).unwrap().position, Point::new(20.0, 20.0));
    }

    #[test]
    fn drop_inside_container_embeds() {
        let doc = doc_with(&[
            ("em_dbox", NodeKind::Container, 0.0, 0.0),
            ("em_ditem", NodeKind::Process, 50.0, 50.0),
        ]);
        let cmd = check_container_embedding(&doc, NodeId::intern("em_ditem"), 10.0).unwrap();
        assert_eq!(cmd.action(), EmbedAction::Embed);
        assert_eq!(cmd.container(), NodeId::intern("em_dbox"));
    }

    #[test]
    fn drop_outside_releases_from_parent() {
        let mut doc = doc_with(&[
            ("em_obox", NodeKind::Container, 0.0, 0.0),
            ("em_oitem", NodeKind::Process, 20.0, 20.0),
        ]);
        let (group, item) = (NodeId::intern("em_obox"), NodeId::intern("em_oitem"));
        doc.graph.embed(group, item);
        doc.graph.set_position(item, Point::new(800.0, 800.0));

        let cmd = check_container_embedding(&doc, item, 10.0).unwrap();
        assert_eq!(cmd.action(), EmbedAction::Unembed);
        assert_eq!(cmd.container(), group);
    }

    #[test]
    fn drop_on_same_parent_or_for_refused_kind_is_ignored() {
        let mut doc = doc_with(&[
            ("em_sbox", NodeKind::Container, 0.0, 0.0),
            ("em_sitem", NodeKind::Process, 20.0, 20.0),
            ("em_start", NodeKind::Start, 100.0, 100.0),
            ("em_inner_box", NodeKind::Container, 100.0, 60.0),
        ]);
        let group = NodeId::intern("em_sbox");
        let item = NodeId::intern("em_sitem");
        doc.graph.embed(group, item);

        assert!(check_container_embedding(&doc, item, 10.0).is_none());
        assert!(check_container_embedding(&doc, NodeId::intern("em_start"), 10.0).is_none());
        assert!(check_container_embedding(&doc, NodeId::intern("em_inner_box"), 10.0).is_none());
    }
}

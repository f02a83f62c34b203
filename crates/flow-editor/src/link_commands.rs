use crate::commands::{Command, CommandMeta, CommandOutput};
use crate::context::Document;
use crate::error::CommandError;
use flow_core::{Endpoint, GraphError, Link, LinkId, NodeId, NodeKind, case_index, restore_link};

/// Connect two node ports. A link leaving a switch case port is labelled
/// with that case's name.
#[derive(Debug)]
pub struct CreateLinkCommand {
    meta: CommandMeta,
    source: Endpoint,
    target: Endpoint,
    /// Assigned on first execute and reused on redo.
    id: Option<LinkId>,
}

impl CreateLinkCommand {
    pub fn new(source: NodeId, source_port: Option<&str>, target: NodeId, target_port: Option<&str>) -> Self {
        Self {
            meta: CommandMeta::new(format!("Connect {source} to {target}")),
            source: Endpoint::new(source, source_port),
            target: Endpoint::new(target, target_port),
            id: None,
        }
    }

    pub fn link_id(&self) -> Option<LinkId> {
        self.id
    }

    fn case_label(&self, doc: &Document) -> Option<String> {
        let node = doc.graph.node(self.source.node)?;
        if node.kind != NodeKind::Switch {
            return None;
        }
        let index = case_index(self.source.port.as_deref()?)?;
        node.switch_cases().into_iter().nth(index)
    }
}

impl Command for CreateLinkCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        for endpoint in [&self.source, &self.target] {
            if !doc.graph.contains(endpoint.node) {
                return Err(GraphError::NodeNotFound(endpoint.node).into());
            }
        }

        let id = match self.id {
            Some(id) => id,
            None => doc.graph.fresh_link_id(),
        };
        let mut link = Link::new(id, self.source.clone(), self.target.clone());
        link.label = self.case_label(doc);
        doc.graph.add_link(link)?;
        self.id = Some(id);
        Ok(CommandOutput::Link(id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        let Some(id) = self.id else {
            return Ok(());
        };
        doc.context.release_link(id);
        if doc.graph.remove_link(id).is_none() {
            log::warn!("undo connect: link {id} already gone");
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

#[derive(Debug)]
pub struct DeleteLinkCommand {
    meta: CommandMeta,
    link: Link,
}

impl DeleteLinkCommand {
    pub fn new(doc: &Document, id: LinkId) -> Result<Self, CommandError> {
        let link = doc.graph.link(id).ok_or(GraphError::LinkNotFound(id))?.clone();
        Ok(Self {
            meta: CommandMeta::new(format!("Delete link {id}")),
            link,
        })
    }
}

impl Command for DeleteLinkCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        let id = self.link.id;
        doc.context.release_link(id);
        if doc.graph.remove_link(id).is_none() {
            log::warn!("delete: link {id} already gone");
            return Ok(CommandOutput::None);
        }
        Ok(CommandOutput::Link(id))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        restore_link(&mut doc.graph, &self.link);
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{GraphSnapshot, Point};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn two_nodes(a: &str, a_kind: NodeKind, b: &str) -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let (a, b) = (NodeId::intern(a), NodeId::intern(b));
        let first = doc.factory.create(a, a_kind, Point::new(0.0, 0.0));
        let second = doc.factory.create(b, NodeKind::Process, Point::new(300.0, 0.0));
        doc.graph.add_node(first).unwrap();
        doc.graph.add_node(second).unwrap();
        (doc, a, b)
    }

    #[test]
    fn create_link_roundtrip_keeps_id() {
        let (mut doc, a, b) = two_nodes("lc_a", NodeKind::Process, "lc_b");
        let before = GraphSnapshot::capture(&doc.graph);
        let mut cmd = CreateLinkCommand::new(a, Some("out"), b, Some("in"));

        let CommandOutput::Link(id) = cmd.execute(&mut doc).unwrap() else {
            panic!("expected a link");
        };
        let after = GraphSnapshot::capture(&doc.graph);
        assert_eq!(doc.graph.link(id).unwrap().label, None);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(GraphSnapshot::capture(&doc.graph), before);
        assert_eq!(cmd.execute(&mut doc).unwrap(), CommandOutput::Link(id));
        assert_eq!(GraphSnapshot::capture(&doc.graph), after);
    }

    #[test]
    fn link_from_switch_case_is_labelled() {
        let (mut doc, sw, b) = two_nodes("lc_sw", NodeKind::Switch, "lc_sb");
        doc.graph.set_property(sw, "cases", Some(json!(["gold", "silver"])));

        let mut cmd = CreateLinkCommand::new(sw, Some("case_1"), b, Some("in"));
        cmd.execute(&mut doc).unwrap();
        let id = cmd.link_id().unwrap();
        assert_eq!(doc.graph.link(id).unwrap().label.as_deref(), Some("silver"));

        let mut fallback = CreateLinkCommand::new(sw, Some("default"), b, Some("in"));
        fallback.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.link(fallback.link_id().unwrap()).unwrap().label, None);
    }

    #[test]
    fn case_port_on_non_switch_is_not_labelled() {
        let (mut doc, a, b) = two_nodes("lc_ns", NodeKind::Process, "lc_nb");
        let mut cmd = CreateLinkCommand::new(a, Some("case_0"), b, None);
        cmd.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.link(cmd.link_id().unwrap()).unwrap().label, None);
    }

    #[test]
    fn missing_endpoint_fails() {
        let (mut doc, a, _) = two_nodes("lc_ma", NodeKind::Process, "lc_mb");
        let ghost = NodeId::intern("lc_ghost");
        let mut cmd = CreateLinkCommand::new(a, Some("out"), ghost, Some("in"));
        let err = cmd.execute(&mut doc).unwrap_err();
        assert!(matches!(err, CommandError::Graph(GraphError::NodeNotFound(n)) if n == ghost));
        assert_eq!(doc.graph.link_count(), 0);
    }

    #[test]
    fn delete_link_roundtrip_and_selection() {
        let (mut doc, a, b) = two_nodes("lc_da", NodeKind::Process, "lc_db");
        let mut create = CreateLinkCommand::new(a, Some("out"), b, Some("in"));
        create.execute(&mut doc).unwrap();
        let id = create.link_id().unwrap();
        doc.context.set_selected_link(Some(id));
        let before = GraphSnapshot::capture(&doc.graph);

        let mut cmd = DeleteLinkCommand::new(&doc, id).unwrap();
        cmd.execute(&mut doc).unwrap();
        assert_eq!(doc.graph.link_count(), 0);
        assert_eq!(doc.context.selected_link(), None);

        cmd.undo(&mut doc).unwrap();
        assert_eq!(GraphSnapshot::capture(&doc.graph), before);
    }

    #[test]
    fn delete_unknown_link_fails_at_construction() {
        let doc = Document::new();
        assert!(DeleteLinkCommand::new(&doc, LinkId::intern("lc_none")).is_err());
    }
}

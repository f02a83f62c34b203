//! Node factory: default geometry, styling, ports and properties per kind.
//!
//! Used by node creation and by every snapshot-restore path, so a recreated
//! node always starts from the same construction rules as a fresh one.

use crate::id::NodeId;
use crate::model::*;
use serde_json::json;

/// Builds correctly styled, correctly ported nodes.
pub trait NodeFactory {
    fn create(&self, id: NodeId, kind: NodeKind, position: Point) -> Node;

    /// Port set of a switch node for the given case names: one input, one
    /// output per case (`case_<n>`), plus a `default` output.
    fn switch_ports(&self, cases: &[String]) -> Ports {
        let mut ports = Ports::new();
        ports.push(Port::new("in", PortGroup::In));
        for i in 0..cases.len() {
            ports.push(Port::new(case_port_id(i), PortGroup::Out));
        }
        ports.push(Port::new("default", PortGroup::Out));
        ports
    }
}

/// Port id encoding a switch case index.
pub fn case_port_id(index: usize) -> String {
    format!("case_{index}")
}

/// Decode a switch case index from a port id (`case_2` → 2).
pub fn case_index(port: &str) -> Option<usize> {
    port.strip_prefix("case_")?.parse().ok()
}

/// Stock factory with one constructor per node kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNodeFactory;

impl NodeFactory for DefaultNodeFactory {
    fn create(&self, id: NodeId, kind: NodeKind, position: Point) -> Node {
        match kind {
            NodeKind::Start => terminal_node(id, kind, position, "Start", Color::rgb(0x2E, 0xCC, 0x71)),
            NodeKind::End => terminal_node(id, kind, position, "End", Color::rgb(0xE7, 0x4C, 0x3C)),
            NodeKind::Process => process_node(id, position),
            NodeKind::Decision => decision_node(id, position),
            NodeKind::Switch => self.switch_node(id, position),
            NodeKind::Container => container_node(id, position),
            NodeKind::GroupSetting => group_setting_node(id, position),
        }
    }
}

impl DefaultNodeFactory {
    fn switch_node(&self, id: NodeId, position: Point) -> Node {
        let cases = vec!["case 1".to_string(), "case 2".to_string()];
        let mut node = Node::new(
            id,
            NodeKind::Switch,
            position,
            Size::new(140.0, 70.0),
            style(Shape::Hexagon, "Switch", Color::rgb(0xF3, 0xE5, 0xF5)),
        );
        node.flags.is_switch = true;
        node.ports = self.switch_ports(&cases);
        node.properties.insert("expression".into(), json!(""));
        node.properties.insert("cases".into(), json!(cases));
        node
    }
}

fn style(shape: Shape, label: &str, fill: Color) -> NodeStyle {
    NodeStyle {
        shape,
        label: label.to_string(),
        fill,
        stroke: Color::rgb(0x33, 0x33, 0x33),
        stroke_width: 1.5,
    }
}

fn in_out_ports() -> Ports {
    let mut ports = Ports::new();
    ports.push(Port::new("in", PortGroup::In));
    ports.push(Port::new("out", PortGroup::Out));
    ports
}

fn terminal_node(id: NodeId, kind: NodeKind, position: Point, label: &str, fill: Color) -> Node {
    let mut node = Node::new(id, kind, position, Size::new(60.0, 60.0), style(Shape::Circle, label, fill));
    // start only emits, end only receives
    let port = match kind {
        NodeKind::Start => Port::new("out", PortGroup::Out),
        _ => Port::new("in", PortGroup::In),
    };
    node.ports.push(port);
    node
}

fn process_node(id: NodeId, position: Point) -> Node {
    let mut node = Node::new(
        id,
        NodeKind::Process,
        position,
        Size::new(120.0, 60.0),
        style(Shape::RoundedRectangle, "Process", Color::rgb(0xE3, 0xF2, 0xFD)),
    );
    node.ports = in_out_ports();
    node.properties.insert("action".into(), json!(""));
    node
}

fn decision_node(id: NodeId, position: Point) -> Node {
    let mut node = Node::new(
        id,
        NodeKind::Decision,
        position,
        Size::new(100.0, 100.0),
        style(Shape::Diamond, "Decision", Color::rgb(0xFF, 0xF8, 0xE1)),
    );
    node.ports.push(Port::new("in", PortGroup::In));
    node.ports.push(Port::new("yes", PortGroup::Out));
    node.ports.push(Port::new("no", PortGroup::Out));
    node.properties.insert("condition".into(), json!(""));
    node
}

fn container_node(id: NodeId, position: Point) -> Node {
    let mut node = Node::new(
        id,
        NodeKind::Container,
        position,
        Size::new(300.0, 200.0),
        style(Shape::Rectangle, "Container", Color::rgb(0xFA, 0xFA, 0xFA)),
    );
    node.flags.is_container = true;
    node.flags.is_resizable = true;
    node.ports = in_out_ports();
    node
}

fn group_setting_node(id: NodeId, position: Point) -> Node {
    let mut node = Node::new(
        id,
        NodeKind::GroupSetting,
        position,
        Size::new(160.0, 80.0),
        style(Shape::Rectangle, "Group Setting", Color::rgb(0xEC, 0xEF, 0xF1)),
    );
    node.flags.is_resizable = true;
    node.ports = in_out_ports();
    node.properties.insert("settings".into(), json!({}));
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds_with_its_own_marker() {
        for kind in NodeKind::ALL {
            let node = DefaultNodeFactory.create(NodeId::intern("fac_any"), kind, Point::new(5.0, 6.0));
            assert_eq!(node.kind, kind);
            assert_eq!(node.position, Point::new(5.0, 6.0));
            assert_eq!(
                NodeKind::infer(node.style.shape, &node.style.label, &node.flags),
                Some(kind),
                "markers of {kind:?} must map back to it"
            );
        }
    }

    #[test]
    fn switch_has_port_per_case() {
        let node = DefaultNodeFactory.create(NodeId::intern("fac_sw"), NodeKind::Switch, Point::default());
        assert_eq!(node.switch_cases(), vec!["case 1", "case 2"]);
        let ids: Vec<&str> = node.ports.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["in", "case_0", "case_1", "default"]);
    }

    #[test]
    fn case_port_encoding() {
        assert_eq!(case_index(&case_port_id(3)), Some(3));
        assert_eq!(case_index("default"), None);
        assert_eq!(case_index("case_x"), None);
    }

    #[test]
    fn only_containers_carry_container_flag() {
        for kind in NodeKind::ALL {
            let node = DefaultNodeFactory.create(NodeId::intern("fac_flag"), kind, Point::default());
            assert_eq!(node.flags.is_container, kind.is_container());
        }
    }
}

//! Container embedding rules.
//!
//! Every path that creates a parent/child relation goes through
//! [`can_embed`]: interactive drops, embed commands, clipboard paste and
//! delete-undo restoration, and [`FlowGraph::embed`](crate::FlowGraph::embed) itself.

use crate::model::Node;

/// Whether `child` may be embedded in `container`.
///
/// Only container-kind nodes parent others, terminals are never embedded,
/// containers never nest, and a node cannot contain itself.
#[must_use]
pub fn can_embed(child: &Node, container: &Node) -> bool {
    if child.id == container.id {
        return false;
    }
    if !container.kind.is_container() {
        return false;
    }
    if child.kind.is_terminal() {
        return false;
    }
    !child.kind.is_container()
}

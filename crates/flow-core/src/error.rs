use crate::id::{LinkId, NodeId};
use thiserror::Error;

/// Errors raised by the graph store and node reconstruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {0} already exists in the graph")]
    DuplicateNodeId(NodeId),

    #[error("link {0} already exists in the graph")]
    DuplicateLinkId(LinkId),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("link {0} not found")]
    LinkNotFound(LinkId),

    #[error("link {link} has a dangling endpoint: node {node} does not exist")]
    DanglingEndpoint { link: LinkId, node: NodeId },

    #[error("cannot determine the kind of node {id} from its snapshot (shape `{shape}`)")]
    UnknownKind { id: NodeId, shape: String },
}

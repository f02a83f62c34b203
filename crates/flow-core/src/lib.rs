pub mod embedding;
pub mod error;
pub mod factory;
pub mod id;
pub mod model;
pub mod snapshot;

pub use embedding::can_embed;
pub use error::GraphError;
pub use factory::{DefaultNodeFactory, NodeFactory, case_index, case_port_id};
pub use id::{LinkId, NodeId};
pub use model::*;
pub use snapshot::{GraphSnapshot, NodeSnapshot, restore_link};

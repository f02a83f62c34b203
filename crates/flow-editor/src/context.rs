//! Editor context and the document commands operate on.
//!
//! Selection and the open property editor are host state that commands must
//! clear when they destroy the entity referenced. Instead of a global, the
//! host hands them in through [`Document::context`].

use flow_core::{DefaultNodeFactory, FlowGraph, LinkId, NodeFactory, NodeId};
use std::fmt;

/// Selection and property-editor state visible to commands.
pub trait EditorContext {
    fn selected_nodes(&self) -> Vec<NodeId>;
    fn set_selected_nodes(&mut self, ids: Vec<NodeId>);
    fn selected_link(&self) -> Option<LinkId>;
    fn set_selected_link(&mut self, link: Option<LinkId>);
    /// Node whose properties are currently open for editing.
    fn property_editor(&self) -> Option<NodeId>;
    fn set_property_editor(&mut self, target: Option<NodeId>);

    /// Drop every reference to a node about to be destroyed.
    fn release_node(&mut self, id: NodeId) {
        let selected = self.selected_nodes();
        if selected.contains(&id) {
            self.set_selected_nodes(selected.into_iter().filter(|n| *n != id).collect());
        }
        if self.property_editor() == Some(id) {
            self.set_property_editor(None);
        }
    }

    /// Drop the selected-link reference if it points at `id`.
    fn release_link(&mut self, id: LinkId) {
        if self.selected_link() == Some(id) {
            self.set_selected_link(None);
        }
    }
}

/// Plain in-memory editor context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub selected_nodes: Vec<NodeId>,
    pub selected_link: Option<LinkId>,
    pub property_editor: Option<NodeId>,
}

impl EditorContext for EditorState {
    fn selected_nodes(&self) -> Vec<NodeId> {
        self.selected_nodes.clone()
    }

    fn set_selected_nodes(&mut self, ids: Vec<NodeId>) {
        self.selected_nodes = ids;
    }

    fn selected_link(&self) -> Option<LinkId> {
        self.selected_link
    }

    fn set_selected_link(&mut self, link: Option<LinkId>) {
        self.selected_link = link;
    }

    fn property_editor(&self) -> Option<NodeId> {
        self.property_editor
    }

    fn set_property_editor(&mut self, target: Option<NodeId>) {
        self.property_editor = target;
    }
}

/// Everything a command needs: the live graph, the editor context and the
/// node factory used for creation and restoration.
pub struct Document {
    pub graph: FlowGraph,
    pub context: Box<dyn EditorContext>,
    pub factory: Box<dyn NodeFactory>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("graph", &self.graph)
            .field("selected_nodes", &self.context.selected_nodes())
            .field("selected_link", &self.context.selected_link())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with an [`EditorState`] context and the stock factory.
    pub fn new() -> Self {
        Self::with_parts(FlowGraph::new(), Box::new(EditorState::default()), Box::new(DefaultNodeFactory))
    }

    pub fn with_parts(
        graph: FlowGraph,
        context: Box<dyn EditorContext>,
        factory: Box<dyn NodeFactory>,
    ) -> Self {
        Self {
            graph,
            context,
            factory,
        }
    }
}

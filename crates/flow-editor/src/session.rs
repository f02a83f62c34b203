//! Editor session: one document, its history, and a clipboard.
//!
//! Every user-level edit is turned into a command and recorded. Drag
//! gestures are applied live and recorded once on release, together with
//! the embedding change the drop causes, as a single undo step.

use crate::batch::{BatchCommand, MultiSelectionMoveCommand};
use crate::clipboard::ClipboardManager;
use crate::commands::{Command, CommandHistory, CommandOutput, HistoryStatus};
use crate::config::EditorConfig;
use crate::context::Document;
use crate::embedding::{EmbedNodeCommand, check_container_embedding};
use crate::error::{ClipboardError, CommandError};
use crate::link_commands::{CreateLinkCommand, DeleteLinkCommand};
use crate::node_commands::{
    CarriedPositions, CreateNodeCommand, DeleteNodeCommand, MoveNodeCommand, MultiNodeDeleteCommand, NodeField, NodeOptions,
    PropertyChangeCommand, ResizeContainerCommand,
};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use flow_core::{FlowGraph, GraphError, GraphSnapshot, LinkId, NodeId, NodeKind, Point, Size};
use serde_json::Value;

/// Positions captured when a drag starts.
#[derive(Debug, Clone)]
struct DragState {
    origins: Vec<(NodeId, Point)>,
    /// Embedded children of dragged containers that are not dragged themselves.
    carried: Vec<(NodeId, Point)>,
}

#[derive(Debug)]
pub struct Editor {
    doc: Document,
    history: CommandHistory,
    clipboard: ClipboardManager,
    config: EditorConfig,
    drag: Option<DragState>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    pub fn with_document(doc: Document, config: EditorConfig) -> Self {
        Self {
            doc,
            history: CommandHistory::new(config.max_history),
            clipboard: ClipboardManager::new(config.clipboard.clone()),
            config,
            drag: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.doc.graph
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn clipboard(&self) -> &ClipboardManager {
        &self.clipboard
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn status(&self) -> HistoryStatus {
        self.history.status()
    }

    /// Record and run an arbitrary command.
    pub fn execute(&mut self, cmd: Box<dyn Command>) -> Result<CommandOutput, CommandError> {
        self.history.execute_command(cmd, &mut self.doc)
    }

    // ─── Nodes and links ─────────────────────────────────────────────────

    pub fn add_node(&mut self, kind: NodeKind, position: Point, options: NodeOptions) -> Result<NodeId, CommandError> {
        let cmd = CreateNodeCommand::new(kind, position, options);
        let description = cmd.description().to_string();
        match self.execute(Box::new(cmd))? {
            CommandOutput::Node(id) => Ok(id),
            _ => Err(CommandError::MissingOutput(description)),
        }
    }

    pub fn connect(
        &mut self,
        source: NodeId,
        source_port: Option<&str>,
        target: NodeId,
        target_port: Option<&str>,
    ) -> Result<LinkId, CommandError> {
        let cmd = CreateLinkCommand::new(source, source_port, target, target_port);
        let description = cmd.description().to_string();
        match self.execute(Box::new(cmd))? {
            CommandOutput::Link(id) => Ok(id),
            _ => Err(CommandError::MissingOutput(description)),
        }
    }

    /// Delete the selected nodes, or the selected link when no node is
    /// selected. Returns false when nothing was selected.
    pub fn delete_selection(&mut self) -> Result<bool, CommandError> {
        let selected: Vec<NodeId> = self
            .doc
            .context
            .selected_nodes()
            .into_iter()
            .filter(|id| self.doc.graph.contains(*id))
            .collect();

        let cmd: Box<dyn Command> = match selected.as_slice() {
            [] => match self.doc.context.selected_link() {
                Some(link) => Box::new(DeleteLinkCommand::new(&self.doc, link)?),
                None => return Ok(false),
            },
            [single] => Box::new(DeleteNodeCommand::new(&self.doc, *single)?),
            many => Box::new(MultiNodeDeleteCommand::new(&self.doc, many)?),
        };
        self.execute(cmd)?;
        Ok(true)
    }

    pub fn set_property(&mut self, id: NodeId, field: NodeField, value: Value) -> Result<(), CommandError> {
        let cmd = PropertyChangeCommand::new(&self.doc, id, field, value)?;
        self.execute(Box::new(cmd))?;
        Ok(())
    }

    pub fn resize(&mut self, id: NodeId, size: Size) -> Result<(), CommandError> {
        let cmd = ResizeContainerCommand::new(&self.doc, id, size)?;
        self.execute(Box::new(cmd))?;
        Ok(())
    }

    /// Move one node as its own undo step, without touching its embedding.
    pub fn move_node(&mut self, id: NodeId, to: Point) -> Result<(), CommandError> {
        let from = self.doc.graph.node(id).ok_or(GraphError::NodeNotFound(id))?.position;
        self.execute(Box::new(MoveNodeCommand::new(id, from, to)))?;
        Ok(())
    }

    /// Embed `child` in `container`, pulling it inside the container's bounds.
    /// Returns false when the embedding rules refuse the pair.
    pub fn embed(&mut self, container: NodeId, child: NodeId) -> Result<bool, CommandError> {
        let cmd = EmbedNodeCommand::embed(container, child).with_padding(self.config.embed_padding);
        let out = self.execute(Box::new(cmd))?;
        Ok(out != CommandOutput::None)
    }

    pub fn unembed(&mut self, child: NodeId) -> Result<bool, CommandError> {
        let Some(container) = self.doc.graph.parent_of(child) else {
            return Ok(false);
        };
        let out = self.execute(Box::new(EmbedNodeCommand::unembed(container, child)))?;
        Ok(out != CommandOutput::None)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, ids: Vec<NodeId>) {
        self.doc.context.set_selected_nodes(ids);
        self.doc.context.set_selected_link(None);
    }

    pub fn select_link(&mut self, id: Option<LinkId>) {
        self.doc.context.set_selected_nodes(Vec::new());
        self.doc.context.set_selected_link(id);
    }

    pub fn select_all(&mut self) {
        let ids = self.doc.graph.draw_order().to_vec();
        self.select(ids);
    }

    pub fn deselect(&mut self) {
        self.select(Vec::new());
    }

    pub fn selection(&self) -> Vec<NodeId> {
        self.doc.context.selected_nodes()
    }

    // ─── Drag gestures ───────────────────────────────────────────────────

    /// Start dragging `ids`. A drag already in progress is finished first.
    pub fn begin_drag(&mut self, ids: &[NodeId]) -> Result<(), CommandError> {
        if self.drag.is_some() {
            self.end_drag()?;
        }
        let origins: Vec<(NodeId, Point)> = ids
            .iter()
            .filter_map(|id| self.doc.graph.node(*id).map(|n| (*id, n.position)))
            .collect();
        let carried = origins
            .iter()
            .flat_map(|(id, _)| self.doc.graph.embedded_positions(*id))
            .filter(|(child, _)| !ids.contains(child))
            .collect();
        self.drag = Some(DragState { origins, carried });
        Ok(())
    }

    /// Apply a live drag step. Nothing is recorded until [`Self::end_drag`].
    pub fn drag_by(&mut self, dx: f32, dy: f32) {
        let Some(drag) = &self.drag else {
            return;
        };
        let dragged: Vec<NodeId> = drag.origins.iter().map(|(id, _)| *id).collect();
        for id in &dragged {
            // children ride along with a dragged container
            if self.doc.graph.parent_of(*id).is_some_and(|p| dragged.contains(&p)) {
                continue;
            }
            if let Some(p) = self.doc.graph.node(*id).map(|n| n.position) {
                self.doc.graph.move_node(*id, p.offset(dx, dy));
            }
        }
    }

    /// Finish the drag: record the moves plus any embedding change caused
    /// by the drop as one undo step. Returns `None` when nothing moved.
    pub fn end_drag(&mut self) -> Result<Option<CommandOutput>, CommandError> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };

        let moves: Vec<(NodeId, Point, Point)> = drag
            .origins
            .iter()
            .filter_map(|(id, from)| self.doc.graph.node(*id).map(|n| (*id, *from, n.position)))
            .filter(|(_, from, to)| from != to)
            .collect();
        if moves.is_empty() {
            return Ok(None);
        }

        let mut steps: Vec<Box<dyn Command>> = Vec::with_capacity(moves.len() * 2);
        let embeds: Vec<EmbedNodeCommand> = moves
            .iter()
            .filter_map(|(id, _, _)| check_container_embedding(&self.doc, *id, self.config.embed_padding))
            .collect();

        let carried: CarriedPositions = drag
            .carried
            .iter()
            .filter_map(|(child, from)| self.doc.graph.node(*child).map(|n| (*child, *from, n.position)))
            .collect();
        match moves.as_slice() {
            [(id, from, to)] => steps.push(Box::new(MoveNodeCommand::new(*id, *from, *to).with_carried(carried))),
            _ => steps.push(Box::new(MultiSelectionMoveCommand::new(moves.clone()).with_carried(carried))),
        }
        for embed in embeds {
            steps.push(Box::new(embed));
        }

        let cmd: Box<dyn Command> = if steps.len() == 1 {
            steps.remove(0)
        } else {
            Box::new(BatchCommand::new(format!("Drag {} node(s)", moves.len()), steps))
        };
        self.execute(cmd).map(Some)
    }

    /// Abandon the drag and put every node back where it started.
    pub fn cancel_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        for (id, origin) in drag.origins.into_iter().chain(drag.carried) {
            self.doc.graph.set_position(id, origin);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy(&mut self) -> Result<usize, ClipboardError> {
        self.clipboard.copy(&self.doc)
    }

    /// Copy the selection, then delete it in one undo step.
    pub fn cut(&mut self) -> Result<usize, ClipboardError> {
        let count = self.clipboard.copy(&self.doc)?;
        let copyable: Vec<NodeId> = self
            .doc
            .context
            .selected_nodes()
            .into_iter()
            .filter(|id| self.doc.graph.node(*id).is_some_and(|n| n.kind.is_copyable()))
            .collect();
        let cmd = MultiNodeDeleteCommand::new(&self.doc, &copyable)?;
        self.execute(Box::new(cmd))?;
        Ok(count)
    }

    pub fn paste(&mut self) -> Result<Vec<NodeId>, ClipboardError> {
        self.clipboard.paste(&mut self.history, &mut self.doc)
    }

    /// Copy and paste the selection without touching the clipboard.
    pub fn duplicate(&mut self) -> Result<Vec<NodeId>, ClipboardError> {
        let mut scratch = ClipboardManager::new(self.config.clipboard.clone());
        scratch.copy(&self.doc)?;
        scratch.paste(&mut self.history, &mut self.doc)
    }

    // ─── History and document ────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.cancel_drag();
        self.history.undo(&mut self.doc)
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_drag();
        self.history.redo(&mut self.doc)
    }

    /// Remove every node as one undoable step.
    pub fn delete_all(&mut self) -> Result<bool, CommandError> {
        if self.doc.graph.is_empty() {
            return Ok(false);
        }
        let ids = self.doc.graph.draw_order().to_vec();
        let cmd = MultiNodeDeleteCommand::new(&self.doc, &ids)?;
        self.execute(Box::new(cmd))?;
        Ok(true)
    }

    /// Start over with an empty document. History, selection and any drag
    /// in progress are dropped. Returns false if there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        let had_content = !self.doc.graph.is_empty();
        self.reset();
        self.doc.graph.clear();
        had_content
    }

    /// Replace the document with `snapshot`. On success history and
    /// selection are reset; on error the current document is kept as is.
    pub fn load(&mut self, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
        snapshot.restore_into(&mut self.doc.graph, self.doc.factory.as_ref())?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.drag = None;
        self.deselect();
        self.doc.context.set_property_editor(None);
        self.history.clear();
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.doc.graph)
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and run a shortcut. Returns the action taken, if any.
    pub fn handle_shortcut(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta)?;
        let result: Result<(), ClipboardError> = match action {
            ShortcutAction::Undo => {
                self.undo();
                Ok(())
            }
            ShortcutAction::Redo => {
                self.redo();
                Ok(())
            }
            ShortcutAction::Delete => self.delete_selection().map(|_| ()).map_err(Into::into),
            ShortcutAction::SelectAll => {
                self.select_all();
                Ok(())
            }
            ShortcutAction::Deselect => {
                self.deselect();
                Ok(())
            }
            ShortcutAction::Duplicate => self.duplicate().map(|_| ()),
            ShortcutAction::Copy => self.copy().map(|_| ()),
            ShortcutAction::Cut => self.cut().map(|_| ()),
            ShortcutAction::Paste => self.paste().map(|_| ()),
            ShortcutAction::ClearAll => self.delete_all().map(|_| ()).map_err(Into::into),
        };
        if let Err(e) = result {
            log::warn!("{action:?} failed: {e}");
        }
        Some(action)
    }
}

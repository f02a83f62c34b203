//! Copy/paste of node selections.
//!
//! The clipboard holds detached [`NodeSnapshot`]s. Every paste rebuilds them
//! under fresh ids, offset from the originals by a stagger that grows with
//! each paste, as one [`BatchCommand`] so a paste is a single undo step.

use crate::batch::BatchCommand;
use crate::commands::{Command, CommandHistory};
use crate::config::ClipboardConfig;
use crate::context::Document;
use crate::embedding::EmbedNodeCommand;
use crate::error::ClipboardError;
use crate::node_commands::CreateNodeCommand;
use flow_core::{NodeId, NodeSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardStatus {
    pub is_empty: bool,
    pub node_count: usize,
    pub paste_count: usize,
}

/// Portable clipboard payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClipboardContents {
    nodes: Vec<NodeSnapshot>,
}

#[derive(Debug)]
pub struct ClipboardManager {
    config: ClipboardConfig,
    contents: Vec<NodeSnapshot>,
    paste_count: usize,
}

impl ClipboardManager {
    pub fn new(config: ClipboardConfig) -> Self {
        Self {
            config,
            contents: Vec::new(),
            paste_count: 0,
        }
    }

    /// Copy the selected nodes. Terminals are filtered out; a selection with
    /// nothing left, or more than `max_nodes` left, is refused and the
    /// clipboard keeps its previous contents.
    pub fn copy(&mut self, doc: &Document) -> Result<usize, ClipboardError> {
        let snapshots: Vec<NodeSnapshot> = doc
            .context
            .selected_nodes()
            .into_iter()
            .filter_map(|id| doc.graph.node(id))
            .filter(|n| n.kind.is_copyable())
            .map(NodeSnapshot::capture)
            .collect();

        if snapshots.is_empty() {
            return Err(ClipboardError::NothingCopyable);
        }
        if snapshots.len() > self.config.max_nodes {
            return Err(ClipboardError::TooMany {
                count: snapshots.len(),
                max: self.config.max_nodes,
            });
        }

        let count = snapshots.len();
        self.contents = snapshots;
        self.paste_count = 0;
        log::debug!("copied {count} node(s)");
        Ok(count)
    }

    /// Paste the clipboard through `history` and select the new nodes.
    /// Returns the new ids in clipboard order.
    pub fn paste(&mut self, history: &mut CommandHistory, doc: &mut Document) -> Result<Vec<NodeId>, ClipboardError> {
        if self.contents.is_empty() {
            return Err(ClipboardError::Empty);
        }

        let step = (1 + self.paste_count) as f32;
        let (dx, dy) = (self.config.offset_x * step, self.config.offset_y * step);

        let mut id_map: HashMap<NodeId, NodeId> = HashMap::with_capacity(self.contents.len());
        let mut new_ids = Vec::with_capacity(self.contents.len());
        let mut steps: Vec<Box<dyn Command>> = Vec::with_capacity(self.contents.len());

        for snapshot in &self.contents {
            let kind = snapshot.resolve_kind()?;
            let new_id = doc.graph.fresh_node_id(kind.id_prefix());
            let copy = snapshot.relocated(new_id, snapshot.position.offset(dx, dy));
            steps.push(Box::new(CreateNodeCommand::from_snapshot(copy)?));
            id_map.insert(snapshot.id, new_id);
            new_ids.push(new_id);
        }

        // only relations inside this paste are rebuilt
        for snapshot in &self.contents {
            let Some(container) = id_map.get(&snapshot.id) else {
                continue;
            };
            for child in &snapshot.embeds {
                if let Some(new_child) = id_map.get(child) {
                    steps.push(Box::new(EmbedNodeCommand::embed(*container, *new_child)));
                }
            }
        }

        let batch = BatchCommand::new(format!("Paste {} node(s)", new_ids.len()), steps);
        history.execute_command(Box::new(batch), doc)?;

        doc.context.set_selected_nodes(new_ids.clone());
        self.paste_count += 1;
        Ok(new_ids)
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn status(&self) -> ClipboardStatus {
        ClipboardStatus {
            is_empty: self.is_empty(),
            node_count: self.contents.len(),
            paste_count: self.paste_count,
        }
    }

    pub fn clear(&mut self) {
        self.contents.clear();
        self.paste_count = 0;
    }

    /// MessagePack export of the clipboard contents.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClipboardError> {
        let payload = ClipboardContents {
            nodes: self.contents.clone(),
        };
        Ok(rmp_serde::to_vec_named(&payload)?)
    }

    /// Replace the contents with a payload produced by [`Self::to_bytes`].
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<usize, ClipboardError> {
        let payload: ClipboardContents = rmp_serde::from_slice(bytes)?;
        self.contents = payload.nodes;
        self.paste_count = 0;
        Ok(self.contents.len())
    }
}

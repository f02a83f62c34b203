//! Composite commands: ordered batches and multi-selection moves.

use crate::commands::{Command, CommandMeta, CommandOutput};
use crate::context::Document;
use crate::error::CommandError;
use crate::node_commands::{CarriedPositions, place_carried, settle_carried};
use flow_core::{NodeId, Point};

/// Runs sub-commands in order as one history entry; undo runs them in
/// reverse.
///
/// If a sub-command fails during execute, the ones already applied are
/// undone in reverse and the error is returned, so a failed batch leaves
/// the graph as it found it and is never recorded.
#[derive(Debug)]
pub struct BatchCommand {
    meta: CommandMeta,
    commands: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            meta: CommandMeta::new(description),
            commands,
        }
    }

    pub fn push(&mut self, cmd: Box<dyn Command>) {
        self.commands.push(cmd);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for BatchCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        let mut outputs = Vec::with_capacity(self.commands.len());
        for index in 0..self.commands.len() {
            match self.commands[index].execute(doc) {
                Ok(output) => outputs.push(output),
                Err(source) => {
                    for applied in self.commands[..index].iter_mut().rev() {
                        if let Err(e) = applied.undo(doc) {
                            log::error!("rollback of `{}` failed: {e}", applied.description());
                        }
                    }
                    return Err(CommandError::Batch {
                        description: self.meta.description.clone(),
                        index,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(CommandOutput::Batch(outputs))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        let mut failed = 0;
        for cmd in self.commands.iter_mut().rev() {
            if let Err(e) = cmd.undo(doc) {
                // keep unwinding
                log::error!("undo of `{}` inside batch failed: {e}", cmd.description());
                failed += 1;
            }
        }
        if failed > 0 {
            log::warn!("batch `{}`: {failed} step(s) could not be undone", self.meta.description);
        }
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

/// Replays caller-tracked positions for a dragged selection.
///
/// On first execute containers are placed first so their unselected
/// children travel with them, and those children's positions are recorded.
/// Undo and redo then set every node, carried children included, to its
/// exact recorded position. Ids that no longer resolve are skipped.
#[derive(Debug)]
pub struct MultiSelectionMoveCommand {
    meta: CommandMeta,
    /// (id, old, new)
    moves: Vec<(NodeId, Point, Point)>,
    carried: Option<CarriedPositions>,
}

impl MultiSelectionMoveCommand {
    pub fn new(moves: Vec<(NodeId, Point, Point)>) -> Self {
        Self {
            meta: CommandMeta::new(format!("Move {} nodes", moves.len())),
            moves,
            carried: None,
        }
    }

    /// Record a move whose unselected children were already placed.
    pub fn with_carried(mut self, carried: CarriedPositions) -> Self {
        self.carried = Some(carried);
        self
    }

    fn present(&self, doc: &Document) -> Vec<&(NodeId, Point, Point)> {
        let present: Vec<_> = self.moves.iter().filter(|m| doc.graph.contains(m.0)).collect();
        if present.len() < self.moves.len() {
            log::debug!("skipped {} vanished node(s)", self.moves.len() - present.len());
        }
        present
    }

    fn first_apply(&self, doc: &mut Document) -> (Vec<NodeId>, CarriedPositions) {
        let (containers, others): (Vec<&(NodeId, Point, Point)>, Vec<_>) = self
            .present(doc)
            .into_iter()
            .partition(|m| doc.graph.node(m.0).is_some_and(|n| n.kind.is_container()));

        let before: Vec<(NodeId, Point)> = containers
            .iter()
            .flat_map(|m| doc.graph.embedded_positions(m.0))
            .filter(|(child, _)| !self.moves.iter().any(|m| m.0 == *child))
            .collect();

        let mut moved = Vec::with_capacity(self.moves.len());
        for m in containers {
            doc.graph.move_node(m.0, m.2);
            moved.push(m.0);
        }
        for m in others {
            doc.graph.set_position(m.0, m.2);
            moved.push(m.0);
        }
        (moved, settle_carried(doc, before))
    }

    fn place(&self, doc: &mut Document, carried: &[(NodeId, Point, Point)], after: bool) -> Vec<NodeId> {
        let targets: Vec<(NodeId, Point)> = self
            .present(doc)
            .into_iter()
            .map(|m| (m.0, if after { m.2 } else { m.1 }))
            .collect();
        for (id, position) in &targets {
            doc.graph.set_position(*id, *position);
        }
        place_carried(doc, carried, after);
        targets.into_iter().map(|(id, _)| id).collect()
    }
}

impl Command for MultiSelectionMoveCommand {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError> {
        let moved = match &self.carried {
            Some(carried) => self.place(doc, carried, true),
            None => {
                let (moved, carried) = self.first_apply(doc);
                self.carried = Some(carried);
                moved
            }
        };
        Ok(CommandOutput::Nodes(moved))
    }

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        self.place(doc, self.carried.as_deref().unwrap_or_default(), false);
        Ok(())
    }

    fn meta(&self) -> &CommandMeta {
        &self.meta
    }
}

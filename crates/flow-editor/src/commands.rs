//! Undo/Redo command history.
//!
//! Every mutation is wrapped in a reversible [`Command`]. Commands capture
//! whatever they destroy when they are built and hold only ids and
//! snapshots, re-resolving through the graph on every execute/undo.
//! The history keeps a linear undo stack and a redo stack that is cleared
//! by every new command.

use crate::context::Document;
use crate::error::CommandError;
use flow_core::{LinkId, NodeId};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;

/// Description and creation time shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMeta {
    pub description: String,
    pub timestamp: SystemTime,
}

impl CommandMeta {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Entity produced by a command's execute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CommandOutput {
    #[default]
    None,
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Link(LinkId),
    Batch(Vec<CommandOutput>),
}

impl CommandOutput {
    /// Every node id produced, flattening batches.
    pub fn node_ids(&self) -> Vec<NodeId> {
        match self {
            CommandOutput::None | CommandOutput::Link(_) => Vec::new(),
            CommandOutput::Node(id) => vec![*id],
            CommandOutput::Nodes(ids) => ids.clone(),
            CommandOutput::Batch(outputs) => outputs.iter().flat_map(CommandOutput::node_ids).collect(),
        }
    }
}

/// A reversible graph mutation.
///
/// `execute → undo → execute` must reproduce the same graph every time.
/// A target that no longer resolves is logged and skipped; only
/// unrecoverable conditions (such as an id collision on re-creation) are errors.
pub trait Command: fmt::Debug {
    fn execute(&mut self, doc: &mut Document) -> Result<CommandOutput, CommandError>;

    fn undo(&mut self, doc: &mut Document) -> Result<(), CommandError>;

    fn meta(&self) -> &CommandMeta;

    fn description(&self) -> &str {
        &self.meta().description
    }

    fn timestamp(&self) -> SystemTime {
        self.meta().timestamp
    }
}

/// Summary of the history for toolbars and status bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_count: usize,
    pub redo_count: usize,
}

/// Manages the undo and redo stacks.
pub struct CommandHistory {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    /// Maximum undo depth.
    max_size: usize,
    /// Set while a command's execute or undo is running.
    executing: bool,
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl CommandHistory {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(max_size),
            redo_stack: Vec::new(),
            max_size,
            executing: false,
        }
    }

    /// Execute a command and record it. A command whose execute fails is
    /// not recorded and the error is returned.
    pub fn execute_command(
        &mut self,
        mut cmd: Box<dyn Command>,
        doc: &mut Document,
    ) -> Result<CommandOutput, CommandError> {
        if self.executing {
            return Err(CommandError::Reentrant);
        }
        self.executing = true;
        let result = cmd.execute(doc);
        self.executing = false;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                log::error!("command `{}` failed: {e}", cmd.description());
                return Err(e);
            }
        };

        log::debug!("executed `{}`", cmd.description());
        self.undo_stack.push_back(cmd);
        if self.undo_stack.len() > self.max_size
            && let Some(evicted) = self.undo_stack.pop_front()
        {
            log::debug!("history full, dropping oldest entry `{}`", evicted.description());
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
        Ok(output)
    }

    /// Undo the most recent command. Returns false when there is nothing to
    /// undo or the undo failed (the command then stays on the undo stack).
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        if self.executing {
            return false;
        }
        let Some(mut cmd) = self.undo_stack.pop_back() else {
            return false;
        };
        self.executing = true;
        let result = cmd.undo(doc);
        self.executing = false;

        match result {
            Ok(()) => {
                log::debug!("undid `{}`", cmd.description());
                self.redo_stack.push(cmd);
                true
            }
            Err(e) => {
                log::error!("undo of `{}` failed: {e}", cmd.description());
                self.undo_stack.push_back(cmd);
                false
            }
        }
    }

    /// Re-execute the most recently undone command.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        if self.executing {
            return false;
        }
        let Some(mut cmd) = self.redo_stack.pop() else {
            return false;
        };
        self.executing = true;
        let result = cmd.execute(doc);
        self.executing = false;

        match result {
            Ok(_) => {
                log::debug!("redid `{}`", cmd.description());
                self.undo_stack.push_back(cmd);
                true
            }
            Err(e) => {
                log::error!("redo of `{}` failed: {e}", cmd.description());
                self.redo_stack.push(cmd);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// True while a command is running. Side effects triggered from inside a
    /// command must not record a second command.
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
        }
    }

    /// Forget everything, e.g. when a document is cleared or loaded.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Appends to a shared log instead of touching the graph.
    #[derive(Debug)]
    struct Record {
        meta: CommandMeta,
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl Record {
        fn boxed(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn Command> {
            Box::new(Record {
                meta: CommandMeta::new(name),
                name,
                log: Rc::clone(log),
                fail: false,
            })
        }
    }

    impl Command for Record {
        fn execute(&mut self, _doc: &mut Document) -> Result<CommandOutput, CommandError> {
            if self.fail {
                return Err(CommandError::Graph(flow_core::GraphError::NodeNotFound(NodeId::intern(
                    "hist_missing",
                ))));
            }
            self.log.borrow_mut().push(format!("do {}", self.name));
            Ok(CommandOutput::None)
        }

        fn undo(&mut self, _doc: &mut Document) -> Result<(), CommandError> {
            self.log.borrow_mut().push(format!("undo {}", self.name));
            Ok(())
        }

        fn meta(&self) -> &CommandMeta {
            &self.meta
        }
    }

    #[test]
    fn undo_redo_cycle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new();
        let mut history = CommandHistory::new(100);

        history.execute_command(Record::boxed("a", &log), &mut doc).unwrap();
        assert_eq!(history.undo_description(), Some("a"));
        assert!(history.undo(&mut doc));
        assert!(history.can_redo());
        assert!(history.redo(&mut doc));
        assert_eq!(*log.borrow(), vec!["do a", "undo a", "do a"]);
    }

    #[test]
    fn redo_clears_on_new_action() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new();
        let mut history = CommandHistory::new(100);

        history.execute_command(Record::boxed("a", &log), &mut doc).unwrap();
        history.undo(&mut doc);
        assert!(history.can_redo());

        // New action clears redo
        history.execute_command(Record::boxed("b", &log), &mut doc).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn max_size_evicts_oldest() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new();
        let mut history = CommandHistory::new(3);

        for name in ["a", "b", "c", "d"] {
            history.execute_command(Record::boxed(name, &log), &mut doc).unwrap();
        }
        assert_eq!(history.status().undo_count, 3);
        assert!(history.undo(&mut doc));
        assert!(history.undo(&mut doc));
        assert!(history.undo(&mut doc));
        assert!(!history.undo(&mut doc));
        // "a" was evicted and never undone
        assert!(!log.borrow().contains(&"undo a".to_string()));
    }

    #[test]
    fn failed_execute_is_not_recorded() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new();
        let mut history = CommandHistory::new(10);
        let failing = Box::new(Record {
            meta: CommandMeta::new("broken"),
            name: "broken",
            log: Rc::clone(&log),
            fail: true,
        });

        assert!(history.execute_command(failing, &mut doc).is_err());
        assert!(!history.can_undo());
        assert!(!history.is_executing());
    }

    #[test]
    fn empty_stacks_report_false() {
        let mut doc = Document::new();
        let mut history = CommandHistory::new(10);
        assert!(!history.undo(&mut doc));
        assert!(!history.redo(&mut doc));
        assert_eq!(
            history.status(),
            HistoryStatus {
                can_undo: false,
                can_redo: false,
                undo_count: 0,
                redo_count: 0,
            }
        );
    }

    #[test]
    fn clear_drops_both_stacks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new();
        let mut history = CommandHistory::new(10);
        history.execute_command(Record::boxed("a", &log), &mut doc).unwrap();
        history.execute_command(Record::boxed("b", &log), &mut doc).unwrap();
        history.undo(&mut doc);
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}

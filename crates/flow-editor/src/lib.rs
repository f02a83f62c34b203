pub mod batch;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod link_commands;
pub mod node_commands;
pub mod session;
pub mod shortcuts;

pub use batch::{BatchCommand, MultiSelectionMoveCommand};
pub use clipboard::{ClipboardManager, ClipboardStatus};
pub use commands::{Command, CommandHistory, CommandMeta, CommandOutput, HistoryStatus};
pub use config::{ClipboardConfig, EditorConfig, load_config};
pub use context::{Document, EditorContext, EditorState};
pub use embedding::{EmbedAction, EmbedNodeCommand, check_container_embedding};
pub use error::{ClipboardError, CommandError, ConfigError};
pub use link_commands::{CreateLinkCommand, DeleteLinkCommand};
pub use node_commands::{
    CarriedPositions, CreateNodeCommand, DeleteNodeCommand, MoveNodeCommand, MultiNodeDeleteCommand, NodeField, NodeOptions,
    PropertyChangeCommand, ResizeContainerCommand,
};
pub use session::Editor;
pub use shortcuts::{ShortcutAction, ShortcutMap};

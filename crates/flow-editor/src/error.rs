use flow_core::GraphError;
use thiserror::Error;

/// Errors raised while executing or undoing a command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("a command is already executing")]
    Reentrant,

    #[error("command `{0}` produced nothing to return")]
    MissingOutput(String),

    #[error("batch `{description}` failed at step {index}: {source}")]
    Batch {
        description: String,
        index: usize,
        source: Box<CommandError>,
    },
}

/// Errors raised by clipboard copy/paste.
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("clipboard is empty")]
    Empty,

    #[error("selection contains no copyable nodes")]
    NothingCopyable,

    #[error("selection has {count} copyable nodes, more than the limit of {max}")]
    TooMany { count: usize, max: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to encode clipboard: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode clipboard: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Errors raised while loading editor configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

use thiserror::Error;

/// Errors raised while building or encoding raw grid observations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must have at least one row and one column")]
    Empty,
    #[error("grid expected {expected} cells but received {actual}")]
    CellCount { expected: usize, actual: usize },
    #[error("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("grid is {actual_height}x{actual_width}, encoder expects {height}x{width}")]
    ShapeMismatch {
        height: usize,
        width: usize,
        actual_height: usize,
        actual_width: usize,
    },
    #[error("cell value {value} at ({row}, {col}) exceeds channel count {channels}")]
    CellOutOfRange {
        row: usize,
        col: usize,
        value: u8,
        channels: usize,
    },
}

/// Errors that can occur when building or driving the reference orchard game.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown level: {0}")]
    UnknownLevel(String),
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("action index {0} is out of range")]
    InvalidAction(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// Errors surfaced by the DQN agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("state encoding failed: {0}")]
    Encoding(#[from] GridError),
    #[error("malformed demonstration: {0}")]
    Demonstration(#[from] serde_json::Error),
    #[error("checkpoint record failure: {0}")]
    Checkpoint(#[from] burn::record::RecorderError),
    #[error("checkpoint encoding failure: {0}")]
    CheckpointEncode(#[from] bincode::error::EncodeError),
    #[error("checkpoint decoding failure: {0}")]
    CheckpointDecode(#[from] bincode::error::DecodeError),
    #[error("checkpoint was written for {found}, network expects {expected}")]
    CheckpointMismatch { expected: String, found: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("action index {action} is outside the action space of {action_count}")]
    InvalidAction { action: usize, action_count: usize },
    #[error("training state is not initialized")]
    NotTraining,
    #[error("evaluation requires testing mode; training state is still initialized")]
    TrainingActive,
    #[error("tensor conversion failed: {0}")]
    Tensor(String),
}

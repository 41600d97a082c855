//! Error types for the session controller.

use thiserror::Error;

use crate::types::{Color, Point};

/// Failures reported by an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("illegal move {point} for {color}")]
    IllegalMove { point: Point, color: Color },

    #[error("ply {index} was recorded for {found} but {expected} was to move")]
    OutOfTurn {
        index: usize,
        expected: Color,
        found: Color,
    },

    #[error("resignation at ply {0} is not the final ply")]
    ResignNotLast(usize),

    #[error("ply {0} follows two consecutive passes")]
    PlyAfterGameEnd(usize),

    #[error("record board size {0} is not supported")]
    BoardSize(u8),
}

/// Structural problems found while decoding a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("invalid record magic")]
    Magic,

    #[error("unsupported record version: expected {expected}, got {actual}")]
    Version { expected: u32, actual: u32 },

    #[error("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("unexpected EOF while reading {0}")]
    Truncated(&'static str),

    #[error("record payload has trailing bytes")]
    TrailingBytes,

    #[error("invalid {field} value {value} in ply #{index}")]
    InvalidPly {
        index: usize,
        field: &'static str,
        value: u8,
    },

    #[error("invalid header field {0}")]
    InvalidHeader(&'static str),
}

/// Main error type for session operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid vertex: {0}")]
    InvalidVertex(String),

    #[error("game is already over")]
    GameOver,

    #[error("session already started")]
    AlreadyStarted,

    #[error("session not started")]
    NotStarted,

    #[error("dispatcher has been shut down")]
    Closed,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod board;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod projector;
pub mod record;
pub mod session;
pub mod types;
pub mod wasm;

pub use config::GameConfig;
pub use dispatcher::{Command, CommandDispatcher, DispatchOutcome, Rejection, SnapshotObserver};
pub use engine::{BoardEngine, Engine};
pub use error::{Error, Result};
pub use projector::BoardStateProjector;
pub use record::{MoveRecord, RecordManager};
pub use session::GameSession;
pub use types::{BoardSnapshot, CellState, Color, GameEvent, Move, Point, SessionState};

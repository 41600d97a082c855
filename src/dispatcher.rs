//! Single entry point for UI commands.
//!
//! Every accepted command runs to completion before `dispatch` returns:
//! engine call, session update, record append, projection and
//! classification, buffer regeneration, then the new snapshot is pushed to
//! every observer. Rejected commands touch nothing.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::engine::Engine;
use crate::error::{EngineError, Error, Result};
use crate::projector::BoardStateProjector;
use crate::record::{MoveRecord, RecordManager};
use crate::session::GameSession;
use crate::types::{BoardSnapshot, Move, Ply, Point, SessionState};

/// Commands a UI can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play(Point),
    Pass,
    Resign,
    /// Let the engine take its turn.
    GenMove,
    Restart {
        level: Option<u8>,
        player_is_white: Option<bool>,
    },
    Save,
    ForceQuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    IllegalMove,
    NotEngineTurn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied(SessionState),
    Rejected(Rejection),
    /// The command is not valid in the current state; nothing happened.
    Unchanged,
    Saved(PathBuf),
    Quit,
}

/// Receives every published snapshot.
pub trait SnapshotObserver {
    fn on_snapshot(&mut self, snapshot: &BoardSnapshot);
}

impl<F> SnapshotObserver for F
where
    F: FnMut(&BoardSnapshot),
{
    fn on_snapshot(&mut self, snapshot: &BoardSnapshot) {
        self(snapshot)
    }
}

/// Forwards snapshots into a channel the UI polls.
#[derive(Debug)]
pub struct ChannelObserver(Sender<BoardSnapshot>);

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: &BoardSnapshot) {
        if self.0.send(snapshot.clone()).is_err() {
            debug!("snapshot receiver dropped");
        }
    }
}

pub struct CommandDispatcher {
    engine: Box<dyn Engine>,
    session: GameSession,
    projector: BoardStateProjector,
    records: RecordManager,
    snapshot: Option<BoardSnapshot>,
    observers: Vec<Box<dyn SnapshotObserver>>,
    closed: bool,
}

impl CommandDispatcher {
    pub fn new(config: GameConfig, engine: Box<dyn Engine>) -> Self {
        let session = GameSession::new(config);
        let records = RecordManager::new(session.header());
        Self {
            engine,
            session,
            projector: BoardStateProjector::new(),
            records,
            snapshot: None,
            observers: Vec::new(),
            closed: false,
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    /// Registers a channel observer and returns its receiving end.
    pub fn subscribe_channel(&mut self) -> Receiver<BoardSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(Box::new(ChannelObserver(tx)));
        rx
    }

    /// Starts the session, resuming from the configured `infile` when it
    /// holds a usable record.
    pub fn start(&mut self) -> Result<SessionState> {
        let resume = self
            .session
            .config()
            .infile
            .as_deref()
            .and_then(RecordManager::resume);
        self.start_from(resume)
    }

    /// Starts the session from an explicit prior record.
    pub fn start_from(&mut self, resume: Option<MoveRecord>) -> Result<SessionState> {
        self.ensure_open()?;
        let record = self.session.start(self.engine.as_mut(), resume)?;
        self.install(record);
        Ok(self.session.state())
    }

    pub fn dispatch(&mut self, command: Command) -> Result<DispatchOutcome> {
        self.ensure_open()?;
        debug!(?command, state = ?self.session.state(), "dispatching command");

        match command {
            Command::Restart {
                level,
                player_is_white,
            } => self.restart(level, player_is_white),
            Command::Save => self.save(),
            Command::ForceQuit => Ok(self.force_quit()),
            _ if !self.session.is_started() => Err(Error::NotStarted),
            _ if self.session.is_game_over() => Ok(DispatchOutcome::Unchanged),
            Command::Play(point) => {
                if !self.engine.is_legal(point, self.session.to_move()) {
                    debug!(%point, "illegal move rejected");
                    return Ok(DispatchOutcome::Rejected(Rejection::IllegalMove));
                }
                self.apply(Move::Play(point))
            }
            Command::Pass => self.apply(Move::Pass),
            Command::Resign => self.apply(Move::Resign),
            Command::GenMove => {
                if self.session.state() != SessionState::WaitingForEngine {
                    return Ok(DispatchOutcome::Rejected(Rejection::NotEngineTurn));
                }
                let mv = self.engine_move();
                self.apply(mv)
            }
        }
    }

    /// Changes the engine strength for the rest of the game.
    pub fn set_level(&mut self, level: u8) -> Result<()> {
        self.ensure_open()?;
        self.session.set_level(level);
        if self.session.is_started() {
            let previous = self.snapshot.as_ref();
            let mut snapshot = self.projector.project(
                self.engine.as_ref(),
                &self.session,
                &self.records.record().plies,
                previous,
            );
            // Same position; keep the cells and event of the last frame.
            if let Some(previous) = previous {
                snapshot.cells = previous.cells;
                snapshot.last_event = previous.last_event;
            }
            self.publish(snapshot);
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn snapshot(&self) -> Option<&BoardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn record(&self) -> &MoveRecord {
        self.records.record()
    }

    /// Last fully regenerated record buffer.
    pub fn record_buffer(&self) -> Arc<[u8]> {
        self.records.buffer()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn apply(&mut self, mv: Move) -> Result<DispatchOutcome> {
        let color = self.session.to_move();
        let state = match self.session.apply_move(self.engine.as_mut(), mv) {
            Ok(state) => state,
            Err(Error::Engine(EngineError::IllegalMove { .. })) => {
                return Ok(DispatchOutcome::Rejected(Rejection::IllegalMove));
            }
            Err(err) => return Err(err),
        };

        self.records.append(Ply { color, mv });
        let snapshot = self.projector.project(
            self.engine.as_ref(),
            &self.session,
            &self.records.record().plies,
            self.snapshot.as_ref(),
        );
        self.records.regenerate();
        self.publish(snapshot);

        Ok(DispatchOutcome::Applied(state))
    }

    fn engine_move(&mut self) -> Move {
        let color = self.session.to_move();
        let generated = self.engine.generate_move(color, self.session.level());
        if generated.resign {
            info!(%color, value = generated.value, "engine resigns");
            Move::Resign
        } else {
            generated.mv
        }
    }

    fn restart(
        &mut self,
        level: Option<u8>,
        player_is_white: Option<bool>,
    ) -> Result<DispatchOutcome> {
        let record = self
            .session
            .restart(self.engine.as_mut(), level, player_is_white)?;
        self.snapshot = None;
        self.install(record);
        info!(level = self.session.level(), "session restarted");
        Ok(DispatchOutcome::Applied(self.session.state()))
    }

    fn save(&mut self) -> Result<DispatchOutcome> {
        let path = self
            .session
            .config()
            .outfile
            .clone()
            .ok_or_else(|| Error::Config("no save path configured".to_string()))?;
        self.records.persist(&path)?;
        Ok(DispatchOutcome::Saved(path))
    }

    fn force_quit(&mut self) -> DispatchOutcome {
        if let Some(path) = self.session.config().outfile.as_deref()
            && self.session.is_started()
            && let Err(err) = self.records.persist(path)
        {
            warn!(path = %path.display(), error = %err, "record not saved on quit");
        }
        self.closed = true;
        self.observers.clear();
        info!("dispatcher shut down");
        DispatchOutcome::Quit
    }

    /// Adopts `record` as the session's record and publishes a snapshot
    /// derived from scratch.
    fn install(&mut self, record: MoveRecord) {
        self.records = RecordManager::from_record(record);
        let snapshot = self.projector.project(
            self.engine.as_ref(),
            &self.session,
            &self.records.record().plies,
            None,
        );
        self.publish(snapshot);
    }

    fn publish(&mut self, snapshot: BoardSnapshot) {
        let snapshot = self.snapshot.insert(snapshot);
        for observer in &mut self.observers {
            observer.on_snapshot(snapshot);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

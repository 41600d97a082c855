use tracing::{debug, info, warn};

use crate::config::{GameConfig, MAX_LEVEL};
use crate::engine::Engine;
use crate::error::{EngineError, Error, Result};
use crate::record::{MoveRecord, RecordHeader, Ruleset};
use crate::types::{BOARD_SIZE, Color, GameEnd, Move, Ply, SessionState};

/// Turn ownership and game status for one game.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    started: bool,
    to_move: Color,
    computer_player: Color,
    handicap: u8,
    komi: f32,
    level: u8,
    pass_count: u8,
    game_over: bool,
    end: Option<GameEnd>,
    move_number: u32,
    last_ply: Option<Ply>,
    score: Option<f32>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let level = config.start_level.min(MAX_LEVEL);
        Self {
            computer_player: computer_for(&config),
            komi: config.komi,
            config,
            started: false,
            to_move: Color::Black,
            handicap: 0,
            level,
            pass_count: 0,
            game_over: false,
            end: None,
            move_number: 0,
            last_ply: None,
            score: None,
        }
    }

    /// Sets up the board and returns the record this session continues:
    /// `resume` when it replays cleanly, otherwise an empty record.
    pub fn start(
        &mut self,
        engine: &mut dyn Engine,
        resume: Option<MoveRecord>,
    ) -> Result<MoveRecord> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }

        if let Some(record) = resume {
            match engine.replay(&record) {
                Ok(to_move) => {
                    self.adopt(engine, &record, to_move);
                    return Ok(record);
                }
                Err(err) => {
                    warn!(error = %err, "prior record cannot be replayed, starting fresh");
                }
            }
        }

        self.reset_fields();
        engine.clear(self.komi);
        self.handicap = engine.place_handicap(self.config.requested_handicap);
        if self.handicap > 0 {
            self.to_move = Color::White;
        }
        self.started = true;
        info!(
            handicap = self.handicap,
            komi = self.komi,
            level = self.level,
            computer = %self.computer_player,
            "session started"
        );

        Ok(MoveRecord::new(self.header()))
    }

    /// Applies one ply for the color to move.
    pub fn apply_move(&mut self, engine: &mut dyn Engine, mv: Move) -> Result<SessionState> {
        if !self.started {
            return Err(Error::NotStarted);
        }
        if self.game_over {
            return Err(Error::GameOver);
        }

        let color = self.to_move;
        if let Move::Play(point) = mv
            && !engine.is_legal(point, color)
        {
            return Err(EngineError::IllegalMove { point, color }.into());
        }
        engine.play(mv, color)?;

        match mv {
            Move::Play(_) => self.pass_count = 0,
            Move::Pass => self.pass_count += 1,
            Move::Resign => {}
        }
        self.to_move = color.opponent();
        self.move_number += 1;
        self.last_ply = Some(Ply { color, mv });
        debug!(%color, %mv, move_number = self.move_number, "ply applied");

        if mv == Move::Resign {
            self.finish(GameEnd::Resignation { by: color });
        } else if self.pass_count >= 2 {
            engine.finalize();
            self.score = Some((engine.score(Color::White) + engine.score(Color::Black)) / 2.0);
            self.finish(GameEnd::DoublePass);
        }

        Ok(self.state())
    }

    /// Starts a new game from the original configuration. `new_level`
    /// overrides autolevel; `player_is_white` swaps the human's color.
    pub fn restart(
        &mut self,
        engine: &mut dyn Engine,
        new_level: Option<u8>,
        player_is_white: Option<bool>,
    ) -> Result<MoveRecord> {
        let level = match new_level {
            Some(level) => level.min(MAX_LEVEL),
            None if self.config.autolevel => self.autolevel(),
            None => self.level,
        };
        if let Some(player_is_white) = player_is_white {
            self.config.player_is_white = player_is_white;
        }
        self.level = level;
        self.komi = self.config.komi;
        self.computer_player = computer_for(&self.config);
        self.started = false;

        self.start(engine, None)
    }

    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(MAX_LEVEL);
    }

    pub fn state(&self) -> SessionState {
        if !self.started {
            SessionState::NotStarted
        } else if self.game_over {
            SessionState::GameOver
        } else if self.to_move == self.computer_player {
            SessionState::WaitingForEngine
        } else {
            SessionState::WaitingForPlayer
        }
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            board_size: BOARD_SIZE as u8,
            komi: self.komi,
            handicap: self.handicap,
            ruleset: Ruleset::Chinese,
            level: self.level,
            random_seed: self.config.random_seed,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn computer_player(&self) -> Color {
        self.computer_player
    }

    pub fn handicap(&self) -> u8 {
        self.handicap
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn pass_count(&self) -> u8 {
        self.pass_count
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn end(&self) -> Option<GameEnd> {
        self.end
    }

    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    pub fn last_ply(&self) -> Option<Ply> {
        self.last_ply
    }

    /// Final white-minus-black margin, once a double pass has been scored.
    pub fn score(&self) -> Option<f32> {
        self.score
    }

    /// Winner of a finished game; `None` for a drawn count.
    pub fn winner(&self) -> Option<Color> {
        match self.end? {
            GameEnd::Resignation { by } => Some(by.opponent()),
            GameEnd::DoublePass => match self.score? {
                score if score > 0.0 => Some(Color::White),
                score if score < 0.0 => Some(Color::Black),
                _ => None,
            },
        }
    }

    fn adopt(&mut self, engine: &mut dyn Engine, record: &MoveRecord, to_move: Color) {
        self.reset_fields();
        self.started = true;
        self.to_move = to_move;
        self.handicap = record.header.handicap;
        self.komi = record.header.komi;
        self.level = record.header.level.min(MAX_LEVEL);
        self.move_number = record.len() as u32;
        self.last_ply = record.plies.last().copied();
        self.pass_count = record
            .plies
            .iter()
            .rev()
            .take_while(|ply| ply.mv.is_pass())
            .count()
            .min(2) as u8;

        match self.last_ply {
            Some(Ply {
                color,
                mv: Move::Resign,
            }) => self.finish(GameEnd::Resignation { by: color }),
            _ if self.pass_count >= 2 => {
                engine.finalize();
                self.score =
                    Some((engine.score(Color::White) + engine.score(Color::Black)) / 2.0);
                self.finish(GameEnd::DoublePass);
            }
            _ => {}
        }

        info!(
            plies = self.move_number,
            handicap = self.handicap,
            to_move = %self.to_move,
            game_over = self.game_over,
            "session resumed from record"
        );
    }

    fn finish(&mut self, end: GameEnd) {
        self.game_over = true;
        self.end = Some(end);
        info!(?end, score = ?self.score, "game over");
    }

    fn autolevel(&self) -> u8 {
        match self.winner() {
            Some(winner) if winner == self.computer_player => self.level.saturating_sub(1),
            Some(_) => (self.level + 1).min(MAX_LEVEL),
            None => self.level,
        }
    }

    fn reset_fields(&mut self) {
        self.to_move = Color::Black;
        self.handicap = 0;
        self.pass_count = 0;
        self.game_over = false;
        self.end = None;
        self.move_number = 0;
        self.last_ply = None;
        self.score = None;
    }
}

fn computer_for(config: &GameConfig) -> Color {
    if config.player_is_white {
        Color::Black
    } else {
        Color::White
    }
}

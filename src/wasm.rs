//! JavaScript bindings around [`CommandDispatcher`].

use wasm_bindgen::prelude::*;

use crate::config::GameConfig;
use crate::dispatcher::{Command, CommandDispatcher, DispatchOutcome};
use crate::engine::BoardEngine;
use crate::error::Error;
use crate::record::RecordManager;
use crate::types::Point;

impl From<Error> for JsValue {
    fn from(err: Error) -> Self {
        JsError::new(&err.to_string()).into()
    }
}

/// Game session handle exported to the browser UI.
#[wasm_bindgen]
pub struct GoSession {
    dispatcher: CommandDispatcher,
}

#[wasm_bindgen]
impl GoSession {
    /// Creates and starts a session. `config_json` may be empty for
    /// defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<GoSession, JsValue> {
        let config = if config_json.trim().is_empty() {
            GameConfig::default()
        } else {
            GameConfig::from_json(config_json)?
        };
        let engine = BoardEngine::from_config(&config);
        let mut dispatcher = CommandDispatcher::new(config, Box::new(engine));
        dispatcher.start()?;
        Ok(GoSession { dispatcher })
    }

    /// Starts from a saved record. Empty or unusable bytes start a fresh
    /// board.
    pub fn resume_from_bytes(config_json: &str, bytes: &[u8]) -> Result<GoSession, JsValue> {
        let config = if config_json.trim().is_empty() {
            GameConfig::default()
        } else {
            GameConfig::from_json(config_json)?
        };
        let record = RecordManager::resume_bytes(bytes);
        let engine = BoardEngine::from_config(&config);
        let mut dispatcher = CommandDispatcher::new(config, Box::new(engine));
        dispatcher.start_from(record)?;
        Ok(GoSession { dispatcher })
    }

    /// Returns the outcome name: "applied", "rejected" or "unchanged".
    pub fn play(&mut self, x: i32, y: i32) -> Result<String, JsValue> {
        let point = Point::from_xy(x, y)?;
        self.run(Command::Play(point))
    }

    /// Plays a vertex such as "D4".
    pub fn play_vertex(&mut self, vertex: &str) -> Result<String, JsValue> {
        let point: Point = vertex.parse()?;
        self.run(Command::Play(point))
    }

    pub fn pass(&mut self) -> Result<String, JsValue> {
        self.run(Command::Pass)
    }

    pub fn resign(&mut self) -> Result<String, JsValue> {
        self.run(Command::Resign)
    }

    pub fn gen_move(&mut self) -> Result<String, JsValue> {
        self.run(Command::GenMove)
    }

    /// `level` above the maximum is clamped; negative keeps the current
    /// level (or applies autolevel).
    pub fn restart(&mut self, level: i32, player_is_white: Option<bool>) -> Result<String, JsValue> {
        let level = u8::try_from(level).ok();
        self.run(Command::Restart {
            level,
            player_is_white,
        })
    }

    pub fn set_level(&mut self, level: u8) -> Result<(), JsValue> {
        Ok(self.dispatcher.set_level(level)?)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.dispatcher.snapshot())?)
    }

    pub fn state(&self) -> String {
        format!("{:?}", self.dispatcher.state())
    }

    pub fn record_bytes(&self) -> Vec<u8> {
        self.dispatcher.record_buffer().to_vec()
    }

    pub fn record_sgf(&self) -> String {
        self.dispatcher.record().to_sgf()
    }

    fn run(&mut self, command: Command) -> Result<String, JsValue> {
        let outcome = self.dispatcher.dispatch(command)?;
        Ok(outcome_name(&outcome).to_string())
    }
}

fn outcome_name(outcome: &DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Applied(_) => "applied",
        DispatchOutcome::Rejected(_) => "rejected",
        DispatchOutcome::Unchanged => "unchanged",
        DispatchOutcome::Saved(_) => "saved",
        DispatchOutcome::Quit => "quit",
    }
}

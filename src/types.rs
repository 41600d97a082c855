use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;

/// Side length of the board. The controller runs a fixed 9x9 goban.
pub const BOARD_SIZE: usize = 9;
/// Number of intersections on the board.
pub const BOARD_POINTS: usize = BOARD_SIZE * BOARD_SIZE;

const COLUMN_LETTERS: &[u8; BOARD_SIZE] = b"ABCDEFGHJ";

/// Stone color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => f.write_str("black"),
            Self::White => f.write_str("white"),
        }
    }
}

/// A board intersection. Row 0 is the top edge, column 0 the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub row: u8,
    pub col: u8,
}

impl Point {
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Builds a point from UI grid coordinates (`x` is the column).
    pub fn from_xy(x: i32, y: i32) -> Result<Self, Error> {
        let row = u8::try_from(y).ok();
        let col = u8::try_from(x).ok();
        row.zip(col)
            .and_then(|(row, col)| Self::new(row, col))
            .ok_or_else(|| Error::InvalidVertex(format!("({x}, {y})")))
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_POINTS {
            Some(Self {
                row: (index / BOARD_SIZE) as u8,
                col: (index % BOARD_SIZE) as u8,
            })
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }
}

/// Go vertex notation: `A9` is the top-left corner, `J1` the bottom-right.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = COLUMN_LETTERS[self.col as usize] as char;
        write!(f, "{letter}{}", BOARD_SIZE - self.row as usize)
    }
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVertex(s.to_string());
        let text = s.trim().to_ascii_uppercase();
        let mut chars = text.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let col = COLUMN_LETTERS
            .iter()
            .position(|&c| c as char == letter)
            .ok_or_else(invalid)?;
        let number: usize = chars.as_str().parse().map_err(|_| invalid())?;
        if !(1..=BOARD_SIZE).contains(&number) {
            return Err(invalid());
        }
        Ok(Self {
            row: (BOARD_SIZE - number) as u8,
            col: col as u8,
        })
    }
}

/// One ply's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Play(Point),
    Pass,
    Resign,
}

impl Move {
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play(point) => fmt::Display::fmt(point, f),
            Self::Pass => f.write_str("PASS"),
            Self::Resign => f.write_str("resign"),
        }
    }
}

impl FromStr for Move {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("pass") {
            Ok(Self::Pass)
        } else if text.eq_ignore_ascii_case("resign") {
            Ok(Self::Resign)
        } else {
            text.parse().map(Self::Play)
        }
    }
}

/// A move together with the color that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ply {
    pub color: Color,
    pub mv: Move,
}

/// UI-facing state of one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Empty,
    Black,
    White,
    /// Stone removed by the last move; shown for exactly one snapshot.
    CapturedBlack,
    CapturedWhite,
    /// Stone judged dead when the game ended on two passes.
    DeadBlack,
    DeadWhite,
    /// Empty star point.
    StarPoint,
}

impl CellState {
    pub fn stone(color: Color) -> Self {
        match color {
            Color::Black => Self::Black,
            Color::White => Self::White,
        }
    }

    pub fn captured(color: Color) -> Self {
        match color {
            Color::Black => Self::CapturedBlack,
            Color::White => Self::CapturedWhite,
        }
    }

    pub fn dead(color: Color) -> Self {
        match color {
            Color::Black => Self::DeadBlack,
            Color::White => Self::DeadWhite,
        }
    }

    /// Color of a live stone on this cell, if any.
    pub fn stone_color(self) -> Option<Color> {
        match self {
            Self::Black => Some(Color::Black),
            Self::White => Some(Color::White),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    WaitingForPlayer,
    WaitingForEngine,
    GameOver,
}

/// Semantic tag for the last transition, consumed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    #[default]
    None,
    Play,
    Pass,
    Capture,
    Win,
    Resign,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEnd {
    DoublePass,
    Resignation { by: Color },
}

/// Stones of each color removed from the board so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Captures {
    pub black: u32,
    pub white: u32,
}

impl Captures {
    pub fn add(&mut self, color: Color, stones: u32) {
        match color {
            Color::Black => self.black += stones,
            Color::White => self.white += stones,
        }
    }
}

/// Public board state pushed to the UI after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub cells: [[CellState; BOARD_SIZE]; BOARD_SIZE],
    pub black_last_move: String,
    pub white_last_move: String,
    pub captured: Captures,
    /// White-minus-black margin, komi included. Only set once the engine
    /// has scored the final position.
    pub score: Option<f32>,
    pub move_number: u32,
    pub to_move: Color,
    pub level: u8,
    pub pass_count: u8,
    pub state: SessionState,
    pub last_event: GameEvent,
}

impl BoardSnapshot {
    pub fn cell(&self, point: Point) -> CellState {
        self.cells[point.row as usize][point.col as usize]
    }

    pub fn is_game_over(&self) -> bool {
        self.state == SessionState::GameOver
    }
}

use crate::board::{bit, star_points};
use crate::classifier::classify;
use crate::engine::{Engine, GroupStatus};
use crate::session::GameSession;
use crate::types::{
    BOARD_POINTS, BOARD_SIZE, BoardSnapshot, CellState, Color, GameEnd, Move, Ply, Point,
};

/// Builds UI snapshots from engine and session state.
#[derive(Debug, Clone, Copy)]
pub struct BoardStateProjector {
    star_points: u128,
}

impl BoardStateProjector {
    pub fn new() -> Self {
        Self {
            star_points: star_points(),
        }
    }

    /// Derives a complete snapshot. `history` is every ply of the game so
    /// far; `previous` is the last published snapshot, if any.
    pub fn project(
        &self,
        engine: &dyn Engine,
        session: &GameSession,
        history: &[Ply],
        previous: Option<&BoardSnapshot>,
    ) -> BoardSnapshot {
        let captured = engine.captures();
        let (black_last_move, white_last_move) = last_moves(history);

        BoardSnapshot {
            cells: self.cells(engine, previous, session.end()),
            black_last_move,
            white_last_move,
            captured,
            score: session.score(),
            move_number: session.move_number(),
            to_move: session.to_move(),
            level: session.level(),
            pass_count: session.pass_count(),
            state: session.state(),
            last_event: classify(previous, session, captured),
        }
    }

    /// Recomputes every cell from the engine board.
    ///
    /// A cell that held a stone in `previous` and is empty now is shown as
    /// just captured; the next projection turns it back to empty. After a
    /// double pass, stones in dead groups get the dead marker. A resignation
    /// never reveals dead stones.
    pub fn cells(
        &self,
        engine: &dyn Engine,
        previous: Option<&BoardSnapshot>,
        end: Option<GameEnd>,
    ) -> [[CellState; BOARD_SIZE]; BOARD_SIZE] {
        let reveal_dead = end == Some(GameEnd::DoublePass);
        let mut cells = [[CellState::Empty; BOARD_SIZE]; BOARD_SIZE];

        for point in (0..BOARD_POINTS).filter_map(Point::from_index) {
            let cell = match engine.stone_at(point) {
                Some(color) if reveal_dead && engine.group_status(point) == GroupStatus::Dead => {
                    CellState::dead(color)
                }
                Some(color) => CellState::stone(color),
                None => match previous.and_then(|previous| previous.cell(point).stone_color()) {
                    Some(color) => CellState::captured(color),
                    None if self.star_points & bit(point.index()) != 0 => CellState::StarPoint,
                    None => CellState::Empty,
                },
            };
            cells[point.row as usize][point.col as usize] = cell;
        }

        cells
    }
}

impl Default for BoardStateProjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Most recent move text per color, from at most the two latest plies
/// that touched the board. A resignation leaves both texts as they were.
fn last_moves(history: &[Ply]) -> (String, String) {
    let mut black = String::new();
    let mut white = String::new();

    let plies = history.iter().rev().filter(|ply| ply.mv != Move::Resign);
    for ply in plies.take(2) {
        let slot = match ply.color {
            Color::Black => &mut black,
            Color::White => &mut white,
        };
        if slot.is_empty() {
            *slot = ply.mv.to_string();
        }
    }

    (black, white)
}

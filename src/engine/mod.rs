//! Boundary to the move-generation / board-analysis engine, plus a
//! bitboard engine that implements it.

pub mod search;

use tracing::debug;
use web_time::Instant;

use crate::board::{Board, bit, bits};
use crate::config::GameConfig;
use crate::error::EngineError;
use crate::record::MoveRecord;
use crate::types::{BOARD_SIZE, Captures, Color, Move, Point};

pub use search::SearchSelector;

/// Positional margin (own minus opponent, komi included) below which the
/// engine gives up.
const RESIGN_MARGIN: f32 = 40.0;
/// The engine never resigns before this many stones are on the board.
const RESIGN_MIN_STONES: u32 = 20;

/// Life-and-death verdict for the group containing a stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Alive,
    Dead,
}

/// Result of asking the engine for its move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedMove {
    /// Stone placement or pass. Never [`Move::Resign`]; see `resign`.
    pub mv: Move,
    /// Engine's confidence, as a margin from the mover's point of view.
    pub value: f32,
    pub resign: bool,
}

/// Everything the session controller needs from a Go engine.
pub trait Engine {
    /// Empties the board and resets prisoner counts.
    fn clear(&mut self, komi: f32);

    /// Puts down fixed handicap stones for black and returns how many were
    /// actually placed.
    fn place_handicap(&mut self, requested: u8) -> u8;

    fn is_legal(&self, point: Point, color: Color) -> bool;

    /// Applies a placement or pass. A resignation does not touch the board.
    fn play(&mut self, mv: Move, color: Color) -> Result<(), EngineError>;

    /// Searches a move for `color`. Does not apply it.
    fn generate_move(&mut self, color: Color, level: u8) -> GeneratedMove;

    /// Evaluates the final position: settles group status and scores.
    fn finalize(&mut self);

    /// White-minus-black margin (komi included) with the neutral points
    /// credited to `color`. Meaningful after [`Engine::finalize`].
    fn score(&self, color: Color) -> f32;

    /// Meaningful after [`Engine::finalize`].
    fn group_status(&self, point: Point) -> GroupStatus;

    fn stone_at(&self, point: Point) -> Option<Color>;

    fn captures(&self) -> Captures;

    /// Rebuilds the position described by `record` and returns the color
    /// to move next.
    fn replay(&mut self, record: &MoveRecord) -> Result<Color, EngineError> {
        if record.header.board_size as usize != BOARD_SIZE {
            return Err(EngineError::BoardSize(record.header.board_size));
        }

        self.clear(record.header.komi);
        let placed = self.place_handicap(record.header.handicap);
        let mut to_move = if placed > 0 { Color::White } else { Color::Black };

        let last = record.plies.len().saturating_sub(1);
        let mut passes = 0;
        for (index, ply) in record.plies.iter().enumerate() {
            if passes >= 2 {
                return Err(EngineError::PlyAfterGameEnd(index));
            }
            if ply.color != to_move {
                return Err(EngineError::OutOfTurn {
                    index,
                    expected: to_move,
                    found: ply.color,
                });
            }
            match ply.mv {
                Move::Resign if index != last => return Err(EngineError::ResignNotLast(index)),
                Move::Play(point) if !self.is_legal(point, ply.color) => {
                    return Err(EngineError::IllegalMove {
                        point,
                        color: ply.color,
                    });
                }
                mv => self.play(mv, ply.color)?,
            }
            passes = if ply.mv.is_pass() { passes + 1 } else { 0 };
            to_move = to_move.opponent();
        }

        Ok(to_move)
    }
}

pub trait MoveSelector: Send + Sync {
    /// Picks a point for `color`, or `None` to pass.
    fn select_move(&self, board: &Board, color: Color, level: u8) -> Option<usize>;
}

/// Plays the first legal point that does not fill one of its own eyes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstLegalMoveSelector;

impl MoveSelector for FirstLegalMoveSelector {
    fn select_move(&self, board: &Board, color: Color, _level: u8) -> Option<usize> {
        bits(board.empty()).find(|&pos| board.is_legal(pos, color) && !board.is_eye(pos, color))
    }
}

/// Engine backed by the crate's own [`Board`].
pub struct BoardEngine {
    board: Board,
    komi: f32,
    captures: Captures,
    dead: u128,
    area: (u32, u32),
    selector: Box<dyn MoveSelector>,
}

impl BoardEngine {
    pub fn new(selector: Box<dyn MoveSelector>) -> Self {
        Self {
            board: Board::new(),
            komi: 0.0,
            captures: Captures::default(),
            dead: 0,
            area: (0, 0),
            selector,
        }
    }

    pub fn new_with_default_selector() -> Self {
        Self::new(Box::new(FirstLegalMoveSelector))
    }

    /// Engine with a searching selector tuned by the seed and memory budget.
    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(Box::new(SearchSelector::new(
            config.random_seed,
            config.memory_mb,
        )))
    }

    /// Groups that cannot survive: at most one liberty left.
    fn dead_stones(&self) -> u128 {
        let mut dead = 0u128;
        let mut seen = 0u128;
        let stones = self.board.stones(Color::Black) | self.board.stones(Color::White);
        for pos in bits(stones) {
            if seen & bit(pos) != 0 {
                continue;
            }
            let group = self.board.group(pos);
            seen |= group;
            if self.board.liberties(group).count_ones() <= 1 {
                dead |= group;
            }
        }
        dead
    }

    /// Margin from `color`'s point of view, komi included.
    fn margin_for(&self, board: &Board, color: Color) -> f32 {
        let (black, white) = board.area(0);
        let white_margin = white as f32 + self.komi - black as f32;
        match color {
            Color::White => white_margin,
            Color::Black => -white_margin,
        }
    }
}

impl Default for BoardEngine {
    fn default() -> Self {
        Self::new_with_default_selector()
    }
}

impl Engine for BoardEngine {
    fn clear(&mut self, komi: f32) {
        self.board = Board::new();
        self.komi = komi;
        self.captures = Captures::default();
        self.dead = 0;
        self.area = (0, 0);
    }

    fn place_handicap(&mut self, requested: u8) -> u8 {
        let points = handicap_points(requested);
        for point in &points {
            self.board.set_stone(point.index(), Color::Black);
        }
        points.len() as u8
    }

    fn is_legal(&self, point: Point, color: Color) -> bool {
        self.board.is_legal(point.index(), color)
    }

    fn play(&mut self, mv: Move, color: Color) -> Result<(), EngineError> {
        match mv {
            Move::Play(point) => {
                let captured = self
                    .board
                    .place(point.index(), color)
                    .ok_or(EngineError::IllegalMove { point, color })?;
                self.captures
                    .add(color.opponent(), captured.count_ones());
            }
            Move::Pass => self.board.pass(),
            Move::Resign => {}
        }
        Ok(())
    }

    fn generate_move(&mut self, color: Color, level: u8) -> GeneratedMove {
        let started = Instant::now();
        let choice = self
            .selector
            .select_move(&self.board, color, level)
            .filter(|&pos| self.board.is_legal(pos, color))
            .and_then(Point::from_index);

        let mut after = self.board;
        if let Some(point) = choice {
            let _ = after.place(point.index(), color);
        }
        let value = self.margin_for(&after, color);
        let (black, white) = after.count();
        let resign = value < -RESIGN_MARGIN && black + white >= RESIGN_MIN_STONES;

        let mv = choice.map_or(Move::Pass, Move::Play);
        debug!(
            %color,
            %mv,
            value,
            resign,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine move generated"
        );

        GeneratedMove { mv, value, resign }
    }

    fn finalize(&mut self) {
        self.dead = self.dead_stones();
        self.area = self.board.area(self.dead);
    }

    fn score(&self, color: Color) -> f32 {
        let (black, white) = self.area;
        let neutral = (BOARD_SIZE * BOARD_SIZE) as u32 - black - white;
        let (black, white) = match color {
            Color::Black => (black + neutral, white),
            Color::White => (black, white + neutral),
        };
        white as f32 + self.komi - black as f32
    }

    fn group_status(&self, point: Point) -> GroupStatus {
        if self.dead & bit(point.index()) != 0 {
            GroupStatus::Dead
        } else {
            GroupStatus::Alive
        }
    }

    fn stone_at(&self, point: Point) -> Option<Color> {
        self.board.stone_at(point.index())
    }

    fn captures(&self) -> Captures {
        self.captures
    }
}

/// Fixed handicap placement on the 9x9 board. Fewer than two stones means
/// no handicap; more than nine is clamped.
pub fn handicap_points(requested: u8) -> Vec<Point> {
    const NEAR: u8 = 2;
    const MID: u8 = 4;
    const FAR: u8 = 6;
    let corners = [(NEAR, FAR), (FAR, NEAR), (FAR, FAR), (NEAR, NEAR)];
    let sides_horizontal = [(MID, NEAR), (MID, FAR)];
    let sides_vertical = [(NEAR, MID), (FAR, MID)];
    let center = (MID, MID);

    let stones = requested.min(9);
    let mut points: Vec<(u8, u8)> = match stones {
        0 | 1 => Vec::new(),
        2..=4 => corners[..stones as usize].to_vec(),
        5 => corners.to_vec(),
        6 | 7 => [&corners[..], &sides_horizontal[..]].concat(),
        _ => [&corners[..], &sides_horizontal[..], &sides_vertical[..]].concat(),
    };
    if stones >= 5 && stones % 2 == 1 {
        points.push(center);
    }

    points
        .into_iter()
        .filter_map(|(row, col)| Point::new(row, col))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordHeader;
    use crate::types::Ply;

    struct FixedMoveSelector {
        mv: Option<usize>,
    }

    impl MoveSelector for FixedMoveSelector {
        fn select_move(&self, _board: &Board, _color: Color, _level: u8) -> Option<usize> {
            self.mv
        }
    }

    fn point(vertex: &str) -> Point {
        vertex.parse().unwrap()
    }

    fn header(handicap: u8) -> RecordHeader {
        RecordHeader {
            handicap,
            ..RecordHeader::default()
        }
    }

    #[test]
    fn handicap_counts_match_request() {
        for requested in 0..=12u8 {
            let expected = match requested {
                0 | 1 => 0,
                n if n > 9 => 9,
                n => n as usize,
            };
            assert_eq!(handicap_points(requested).len(), expected, "{requested}");
        }
        assert!(handicap_points(5).contains(&point("E5")));
        assert!(!handicap_points(4).contains(&point("E5")));
    }

    #[test]
    fn play_counts_captured_stones_by_color() {
        let mut engine = BoardEngine::default();
        engine.clear(6.5);
        engine.play(Move::Play(point("A8")), Color::Black).unwrap();
        engine.play(Move::Play(point("A9")), Color::White).unwrap();
        engine.play(Move::Play(point("B9")), Color::Black).unwrap();

        assert_eq!(engine.stone_at(point("A9")), None);
        assert_eq!(engine.captures(), Captures { black: 0, white: 1 });
    }

    #[test]
    fn illegal_play_is_reported_and_board_untouched() {
        let mut engine = BoardEngine::default();
        engine.clear(0.0);
        engine.play(Move::Play(point("E5")), Color::Black).unwrap();

        let err = engine.play(Move::Play(point("E5")), Color::White).unwrap_err();

        assert_eq!(
            err,
            EngineError::IllegalMove {
                point: point("E5"),
                color: Color::White
            }
        );
        assert_eq!(engine.stone_at(point("E5")), Some(Color::Black));
    }

    #[test]
    fn generate_move_falls_back_to_pass_for_illegal_choice() {
        let mut engine = BoardEngine::new(Box::new(FixedMoveSelector { mv: Some(40) }));
        engine.clear(0.0);
        engine.play(Move::Play(point("E5")), Color::Black).unwrap();

        let generated = engine.generate_move(Color::White, 5);

        assert_eq!(generated.mv, Move::Pass);
        assert!(!generated.resign);
    }

    #[test]
    fn first_legal_selector_skips_own_eyes() {
        let mut board = Board::new();
        board.set_stone(point("B9").index(), Color::Black);
        board.set_stone(point("A8").index(), Color::Black);
        board.set_stone(point("B8").index(), Color::Black);

        let choice = FirstLegalMoveSelector.select_move(&board, Color::Black, 0);

        assert_eq!(choice, Some(point("C9").index()));
    }

    #[test]
    fn finalize_marks_groups_in_atari_dead_and_scores_area() {
        let mut engine = BoardEngine::default();
        engine.clear(0.5);
        for row in 1..=9 {
            engine
                .play(Move::Play(point(&format!("C{row}"))), Color::Black)
                .unwrap();
            engine
                .play(Move::Play(point(&format!("G{row}"))), Color::White)
                .unwrap();
        }
        engine.play(Move::Play(point("A9")), Color::White).unwrap();
        engine.play(Move::Play(point("B9")), Color::Black).unwrap();

        engine.finalize();

        assert_eq!(engine.group_status(point("A9")), GroupStatus::Dead);
        assert_eq!(engine.group_status(point("C5")), GroupStatus::Alive);
        assert_eq!(engine.group_status(point("G5")), GroupStatus::Alive);
        // Columns A..C are black, G..J white, D..F (27 points) neutral.
        assert_eq!(engine.score(Color::White), 27.0 + 27.0 + 0.5 - 27.0);
        assert_eq!(engine.score(Color::Black), 27.0 + 0.5 - 54.0);
    }

    #[test]
    fn replay_rebuilds_position_and_turn() {
        let mut engine = BoardEngine::default();
        let record = MoveRecord {
            header: header(2),
            plies: vec![
                Ply {
                    color: Color::White,
                    mv: Move::Play(point("E5")),
                },
                Ply {
                    color: Color::Black,
                    mv: Move::Pass,
                },
            ],
        };

        let to_move = engine.replay(&record).unwrap();

        assert_eq!(to_move, Color::White);
        assert_eq!(engine.stone_at(point("E5")), Some(Color::White));
        assert_eq!(engine.stone_at(point("G7")), Some(Color::Black));
    }

    #[test]
    fn replay_rejects_out_of_turn_and_early_resign() {
        let mut engine = BoardEngine::default();
        let out_of_turn = MoveRecord {
            header: header(0),
            plies: vec![Ply {
                color: Color::White,
                mv: Move::Pass,
            }],
        };
        assert!(matches!(
            engine.replay(&out_of_turn),
            Err(EngineError::OutOfTurn { index: 0, .. })
        ));

        let early_resign = MoveRecord {
            header: header(0),
            plies: vec![
                Ply {
                    color: Color::Black,
                    mv: Move::Resign,
                },
                Ply {
                    color: Color::White,
                    mv: Move::Pass,
                },
            ],
        };
        assert_eq!(
            engine.replay(&early_resign),
            Err(EngineError::ResignNotLast(0))
        );
    }

    #[test]
    fn replay_rejects_plies_after_double_pass() {
        let mut engine = BoardEngine::default();
        let ended = MoveRecord {
            header: header(0),
            plies: vec![
                Ply {
                    color: Color::Black,
                    mv: Move::Pass,
                },
                Ply {
                    color: Color::White,
                    mv: Move::Pass,
                },
                Ply {
                    color: Color::Black,
                    mv: Move::Play(point("E5")),
                },
            ],
        };
        assert_eq!(
            engine.replay(&ended),
            Err(EngineError::PlyAfterGameEnd(2))
        );

        let finished = MoveRecord {
            plies: ended.plies[..2].to_vec(),
            ..ended
        };
        assert_eq!(engine.replay(&finished), Ok(Color::Black));
    }
}

use std::time::Duration;

use web_time::Instant;

use crate::board::{Board, bits};
use crate::engine::MoveSelector;
use crate::types::Color;

const BASE_TIMEOUT_MS: u64 = 500;
const TIMEOUT_PER_LEVEL_MS: u64 = 250;
const NODES_PER_MB: u64 = 4096;
const MIN_SCORE: f32 = f32::NEG_INFINITY;
const MAX_SCORE: f32 = f32::INFINITY;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchResult {
    Complete(f32),
    TimedOut,
}

impl SearchResult {
    fn negate(self) -> Self {
        match self {
            Self::Complete(score) => Self::Complete(-score),
            Self::TimedOut => Self::TimedOut,
        }
    }
}

/// Selector running an iterative-deepening negamax over area counts.
#[derive(Debug, Clone, Copy)]
pub struct SearchSelector {
    seed: u64,
    max_nodes: u64,
}

impl SearchSelector {
    pub fn new(seed: u64, memory_mb: u32) -> Self {
        Self {
            seed,
            max_nodes: u64::from(memory_mb.max(1)) * NODES_PER_MB,
        }
    }
}

impl MoveSelector for SearchSelector {
    fn select_move(&self, board: &Board, color: Color, level: u8) -> Option<usize> {
        let timeout =
            Duration::from_millis(BASE_TIMEOUT_MS + TIMEOUT_PER_LEVEL_MS * u64::from(level));
        Searcher::new(depth_for_level(level), timeout, self.max_nodes, self.seed)
            .search(board, color)
    }
}

pub struct Searcher {
    start_time: Instant,
    timeout: Duration,
    max_depth: u8,
    max_nodes: u64,
    nodes: u64,
    seed: u64,
    timed_out: bool,
}

impl Searcher {
    pub fn new(max_depth: u8, timeout: Duration, max_nodes: u64, seed: u64) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            max_depth: max_depth.max(1),
            max_nodes,
            nodes: 0,
            seed,
            timed_out: false,
        }
    }

    /// Searches the best point for `color`; `None` means passing is at
    /// least as good as every placement.
    pub fn search(&mut self, board: &Board, color: Color) -> Option<usize> {
        self.start_time = Instant::now();
        self.timed_out = false;
        self.nodes = 0;

        let moves = sorted_moves(board, color);
        if moves.is_empty() {
            return None;
        }

        let mut best_move = None;
        for depth in 1..=self.max_depth {
            match self.search_root(board, color, &moves, depth) {
                Some(choice) => best_move = choice,
                None => break,
            }
        }

        best_move
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// One root iteration. Passing is tried first and only a strictly
    /// better placement replaces it. Returns `None` on timeout.
    fn search_root(
        &mut self,
        board: &Board,
        color: Color,
        moves: &[usize],
        depth: u8,
    ) -> Option<Option<usize>> {
        let mut passed = *board;
        passed.pass();
        let pass_result =
            self.negaalpha(&passed, color.opponent(), depth - 1, depth, MIN_SCORE, MAX_SCORE);
        let mut best_score = match pass_result {
            SearchResult::Complete(score) => -score,
            SearchResult::TimedOut => return None,
        };
        let mut best_move: Option<usize> = None;

        for &mv in moves {
            let mut next = *board;
            if next.place(mv, color).is_none() {
                continue;
            }
            let result =
                self.negaalpha(&next, color.opponent(), depth - 1, depth, MIN_SCORE, MAX_SCORE);
            let score = match result {
                SearchResult::Complete(score) => -score,
                SearchResult::TimedOut => return None,
            };
            if self.is_better_move(score, mv, best_score, best_move) {
                best_score = score;
                best_move = Some(mv);
            }
        }

        Some(best_move)
    }

    fn negaalpha(
        &mut self,
        board: &Board,
        color: Color,
        depth: u8,
        root_depth: u8,
        alpha: f32,
        beta: f32,
    ) -> SearchResult {
        self.nodes += 1;
        // Depth-1 search always completes so a move is available.
        if root_depth > 1
            && (self.nodes > self.max_nodes || self.start_time.elapsed() >= self.timeout)
        {
            self.timed_out = true;
            return SearchResult::TimedOut;
        }

        if depth == 0 {
            return SearchResult::Complete(evaluate(board, color));
        }

        let moves = sorted_moves(board, color);
        if moves.is_empty() {
            return SearchResult::Complete(evaluate(board, color));
        }

        let mut best_score = MIN_SCORE;
        let mut alpha = alpha;

        for mv in moves {
            let mut next = *board;
            if next.place(mv, color).is_none() {
                continue;
            }
            let result =
                self.negaalpha(&next, color.opponent(), depth - 1, root_depth, -beta, -alpha);
            match result.negate() {
                SearchResult::TimedOut => return SearchResult::TimedOut,
                SearchResult::Complete(score) => {
                    best_score = best_score.max(score);
                    if score > alpha {
                        alpha = score;
                    }
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        SearchResult::Complete(best_score)
    }

    /// Equal scores between placements go to the higher seeded jitter;
    /// a pass keeps ties.
    fn is_better_move(
        &self,
        score: f32,
        mv: usize,
        best_score: f32,
        best_move: Option<usize>,
    ) -> bool {
        if score > best_score {
            return true;
        }
        match best_move {
            Some(best) if score == best_score => jitter(self.seed, mv) > jitter(self.seed, best),
            _ => false,
        }
    }
}

fn depth_for_level(level: u8) -> u8 {
    match level {
        0..=2 => 1,
        3..=6 => 2,
        _ => 3,
    }
}

/// Area margin from `color`'s point of view.
fn evaluate(board: &Board, color: Color) -> f32 {
    let (black, white) = board.area(0);
    let margin = black as f32 - white as f32;
    match color {
        Color::Black => margin,
        Color::White => -margin,
    }
}

/// Legal points that do not fill an own eye, best static score first.
fn sorted_moves(board: &Board, color: Color) -> Vec<usize> {
    let mut scored_moves: Vec<(usize, f32)> = bits(board.empty())
        .filter(|&mv| !board.is_eye(mv, color))
        .filter_map(|mv| {
            let mut next = *board;
            next.place(mv, color)?;
            Some((mv, evaluate(&next, color)))
        })
        .collect();

    scored_moves.sort_by(|(left_mv, left_score), (right_mv, right_score)| {
        right_score
            .total_cmp(left_score)
            .then_with(|| left_mv.cmp(right_mv))
    });

    scored_moves.into_iter().map(|(mv, _)| mv).collect()
}

/// Deterministic per-point tie-break value derived from the seed.
fn jitter(seed: u64, mv: usize) -> u64 {
    let mut x = seed ^ (mv as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

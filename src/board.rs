use once_cell::sync::Lazy;

use crate::types::{BOARD_POINTS, BOARD_SIZE, Color};

const BOARD_MASK: u128 = (1u128 << BOARD_POINTS) - 1;
const STAR_POINTS: [(usize, usize); 5] = [(2, 2), (2, 6), (4, 4), (6, 2), (6, 6)];

static COLUMN_MASKS: Lazy<(u128, u128)> = Lazy::new(|| {
    let mut left = 0u128;
    let mut right = 0u128;
    for row in 0..BOARD_SIZE {
        left |= bit(row * BOARD_SIZE);
        right |= bit(row * BOARD_SIZE + BOARD_SIZE - 1);
    }
    (left, right)
});

static NEIGHBORS: Lazy<[u128; BOARD_POINTS]> = Lazy::new(|| {
    let mut table = [0u128; BOARD_POINTS];
    for (pos, mask) in table.iter_mut().enumerate() {
        *mask = dilate(bit(pos));
    }
    table
});

static DIAGONALS: Lazy<[u128; BOARD_POINTS]> = Lazy::new(|| {
    let mut table = [0u128; BOARD_POINTS];
    for (pos, mask) in table.iter_mut().enumerate() {
        let (row, col) = pos_to_row_col(pos);
        for (dr, dc) in [(-1, -1), (-1, 1), (1, -1), (1, 1)] {
            let (r, c) = (row + dr, col + dc);
            if in_bounds(r, c) {
                *mask |= bit(r as usize * BOARD_SIZE + c as usize);
            }
        }
    }
    table
});

/// Go position represented by two bitboards plus the simple-ko point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    black: u128,
    white: u128,
    ko: Option<usize>,
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stones(&self, color: Color) -> u128 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }

    pub fn empty(&self) -> u128 {
        BOARD_MASK & !(self.black | self.white)
    }

    pub fn stone_at(&self, pos: usize) -> Option<Color> {
        let square = bit(pos);
        if self.black & square != 0 {
            Some(Color::Black)
        } else if self.white & square != 0 {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Returns whether `color` may play at `pos`: the point is empty, is not
    /// the ko point, and the move is not suicide.
    pub fn is_legal(&self, pos: usize, color: Color) -> bool {
        self.try_place(pos, color).is_some()
    }

    /// Places one stone and removes captured opponent groups.
    /// Returns the captured bit mask, or `None` when the move is illegal
    /// (in which case the board is unchanged).
    pub fn place(&mut self, pos: usize, color: Color) -> Option<u128> {
        let (next, captured) = self.try_place(pos, color)?;
        *self = next;
        Some(captured)
    }

    /// A pass clears the ko restriction.
    pub fn pass(&mut self) {
        self.ko = None;
    }

    /// Puts a stone down without capture or ko processing. Used for
    /// handicap setup on an empty board.
    pub fn set_stone(&mut self, pos: usize, color: Color) {
        let square = bit(pos);
        match color {
            Color::Black => {
                self.black |= square;
                self.white &= !square;
            }
            Color::White => {
                self.white |= square;
                self.black &= !square;
            }
        }
    }

    /// All stones connected to `pos` (empty mask if `pos` is empty).
    pub fn group(&self, pos: usize) -> u128 {
        match self.stone_at(pos) {
            Some(color) => flood(self.stones(color), bit(pos)),
            None => 0,
        }
    }

    pub fn liberties(&self, group: u128) -> u128 {
        dilate(group) & self.empty()
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (u32, u32) {
        (self.black.count_ones(), self.white.count_ones())
    }

    /// True when `pos` is an empty point surrounded by `color` such that
    /// filling it would only harm `color`.
    pub fn is_eye(&self, pos: usize, color: Color) -> bool {
        if self.stone_at(pos).is_some() {
            return false;
        }
        let own = self.stones(color);
        if NEIGHBORS[pos] & !own != 0 {
            return false;
        }
        let diagonals = DIAGONALS[pos];
        let foreign = (diagonals & self.stones(color.opponent())).count_ones();
        let on_edge = diagonals.count_ones() < 4;
        if on_edge { foreign == 0 } else { foreign <= 1 }
    }

    /// Area score with the `dead` stones removed first:
    /// `(black_area, white_area)` counting stones plus empty regions that
    /// touch only one color.
    pub fn area(&self, dead: u128) -> (u32, u32) {
        let black = self.black & !dead;
        let white = self.white & !dead;
        let mut empty = BOARD_MASK & !(black | white);
        let mut black_area = black.count_ones();
        let mut white_area = white.count_ones();

        while empty != 0 {
            let seed = empty & empty.wrapping_neg();
            let region = flood(empty, seed);
            empty &= !region;
            let border = dilate(region) & !region;
            let touches_black = border & black != 0;
            let touches_white = border & white != 0;
            match (touches_black, touches_white) {
                (true, false) => black_area += region.count_ones(),
                (false, true) => white_area += region.count_ones(),
                _ => {}
            }
        }

        (black_area, white_area)
    }

    fn try_place(&self, pos: usize, color: Color) -> Option<(Board, u128)> {
        if pos >= BOARD_POINTS || self.stone_at(pos).is_some() || self.ko == Some(pos) {
            return None;
        }

        let mut next = *self;
        next.set_stone(pos, color);

        let opp = next.stones(color.opponent());
        let mut captured = 0u128;
        for neighbor in bits(NEIGHBORS[pos] & opp) {
            if captured & bit(neighbor) != 0 {
                continue;
            }
            let group = flood(opp, bit(neighbor));
            if next.liberties(group) == 0 {
                captured |= group;
            }
        }
        match color {
            Color::Black => next.white &= !captured,
            Color::White => next.black &= !captured,
        }

        let own_group = flood(next.stones(color), bit(pos));
        let own_liberties = next.liberties(own_group);
        if own_liberties == 0 {
            return None;
        }

        next.ko = if captured.count_ones() == 1
            && own_group.count_ones() == 1
            && own_liberties.count_ones() == 1
        {
            Some(captured.trailing_zeros() as usize)
        } else {
            None
        };

        Some((next, captured))
    }
}

/// Mask of the star points (hoshi).
pub fn star_points() -> u128 {
    STAR_POINTS
        .iter()
        .fold(0u128, |acc, &(row, col)| acc | bit(row * BOARD_SIZE + col))
}

pub fn bit(pos: usize) -> u128 {
    if pos < BOARD_POINTS { 1u128 << pos } else { 0 }
}

/// Iterates the set bit indices of `mask`, lowest first.
pub fn bits(mask: u128) -> impl Iterator<Item = usize> {
    let mut rest = mask;
    std::iter::from_fn(move || {
        if rest == 0 {
            None
        } else {
            let idx = rest.trailing_zeros() as usize;
            rest &= rest - 1;
            Some(idx)
        }
    })
}

fn dilate(mask: u128) -> u128 {
    let (left, right) = *COLUMN_MASKS;
    let east = (mask & !right) << 1;
    let west = (mask & !left) >> 1;
    let south = mask << BOARD_SIZE;
    let north = mask >> BOARD_SIZE;
    (east | west | south | north) & BOARD_MASK
}

fn flood(stones: u128, seed: u128) -> u128 {
    let mut group = seed & stones;
    loop {
        let next = (group | dilate(group)) & stones;
        if next == group {
            return group;
        }
        group = next;
    }
}

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    ((pos / BOARD_SIZE) as i32, (pos % BOARD_SIZE) as i32)
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}

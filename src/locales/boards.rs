//! Board geometry: the premium square layout per board type.
//!
//! Layouts are encoded as 15 strings of 15 cells:
//! `.` plain, `d` double letter, `t` triple letter,
//! `D` double word, `T` triple word.

/// Width and height of the board
pub const BOARD_SIZE: usize = 15;

/// Row identifiers used in move coordinates ("A15" horizontal,
/// "15A" vertical)
pub const ROW_IDS: &str = "ABCDEFGHIJKLMNO";

pub struct BoardGeometry {
    pub name: &'static str,
    rows: [&'static str; BOARD_SIZE],
}

impl BoardGeometry {
    /// Letter multiplier for the given square (1, 2 or 3)
    pub fn letter_multiplier(&self, row: usize, col: usize) -> i32 {
        match self.cell(row, col) {
            'd' => 2,
            't' => 3,
            _ => 1,
        }
    }

    /// Word multiplier for the given square (1, 2 or 3)
    pub fn word_multiplier(&self, row: usize, col: usize) -> i32 {
        match self.cell(row, col) {
            'D' => 2,
            'T' => 3,
            _ => 1,
        }
    }

    fn cell(&self, row: usize, col: usize) -> char {
        self.rows[row].as_bytes()[col] as char
    }

    /// Look up a board geometry by its type identifier, defaulting to
    /// the standard board
    pub fn for_type(board_type: &str) -> &'static BoardGeometry {
        match board_type {
            "explo" => &EXPLO_BOARD,
            _ => &STANDARD_BOARD,
        }
    }
}

/// The standard crossword board layout
pub static STANDARD_BOARD: BoardGeometry = BoardGeometry {
    name: "standard",
    rows: [
        "T..d...T...d..T",
        ".D...t...t...D.",
        "..D...d.d...D..",
        "d..D...d...D..d",
        "....D.....D....",
        ".t...t...t...t.",
        "..d...d.d...d..",
        "T..d...D...d..T",
        "..d...d.d...d..",
        ".t...t...t...t.",
        "....D.....D....",
        "d..D...d...D..d",
        "..D...d.d...D..",
        ".D...t...t...D.",
        "T..d...T...d..T",
    ],
};

/// The alternative board layout used by the mobile client, with premium
/// squares pushed away from the center opening
pub static EXPLO_BOARD: BoardGeometry = BoardGeometry {
    name: "explo",
    rows: [
        "t...T..d..T...t",
        ".D...d...d...D.",
        "..D...t.t...D..",
        "...T...d...T...",
        "T...D.....D...T",
        ".d...t...t...d.",
        "..t...d.d...t..",
        "d..d...D...d..d",
        "..t...d.d...t..",
        ".d...t...t...d.",
        "T...D.....D...T",
        "...T...d...T...",
        "..D...t.t...D..",
        ".D...d...d...D.",
        "t...T..d..T...t",
    ],
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layouts_are_square() {
        for board in [&STANDARD_BOARD, &EXPLO_BOARD] {
            for row in board.rows {
                assert_eq!(row.len(), BOARD_SIZE, "board {}", board.name);
            }
        }
    }

    #[test]
    fn standard_premiums() {
        // Corners are triple word, center is double word
        assert_eq!(STANDARD_BOARD.word_multiplier(0, 0), 3);
        assert_eq!(STANDARD_BOARD.word_multiplier(14, 14), 3);
        assert_eq!(STANDARD_BOARD.word_multiplier(7, 7), 2);
        assert_eq!(STANDARD_BOARD.letter_multiplier(0, 3), 2);
        assert_eq!(STANDARD_BOARD.letter_multiplier(1, 5), 3);
        assert_eq!(STANDARD_BOARD.letter_multiplier(7, 7), 1);
    }

    #[test]
    fn layouts_are_symmetric() {
        for board in [&STANDARD_BOARD, &EXPLO_BOARD] {
            for r in 0..BOARD_SIZE {
                for c in 0..BOARD_SIZE {
                    let cell = board.cell(r, c);
                    assert_eq!(cell, board.cell(BOARD_SIZE - 1 - r, c));
                    assert_eq!(cell, board.cell(r, BOARD_SIZE - 1 - c));
                }
            }
        }
    }
}

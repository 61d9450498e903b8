//! Move representation and the placement wire format.
//!
//! A placement move is stored as a board coordinate plus a tile string:
//! the coordinate is "A15" for a horizontal word or "15A" for a
//! vertical one, and the tile string spells the whole primary word with
//! each blank written as '?' followed by the letter it stands for.
//! Non-placement moves use the sentinels "PASS", "EXCH <tiles>" and
//! "RSGN".

use crate::db::records::MoveRecord;
use crate::error::{CoreError, CoreResult};
use crate::locales::{BOARD_SIZE, ROW_IDS};
use crate::services::game::board::Board;

/// A move as submitted by a player or generated by a robot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayedMove {
    Placement { coord: String, tiles: String },
    Exchange { tiles: String },
    Pass,
    Resign,
}

impl PlayedMove {
    /// Reconstruct a move from its stored record, for replay
    pub fn from_record(record: &MoveRecord) -> Option<PlayedMove> {
        if !record.coord.is_empty() {
            return Some(PlayedMove::Placement {
                coord: record.coord.clone(),
                tiles: record.tiles.clone(),
            });
        }
        if record.tiles == "PASS" {
            return Some(PlayedMove::Pass);
        }
        if record.tiles == "RSGN" {
            return Some(PlayedMove::Resign);
        }
        if let Some(tiles) = record.tiles.strip_prefix("EXCH ") {
            return Some(PlayedMove::Exchange {
                tiles: tiles.to_string(),
            });
        }
        // Synthetic summary records are not replayable moves
        None
    }
}

/// A parsed board coordinate: the anchor square and the word direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
    pub horizontal: bool,
}

impl Coordinate {
    /// Decode "A15" (horizontal) or "15A" (vertical)
    pub fn parse(coord: &str) -> Option<Coordinate> {
        if coord.is_empty() {
            return None;
        }
        let first = coord.chars().next()?;
        if ROW_IDS.contains(first) {
            // Horizontal: row letter followed by column number
            let row = ROW_IDS.find(first)?;
            let col: usize = coord[1..].parse().ok()?;
            if col < 1 || col > BOARD_SIZE {
                return None;
            }
            Some(Coordinate {
                row,
                col: col - 1,
                horizontal: true,
            })
        } else {
            // Vertical: column number followed by row letter
            let last = coord.chars().last()?;
            let row = ROW_IDS.find(last)?;
            let col: usize = coord[..coord.len() - 1].parse().ok()?;
            if col < 1 || col > BOARD_SIZE {
                return None;
            }
            Some(Coordinate {
                row,
                col: col - 1,
                horizontal: false,
            })
        }
    }

    pub fn format(&self) -> String {
        let row_id = ROW_IDS.as_bytes()[self.row] as char;
        if self.horizontal {
            format!("{}{}", row_id, self.col + 1)
        } else {
            format!("{}{}", self.col + 1, row_id)
        }
    }
}

/// A newly covered square within a placement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cover {
    pub row: usize,
    pub col: usize,
    /// The tile drawn from the rack ('?' for a blank)
    pub tile: char,
    /// The letter the tile stands for
    pub letter: char,
}

/// Decode a tile string into (tile, letter) pairs, resolving the '?'
/// blank prefix notation
pub fn parse_tiles(tiles: &str) -> CoreResult<Vec<(char, char)>> {
    let mut result = Vec::new();
    let mut chars = tiles.chars();
    while let Some(c) = chars.next() {
        if c == '?' {
            let letter = chars.next().ok_or_else(|| {
                CoreError::IllegalMove("blank tile without a letter".to_string())
            })?;
            result.push(('?', letter));
        } else {
            result.push((c, c));
        }
    }
    Ok(result)
}

/// Resolve a placement against the current board: walk the word from
/// its anchor square, matching squares that already hold a tile and
/// collecting the squares the move newly covers.
pub fn make_covers(board: &Board, coord: &Coordinate, tiles: &str) -> CoreResult<Vec<Cover>> {
    let pairs = parse_tiles(tiles)?;
    if pairs.is_empty() {
        return Err(CoreError::IllegalMove("empty placement".to_string()));
    }
    let (mut row, mut col) = (coord.row, coord.col);
    let mut covers = Vec::new();
    for (tile, letter) in pairs {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(CoreError::IllegalMove("word runs off the board".to_string()));
        }
        match board.letter_at(row, col) {
            Some(existing) => {
                // The square is already covered; the word must pass
                // through the existing letter
                if existing != letter {
                    return Err(CoreError::IllegalMove(format!(
                        "square {} already holds '{existing}'",
                        Coordinate {
                            row,
                            col,
                            horizontal: coord.horizontal
                        }
                        .format()
                    )));
                }
            }
            None => covers.push(Cover {
                row,
                col,
                tile,
                letter,
            }),
        }
        if coord.horizontal {
            col += 1;
        } else {
            row += 1;
        }
    }
    if covers.is_empty() {
        return Err(CoreError::IllegalMove(
            "placement lays no new tiles".to_string(),
        ));
    }
    Ok(covers)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_horizontal_coordinates() {
        let coord = Coordinate::parse("A15").expect("valid coordinate");
        assert_eq!(coord.row, 0);
        assert_eq!(coord.col, 14);
        assert!(coord.horizontal);
        assert_eq!(coord.format(), "A15");
    }

    #[test]
    fn parses_vertical_coordinates() {
        let coord = Coordinate::parse("15A").expect("valid coordinate");
        assert_eq!(coord.row, 0);
        assert_eq!(coord.col, 14);
        assert!(!coord.horizontal);
        assert_eq!(coord.format(), "15A");
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert_eq!(Coordinate::parse(""), None);
        assert_eq!(Coordinate::parse("A0"), None);
        assert_eq!(Coordinate::parse("A16"), None);
        assert_eq!(Coordinate::parse("Q4"), None);
        assert_eq!(Coordinate::parse("zzz"), None);
    }

    #[test]
    fn parses_blank_notation() {
        let pairs = parse_tiles("ho?use").expect("valid tiles");
        assert_eq!(
            pairs,
            vec![('h', 'h'), ('o', 'o'), ('?', 'u'), ('s', 's'), ('e', 'e')]
        );
    }

    #[test]
    fn covers_skip_existing_tiles() {
        let mut board = Board::new();
        board.place(7, 7, 'a', 'a');
        let coord = Coordinate::parse("H7").expect("valid coordinate");
        // Word "cat" passing through the existing 'a' at H8
        let covers = make_covers(&board, &coord, "cat").expect("valid covers");
        assert_eq!(covers.len(), 2);
        assert_eq!(covers[0].letter, 'c');
        assert_eq!(covers[1].letter, 't');
        assert_eq!(covers[1].col, 8);
    }

    #[test]
    fn covers_reject_conflicts() {
        let mut board = Board::new();
        board.place(7, 7, 'a', 'a');
        let coord = Coordinate::parse("H8").expect("valid coordinate");
        assert!(make_covers(&board, &coord, "dog").is_err());
    }

    #[test]
    fn round_trips_moves_from_records() {
        use crate::db::records::MoveRecord;
        use chrono::Utc;
        let record = MoveRecord {
            coord: String::new(),
            tiles: "EXCH ab?".to_string(),
            score: 0,
            rack: "xyzabcd".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(
            PlayedMove::from_record(&record),
            Some(PlayedMove::Exchange {
                tiles: "ab?".to_string()
            })
        );
        let over = MoveRecord {
            coord: String::new(),
            tiles: "OVER".to_string(),
            score: 0,
            rack: String::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(PlayedMove::from_record(&over), None);
    }
}

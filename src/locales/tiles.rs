//! Tile sets for the supported languages: point values and initial bag
//! composition. The "new" Icelandic set is the one standardized by the
//! Icelandic scrabble federation; the "new" English set is a rebalanced
//! distribution used when the game is created with the `newbag` option.

/// Number of tiles a player holds at a time
pub const RACK_SIZE: usize = 7;

/// A set of tiles for a particular language: per-tile point values and
/// the composition of the initial bag. The blank tile is '?'.
pub struct TileSet {
    pub name: &'static str,
    scores: &'static [(char, i32)],
    bag_tiles: &'static [(char, u8)],
}

impl TileSet {
    /// Return the point value of a single tile
    pub fn score_tile(&self, tile: char) -> i32 {
        self.scores
            .iter()
            .find(|(t, _)| *t == tile)
            .map(|(_, s)| *s)
            .unwrap_or(0)
    }

    /// Return the net (plain) score of the given tiles
    pub fn score(&self, tiles: &str) -> i32 {
        tiles.chars().map(|t| self.score_tile(t)).sum()
    }

    /// True if the tile (or the blank) belongs to this set
    pub fn contains(&self, tile: char) -> bool {
        self.scores.iter().any(|(t, _)| *t == tile)
    }

    /// Return a full bag of tiles
    pub fn full_bag(&self) -> String {
        let mut bag = String::with_capacity(self.num_tiles());
        for (tile, count) in self.bag_tiles {
            for _ in 0..*count {
                bag.push(*tile);
            }
        }
        bag
    }

    /// Return the total number of tiles in this tile set
    pub fn num_tiles(&self) -> usize {
        self.bag_tiles.iter().map(|(_, n)| *n as usize).sum()
    }
}

/// The old (original) Icelandic tile set
pub static OLD_ICELANDIC: TileSet = TileSet {
    name: "old-icelandic",
    scores: &[
        ('a', 1),
        ('á', 4),
        ('b', 6),
        ('d', 4),
        ('ð', 2),
        ('e', 1),
        ('é', 6),
        ('f', 3),
        ('g', 2),
        ('h', 3),
        ('i', 1),
        ('í', 4),
        ('j', 5),
        ('k', 2),
        ('l', 2),
        ('m', 2),
        ('n', 1),
        ('o', 3),
        ('ó', 6),
        ('p', 8),
        ('r', 1),
        ('s', 1),
        ('t', 1),
        ('u', 1),
        ('ú', 8),
        ('v', 3),
        ('x', 10),
        ('y', 7),
        ('ý', 9),
        ('þ', 4),
        ('æ', 5),
        ('ö', 7),
        ('?', 0),
    ],
    bag_tiles: &[
        ('a', 10),
        ('á', 2),
        ('b', 1),
        ('d', 2),
        ('ð', 5),
        ('e', 6),
        ('é', 1),
        ('f', 3),
        ('g', 4),
        ('h', 2),
        ('i', 8),
        ('í', 2),
        ('j', 1),
        ('k', 3),
        ('l', 3),
        ('m', 3),
        ('n', 8),
        ('o', 3),
        ('ó', 1),
        ('p', 1),
        ('r', 7),
        ('s', 6),
        ('t', 5),
        ('u', 6),
        ('ú', 1),
        ('v', 2),
        ('x', 1),
        ('y', 1),
        ('ý', 1),
        ('þ', 1),
        ('æ', 1),
        ('ö', 1),
        ('?', 2),
    ],
};

/// The new Icelandic tile set, created by Skraflfélag Íslands
pub static NEW_ICELANDIC: TileSet = TileSet {
    name: "new-icelandic",
    scores: &[
        ('a', 1),
        ('á', 3),
        ('b', 5),
        ('d', 5),
        ('ð', 2),
        ('e', 3),
        ('é', 7),
        ('f', 3),
        ('g', 3),
        ('h', 4),
        ('i', 1),
        ('í', 4),
        ('j', 6),
        ('k', 2),
        ('l', 2),
        ('m', 2),
        ('n', 1),
        ('o', 5),
        ('ó', 3),
        ('p', 5),
        ('r', 1),
        ('s', 1),
        ('t', 2),
        ('u', 2),
        ('ú', 4),
        ('v', 5),
        ('x', 10),
        ('y', 6),
        ('ý', 5),
        ('þ', 7),
        ('æ', 4),
        ('ö', 6),
        ('?', 0),
    ],
    bag_tiles: &[
        ('a', 11),
        ('á', 2),
        ('b', 1),
        ('d', 1),
        ('ð', 4),
        ('e', 3),
        ('é', 1),
        ('f', 3),
        ('g', 3),
        ('h', 1),
        ('i', 7),
        ('í', 1),
        ('j', 1),
        ('k', 4),
        ('l', 5),
        ('m', 3),
        ('n', 7),
        ('o', 1),
        ('ó', 2),
        ('p', 1),
        ('r', 8),
        ('s', 7),
        ('t', 6),
        ('u', 6),
        ('ú', 1),
        ('v', 1),
        ('x', 1),
        ('y', 1),
        ('ý', 1),
        ('þ', 1),
        ('æ', 2),
        ('ö', 1),
        ('?', 2),
    ],
};

/// The classic English tile set
pub static ENGLISH: TileSet = TileSet {
    name: "english",
    scores: &[
        ('e', 1),
        ('a', 1),
        ('i', 1),
        ('o', 1),
        ('n', 1),
        ('r', 1),
        ('t', 1),
        ('l', 1),
        ('s', 1),
        ('u', 1),
        ('d', 2),
        ('g', 2),
        ('b', 3),
        ('c', 3),
        ('m', 3),
        ('p', 3),
        ('f', 4),
        ('h', 4),
        ('v', 4),
        ('w', 4),
        ('y', 4),
        ('k', 5),
        ('j', 8),
        ('x', 8),
        ('q', 10),
        ('z', 10),
        ('?', 0),
    ],
    bag_tiles: &[
        ('e', 12),
        ('a', 9),
        ('i', 9),
        ('o', 8),
        ('n', 6),
        ('r', 6),
        ('t', 6),
        ('l', 4),
        ('s', 4),
        ('u', 4),
        ('d', 4),
        ('g', 3),
        ('b', 2),
        ('c', 2),
        ('m', 2),
        ('p', 2),
        ('f', 2),
        ('h', 2),
        ('v', 2),
        ('w', 2),
        ('y', 2),
        ('k', 1),
        ('j', 1),
        ('x', 1),
        ('q', 1),
        ('z', 1),
        ('?', 2),
    ],
};

/// Rebalanced English tile set, used for games created with the
/// updated bag option
pub static NEW_ENGLISH: TileSet = TileSet {
    name: "new-english",
    scores: &[
        ('i', 1),
        ('o', 1),
        ('s', 1),
        ('a', 1),
        ('e', 1),
        ('t', 2),
        ('h', 2),
        ('y', 2),
        ('m', 2),
        ('u', 2),
        ('d', 2),
        ('n', 2),
        ('l', 2),
        ('r', 2),
        ('p', 2),
        ('k', 3),
        ('b', 3),
        ('g', 3),
        ('c', 3),
        ('f', 3),
        ('w', 4),
        ('x', 5),
        ('v', 5),
        ('j', 6),
        ('z', 6),
        ('q', 12),
        ('?', 0),
    ],
    bag_tiles: &[
        ('e', 12),
        ('a', 11),
        ('s', 9),
        ('o', 7),
        ('i', 6),
        ('r', 6),
        ('n', 5),
        ('l', 5),
        ('t', 4),
        ('u', 4),
        ('d', 4),
        ('m', 3),
        ('g', 3),
        ('c', 3),
        ('h', 2),
        ('y', 2),
        ('p', 2),
        ('b', 2),
        ('k', 1),
        ('w', 1),
        ('f', 1),
        ('x', 1),
        ('v', 1),
        ('j', 1),
        ('z', 1),
        ('q', 1),
        ('?', 2),
    ],
};

/// The Polish tile set
pub static POLISH: TileSet = TileSet {
    name: "polish",
    scores: &[
        ('a', 1),
        ('ą', 5),
        ('b', 3),
        ('c', 2),
        ('ć', 6),
        ('d', 2),
        ('e', 1),
        ('ę', 5),
        ('f', 5),
        ('g', 3),
        ('h', 3),
        ('i', 1),
        ('j', 3),
        ('k', 3),
        ('l', 2),
        ('ł', 3),
        ('m', 2),
        ('n', 1),
        ('ń', 7),
        ('o', 1),
        ('ó', 5),
        ('p', 2),
        ('r', 1),
        ('s', 1),
        ('ś', 5),
        ('t', 2),
        ('u', 3),
        ('w', 1),
        ('y', 2),
        ('z', 1),
        ('ź', 9),
        ('ż', 5),
        ('?', 0),
    ],
    bag_tiles: &[
        ('a', 9),
        ('ą', 1),
        ('b', 2),
        ('c', 3),
        ('ć', 1),
        ('d', 3),
        ('e', 7),
        ('ę', 1),
        ('f', 1),
        ('g', 2),
        ('h', 2),
        ('i', 8),
        ('j', 2),
        ('k', 3),
        ('l', 3),
        ('ł', 2),
        ('m', 3),
        ('n', 5),
        ('ń', 1),
        ('o', 6),
        ('ó', 1),
        ('p', 3),
        ('r', 4),
        ('s', 4),
        ('ś', 1),
        ('t', 3),
        ('u', 2),
        ('w', 4),
        ('y', 4),
        ('z', 5),
        ('ź', 1),
        ('ż', 1),
        ('?', 2),
    ],
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bag_sizes() {
        assert_eq!(NEW_ICELANDIC.num_tiles(), 100);
        assert_eq!(ENGLISH.num_tiles(), 100);
        assert_eq!(NEW_ENGLISH.num_tiles(), ENGLISH.num_tiles());
        assert_eq!(POLISH.num_tiles(), 100);
    }

    #[test]
    fn total_points_in_new_english_bag() {
        let total: i32 = NEW_ENGLISH
            .full_bag()
            .chars()
            .map(|t| NEW_ENGLISH.score_tile(t))
            .sum();
        assert_eq!(total, 187);
    }

    #[test]
    fn blank_scores_zero() {
        assert_eq!(NEW_ICELANDIC.score_tile('?'), 0);
        assert_eq!(NEW_ICELANDIC.score("a?r"), 2);
    }
}

//! Core game state: board, racks, bag and scores, with move
//! application, scoring and end-of-game accounting.

use crate::error::{CoreError, CoreResult};
use crate::locales::{tiles::RACK_SIZE, Locale, TileSet};
use crate::services::game::{
    board::{Board, START_SQUARE},
    moves::{make_covers, Coordinate, Cover, PlayedMove},
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Bonus for laying down the full rack in one move
const BINGO_BONUS: i32 = 50;

/// The game ends after this many consecutive non-scoring moves
const MAX_ZERO_MOVES: u32 = 6;

/// The result of applying one move: the fields that go into the stored
/// move record, plus the words formed for external validation
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub coord: String,
    pub tiles: String,
    pub score: i32,
    /// Words formed by a placement, primary word first
    pub words: Vec<String>,
}

#[derive(Clone)]
pub struct GameState {
    board: Board,
    racks: [Vec<char>; 2],
    bag: Vec<char>,
    scores: [i32; 2],
    to_move: usize,
    /// Length of the trailing run of passes and exchanges
    zero_moves_run: u32,
    resigned: bool,
    /// End-of-game score adjustments, per player, once finalized
    adjustments: [i32; 2],
    finalized: bool,
}

impl GameState {
    /// A fresh state with full bag and racks dealt to both players
    pub fn new(tile_set: &TileSet) -> Self {
        let mut state = Self::empty();
        state.bag = tile_set.full_bag().chars().collect();
        state.bag.shuffle(&mut rand::thread_rng());
        for ix in 0..2 {
            let drawn = state.draw_from_bag(RACK_SIZE);
            state.racks[ix] = drawn;
        }
        state
    }

    /// An empty state with no tiles drawn, for replay
    pub fn empty() -> Self {
        Self {
            board: Board::new(),
            racks: [Vec::new(), Vec::new()],
            bag: Vec::new(),
            scores: [0, 0],
            to_move: 0,
            zero_moves_run: 0,
            resigned: false,
            adjustments: [0, 0],
            finalized: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rack(&self, player: usize) -> String {
        self.racks[player].iter().collect()
    }

    pub fn set_rack(&mut self, player: usize, rack: &str) {
        self.racks[player] = rack.chars().collect();
    }

    pub fn bag(&self) -> String {
        self.bag.iter().collect()
    }

    pub fn scores(&self) -> [i32; 2] {
        self.scores
    }

    pub fn player_to_move(&self) -> usize {
        self.to_move
    }

    pub fn is_resigned(&self) -> bool {
        self.resigned
    }

    fn draw_from_bag(&mut self, count: usize) -> Vec<char> {
        let mut rng = rand::thread_rng();
        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            if self.bag.is_empty() {
                break;
            }
            let ix = rng.gen_range(0..self.bag.len());
            drawn.push(self.bag.swap_remove(ix));
        }
        drawn
    }

    /// Apply a move for the player to move. A shallow apply updates the
    /// board, scores and turn, but neither racks nor bag; it is used
    /// when replaying stored moves whose resulting racks are on record.
    pub fn apply_move(
        &mut self,
        locale: &Locale,
        mv: &PlayedMove,
        shallow: bool,
    ) -> CoreResult<AppliedMove> {
        let player = self.to_move;
        let applied = match mv {
            PlayedMove::Placement { coord, tiles } => {
                self.apply_placement(locale, player, coord, tiles, shallow)?
            }
            PlayedMove::Exchange { tiles } => {
                if !shallow {
                    self.validate_exchange(player, tiles)?;
                    self.exchange_tiles(player, tiles);
                }
                self.zero_moves_run += 1;
                AppliedMove {
                    coord: String::new(),
                    tiles: format!("EXCH {tiles}"),
                    score: 0,
                    words: Vec::new(),
                }
            }
            PlayedMove::Pass => {
                self.zero_moves_run += 1;
                AppliedMove {
                    coord: String::new(),
                    tiles: "PASS".to_string(),
                    score: 0,
                    words: Vec::new(),
                }
            }
            PlayedMove::Resign => {
                // The resigning player forfeits their score, so the
                // opponent comes out ahead
                let delta = -self.scores[player];
                self.scores[player] += delta;
                self.resigned = true;
                AppliedMove {
                    coord: String::new(),
                    tiles: "RSGN".to_string(),
                    score: delta,
                    words: Vec::new(),
                }
            }
        };
        self.to_move = 1 - self.to_move;
        Ok(applied)
    }

    fn apply_placement(
        &mut self,
        locale: &Locale,
        player: usize,
        coord: &str,
        tiles: &str,
        shallow: bool,
    ) -> CoreResult<AppliedMove> {
        let coordinate = Coordinate::parse(coord)
            .ok_or_else(|| CoreError::IllegalMove(format!("bad coordinate '{coord}'")))?;
        let covers = make_covers(&self.board, &coordinate, tiles)?;
        let word_len = crate::services::game::moves::parse_tiles(tiles)?.len();

        if !shallow {
            self.validate_placement(locale, player, &coordinate, &covers, word_len)?;
        }

        let (score, words) = self.score_placement(locale, &coordinate, &covers, tiles);

        // Lay the tiles
        for cover in &covers {
            self.board.place(cover.row, cover.col, cover.tile, cover.letter);
        }
        self.scores[player] += score;
        self.zero_moves_run = 0;

        if !shallow {
            // Remove the played tiles from the rack and refill from the bag
            for cover in &covers {
                remove_tile(&mut self.racks[player], cover.tile);
            }
            let missing = RACK_SIZE.saturating_sub(self.racks[player].len());
            let drawn = self.draw_from_bag(missing);
            self.racks[player].extend(drawn);
        }

        Ok(AppliedMove {
            coord: coordinate.format(),
            tiles: tiles.to_string(),
            score,
            words,
        })
    }

    fn validate_placement(
        &self,
        locale: &Locale,
        player: usize,
        coordinate: &Coordinate,
        covers: &[Cover],
        word_len: usize,
    ) -> CoreResult<()> {
        if covers.len() > RACK_SIZE {
            return Err(CoreError::IllegalMove("too many tiles".to_string()));
        }
        // Every laid tile must come from the player's rack and exist in
        // the locale's tile set
        let mut rack = self.racks[player].clone();
        for cover in covers {
            if cover.tile != '?' && !locale.tile_set.contains(cover.tile) {
                return Err(CoreError::IllegalMove(format!(
                    "tile '{}' not in tile set",
                    cover.tile
                )));
            }
            if cover.tile == '?' && !locale.alphabet.contains(cover.letter) {
                return Err(CoreError::IllegalMove(format!(
                    "letter '{}' not in alphabet",
                    cover.letter
                )));
            }
            if !remove_tile(&mut rack, cover.tile) {
                return Err(CoreError::IllegalMove(format!(
                    "tile '{}' not in rack",
                    cover.tile
                )));
            }
        }

        // The word must not be an incomplete fragment of a longer row
        let (before, after) = self.word_boundaries(coordinate, word_len);
        if before || after {
            return Err(CoreError::IllegalMove(
                "placement does not cover the whole word".to_string(),
            ));
        }

        if self.board.is_empty() {
            // First move: must cover the start square
            if word_len < 2 {
                return Err(CoreError::IllegalMove(
                    "first word must be at least two letters".to_string(),
                ));
            }
            if !covers
                .iter()
                .any(|c| (c.row, c.col) == START_SQUARE)
            {
                return Err(CoreError::IllegalMove(
                    "first word must cover the start square".to_string(),
                ));
            }
        } else {
            // Later moves must connect to the existing tiles
            let passes_through = covers.len() < word_len;
            let touches = covers
                .iter()
                .any(|c| self.board.has_neighbor(c.row, c.col));
            if !passes_through && !touches {
                return Err(CoreError::IllegalMove(
                    "word does not connect to the board".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Whether a tile lies immediately before the anchor or immediately
    /// after the last square of the word
    fn word_boundaries(&self, coordinate: &Coordinate, word_len: usize) -> (bool, bool) {
        let before = if coordinate.horizontal {
            coordinate.col > 0 && self.board.has_tile(coordinate.row, coordinate.col - 1)
        } else {
            coordinate.row > 0 && self.board.has_tile(coordinate.row - 1, coordinate.col)
        };
        let after = if coordinate.horizontal {
            let col = coordinate.col + word_len;
            col < crate::locales::BOARD_SIZE && self.board.has_tile(coordinate.row, col)
        } else {
            let row = coordinate.row + word_len;
            row < crate::locales::BOARD_SIZE && self.board.has_tile(row, coordinate.col)
        };
        (before, after)
    }

    /// Score a placement: the primary word with premium squares applied
    /// to newly covered tiles, every cross word formed, and the bingo
    /// bonus for a full-rack move
    fn score_placement(
        &self,
        locale: &Locale,
        coordinate: &Coordinate,
        covers: &[Cover],
        tiles: &str,
    ) -> (i32, Vec<String>) {
        let geometry = locale.board();
        let tile_set = locale.tile_set;
        let word_pairs = crate::services::game::moves::parse_tiles(tiles).unwrap_or_default();
        let word: String = word_pairs.iter().map(|(_, letter)| *letter).collect();

        let mut words = vec![word];
        let mut total = 0;

        // Primary word
        let mut word_score = 0;
        let mut word_multiplier = 1;
        let (mut row, mut col) = (coordinate.row, coordinate.col);
        for _ in 0..word_pairs.len() {
            if let Some(cover) = covers.iter().find(|c| c.row == row && c.col == col) {
                word_score +=
                    tile_set.score_tile(cover.tile) * geometry.letter_multiplier(row, col);
                word_multiplier *= geometry.word_multiplier(row, col);
            } else if let Some(tile) = self.board.tile_at(row, col) {
                word_score += tile_set.score_tile(tile);
            }
            if coordinate.horizontal {
                col += 1;
            } else {
                row += 1;
            }
        }
        total += word_score * word_multiplier;

        // Cross words through each newly covered square
        for cover in covers {
            if let Some((cross_word, cross_score)) =
                self.cross_word(locale, cover, coordinate.horizontal)
            {
                total += cross_score;
                words.push(cross_word);
            }
        }

        if covers.len() == RACK_SIZE {
            total += BINGO_BONUS;
        }

        (total, words)
    }

    /// The perpendicular word formed through a cover, if longer than
    /// one letter, with its score
    fn cross_word(&self, locale: &Locale, cover: &Cover, horizontal: bool) -> Option<(String, i32)> {
        let geometry = locale.board();
        let tile_set = locale.tile_set;
        let size = crate::locales::BOARD_SIZE;

        let (dr, dc) = if horizontal { (1, 0) } else { (0, 1) };
        // Walk to the start of the perpendicular run
        let (mut row, mut col) = (cover.row, cover.col);
        while row >= dr && col >= dc && self.board.has_tile(row - dr, col - dc) {
            row -= dr;
            col -= dc;
        }

        let mut word = String::new();
        let mut score = 0;
        let mut length = 0;
        let (mut r, mut c) = (row, col);
        loop {
            if r == cover.row && c == cover.col {
                word.push(cover.letter);
                score += tile_set.score_tile(cover.tile) * geometry.letter_multiplier(r, c);
            } else if let Some(tile) = self.board.tile_at(r, c) {
                word.push(self.board.letter_at(r, c).unwrap_or(tile));
                score += tile_set.score_tile(tile);
            } else {
                break;
            }
            length += 1;
            r += dr;
            c += dc;
            if r >= size || c >= size {
                break;
            }
        }

        if length < 2 {
            return None;
        }
        score *= geometry.word_multiplier(cover.row, cover.col);
        Some((word, score))
    }

    fn validate_exchange(&self, player: usize, tiles: &str) -> CoreResult<()> {
        if self.bag.len() < RACK_SIZE {
            return Err(CoreError::IllegalMove(
                "not enough tiles left in the bag to exchange".to_string(),
            ));
        }
        let mut rack = self.racks[player].clone();
        for tile in tiles.chars() {
            if !remove_tile(&mut rack, tile) {
                return Err(CoreError::IllegalMove(format!("tile '{tile}' not in rack")));
            }
        }
        Ok(())
    }

    fn exchange_tiles(&mut self, player: usize, tiles: &str) {
        let returned: Vec<char> = tiles.chars().collect();
        for tile in &returned {
            remove_tile(&mut self.racks[player], *tile);
        }
        // Draw the replacements before returning the old tiles, so the
        // same tiles cannot be drawn right back
        let drawn = self.draw_from_bag(returned.len());
        self.racks[player].extend(drawn);
        self.bag.extend(returned);
    }

    /// The game is over when a player resigns, a rack and the bag are
    /// both empty, or the sixth consecutive non-scoring move is made
    pub fn is_game_over(&self) -> bool {
        if self.resigned {
            return true;
        }
        if self.bag.is_empty() && self.racks.iter().any(|rack| rack.is_empty()) {
            return true;
        }
        self.zero_moves_run >= MAX_ZERO_MOVES
    }

    /// Recompute the bag contents from the full tile set minus the
    /// tiles on the board and in the racks; used after replay
    pub fn recalc_bag(&mut self, tile_set: &TileSet) {
        let mut bag: Vec<char> = tile_set.full_bag().chars().collect();
        for (_, _, tile, _) in self.board.enum_tiles() {
            remove_tile(&mut bag, tile);
        }
        for rack in &self.racks {
            for tile in rack {
                remove_tile(&mut bag, *tile);
            }
        }
        self.bag = bag;
    }

    /// Apply the end-of-game score adjustments. `last_player` is the
    /// player who made the final move. The fixed order is overtime
    /// handling first, then rack leave, and the adjustments are
    /// recorded for the synthetic summary records.
    pub fn finalize_score(
        &mut self,
        last_player: usize,
        lost_on_overtime: Option<usize>,
        overtime_adj: [i32; 2],
        tile_set: &TileSet,
    ) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        if self.resigned {
            // Resignation already settled the score
            return;
        }

        let mut adjustment = overtime_adj;

        if let Some(loser) = lost_on_overtime {
            // Loss on time: the losing player drops by up to 100 points
            // and, if still ahead, the opponent is lifted to a one
            // point lead
            let winner = 1 - loser;
            adjustment[winner] = 0;
            adjustment[loser] = -self.scores[loser].min(100);
            if self.scores[loser] + adjustment[loser] >= self.scores[winner] {
                adjustment[winner] =
                    self.scores[loser] + adjustment[loser] + 1 - self.scores[winner];
            }
        } else {
            let opponent = 1 - last_player;
            let opp_rack_score = tile_set.score(&self.rack(opponent));
            if self.racks[last_player].is_empty() {
                // Went out: gains double the opponent's rack leave
                self.scores[last_player] += 2 * opp_rack_score;
            } else {
                // Ended by passes: each player loses their own rack value
                let own_rack_score = tile_set.score(&self.rack(last_player));
                self.scores[opponent] -= opp_rack_score;
                self.scores[last_player] -= own_rack_score;
            }
        }

        self.scores[0] += adjustment[0];
        self.scores[1] += adjustment[1];
        self.adjustments = adjustment;
    }

    /// The overtime adjustments recorded by finalization
    pub fn overtime_adjustments(&self) -> [i32; 2] {
        self.adjustments
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn final_scores(&self) -> [i32; 2] {
        self.scores
    }
}

/// Remove one occurrence of a tile; true if it was present
fn remove_tile(tiles: &mut Vec<char>, tile: char) -> bool {
    match tiles.iter().position(|t| *t == tile) {
        Some(ix) => {
            tiles.remove(ix);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::locales::Locale;

    fn english() -> Locale {
        Locale::for_game("en_US", false)
    }

    fn state_with_racks(rack0: &str, rack1: &str) -> GameState {
        let mut state = GameState::empty();
        state.set_rack(0, rack0);
        state.set_rack(1, rack1);
        state.recalc_bag(english().tile_set);
        state
    }

    #[test]
    fn first_move_scores_with_premiums() {
        let locale = english();
        let mut state = state_with_racks("house??", "zzzzzzz");
        let applied = state
            .apply_move(
                &locale,
                &PlayedMove::Placement {
                    coord: "H7".to_string(),
                    tiles: "house".to_string(),
                },
                false,
            )
            .expect("legal first move");
        // h(4)+o(1)+u(1)+s(1)+e(1) = 8, doubled on the start square,
        // with the double-letter on H8 applying to 'o'... H7..H11 covers
        // the start square H8; recompute: letters h@H7, o@H8(center DW),
        // u@H9, s@H10, e@H11 -> (4+1+1+1+1) * 2 = 16
        assert_eq!(applied.score, 16);
        assert_eq!(applied.words, vec!["house".to_string()]);
        assert_eq!(state.scores()[0], 16);
        assert_eq!(state.player_to_move(), 1);
        // Rack refilled to seven tiles
        assert_eq!(state.rack(0).chars().count(), 7);
    }

    #[test]
    fn first_move_must_cover_center() {
        let locale = english();
        let mut state = state_with_racks("house??", "zzzzzzz");
        let result = state.apply_move(
            &locale,
            &PlayedMove::Placement {
                coord: "A1".to_string(),
                tiles: "house".to_string(),
            },
            false,
        );
        assert!(matches!(result, Err(CoreError::IllegalMove(_))));
    }

    #[test]
    fn tiles_must_come_from_rack() {
        let locale = english();
        let mut state = state_with_racks("abcdefg", "zzzzzzz");
        let result = state.apply_move(
            &locale,
            &PlayedMove::Placement {
                coord: "H8".to_string(),
                tiles: "house".to_string(),
            },
            false,
        );
        assert!(matches!(result, Err(CoreError::IllegalMove(_))));
    }

    #[test]
    fn blank_scores_zero() {
        let locale = english();
        let mut state = state_with_racks("h?use??", "zzzzzzz");
        let applied = state
            .apply_move(
                &locale,
                &PlayedMove::Placement {
                    coord: "H7".to_string(),
                    tiles: "h?ouse".to_string(),
                },
                false,
            )
            .expect("legal first move");
        // The blank 'o' contributes nothing: (4+0+1+1+1) * 2 = 14
        assert_eq!(applied.score, 14);
    }

    #[test]
    fn cross_words_are_scored_and_reported() {
        let locale = english();
        let mut state = state_with_racks("seat???", "tone???", );
        state
            .apply_move(
                &locale,
                &PlayedMove::Placement {
                    coord: "H7".to_string(),
                    tiles: "seat".to_string(),
                },
                false,
            )
            .expect("first move");
        // Opponent plays "tone" vertically crossing through... lay
        // "on" hooking under 's' at H7: vertical word at 7I starting
        // row H? Use coordinate I7 area: place "on" vertically in
        // column 7 (G..): simpler: hook "no" horizontally below "seat"
        // forming cross words. Play "no" at I7 horizontally: n under s
        // (H7 is row H col 7): I7 = row I col 7, under 'e'? Column
        // numbering: H7 anchors 's' at col 7 -> letters s@H7 e@H8 a@H9
        // t@H10. "no" at I8 makes n under 'e' and o under 'a',
        // forming "en" and "ao" vertically plus "no" horizontally.
        let applied = state
            .apply_move(
                &locale,
                &PlayedMove::Placement {
                    coord: "I8".to_string(),
                    tiles: "no".to_string(),
                },
                false,
            )
            .expect("hooked move");
        assert!(applied.words.contains(&"no".to_string()));
        assert!(applied.words.contains(&"en".to_string()));
        assert!(applied.words.contains(&"ao".to_string()));
        assert!(applied.score > 0);
    }

    #[test]
    fn pass_run_ends_the_game() {
        let locale = english();
        let mut state = state_with_racks("abcdefg", "hijklmn");
        for _ in 0..6 {
            state
                .apply_move(&locale, &PlayedMove::Pass, false)
                .expect("pass");
        }
        assert!(state.is_game_over());
    }

    #[test]
    fn resignation_forfeits_the_score() {
        let locale = english();
        let mut state = state_with_racks("house??", "zzzzzzz");
        state
            .apply_move(
                &locale,
                &PlayedMove::Placement {
                    coord: "H7".to_string(),
                    tiles: "house".to_string(),
                },
                false,
            )
            .expect("first move");
        let applied = state
            .apply_move(&locale, &PlayedMove::Resign, false)
            .expect("resignation");
        assert_eq!(applied.tiles, "RSGN");
        assert!(state.is_game_over());
        assert!(state.is_resigned());
        assert_eq!(state.scores()[1], 0);
    }

    #[test]
    fn exchange_requires_a_full_bag_draw() {
        let locale = english();
        let mut state = GameState::empty();
        state.set_rack(0, "abcdefg");
        state.set_rack(1, "hijklmn");
        // Bag nearly empty: exchanging is not allowed
        state.bag = "abc".chars().collect();
        let result = state.apply_move(
            &locale,
            &PlayedMove::Exchange {
                tiles: "abc".to_string(),
            },
            false,
        );
        assert!(matches!(result, Err(CoreError::IllegalMove(_))));
    }

    #[test]
    fn going_out_gains_double_the_opponent_rack() {
        let tile_set = english().tile_set;
        let mut state = GameState::empty();
        state.set_rack(0, "");
        state.set_rack(1, "ab");
        state.scores = [100, 90];
        state.finalize_score(0, None, [0, 0], tile_set);
        // a=1, b=3: player 0 gains 2 * 4
        assert_eq!(state.final_scores(), [108, 90]);
    }

    #[test]
    fn pass_ending_subtracts_own_racks() {
        let tile_set = english().tile_set;
        let mut state = GameState::empty();
        state.set_rack(0, "a");
        state.set_rack(1, "z");
        state.scores = [100, 90];
        state.finalize_score(0, None, [0, 0], tile_set);
        assert_eq!(state.final_scores(), [99, 80]);
    }

    #[test]
    fn loss_on_overtime_flips_the_result() {
        let tile_set = english().tile_set;
        let mut state = GameState::empty();
        state.set_rack(0, "a");
        state.set_rack(1, "b");
        state.scores = [300, 250];
        // Player 0 exceeded the overtime threshold while leading
        state.finalize_score(0, Some(0), [-100, 0], tile_set);
        let scores = state.final_scores();
        // 300 - 100 = 200, still below... 200 < 250 so no lift needed
        assert_eq!(scores, [200, 250]);

        let mut state = GameState::empty();
        state.set_rack(0, "a");
        state.set_rack(1, "b");
        state.scores = [400, 250];
        state.finalize_score(0, Some(0), [-100, 0], tile_set);
        // 400 - 100 = 300 >= 250: opponent lifted to a one point lead
        assert_eq!(state.final_scores(), [300, 301]);
    }
}

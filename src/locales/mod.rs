//! Locale registry: alphabets, tile sets, vocabularies, board types and
//! language codes per locale. A `Locale` value is threaded through
//! request processing; game operations rebuild it from the game's own
//! locale code so that game rules never depend on the caller's UI locale.

pub mod boards;
pub mod tiles;

pub use boards::{BoardGeometry, BOARD_SIZE, ROW_IDS};
pub use tiles::{TileSet, RACK_SIZE};

/// The default locale of the deployment
pub const DEFAULT_LOCALE: &str = "is_IS";

/// An alphabet particular to a language: the letters used in the game
pub struct Alphabet {
    /// Lowercase letters that occur on tiles, in sort order
    pub order: &'static str,
    /// Uppercase version of `order`
    pub upper: &'static str,
    /// Sort ordering of all valid letters, tile-bearing or not
    pub full_order: &'static str,
    /// Uppercase version of `full_order`
    pub full_upper: &'static str,
}

impl Alphabet {
    /// True if the lowercase letter occurs on a tile of this alphabet
    pub fn contains(&self, letter: char) -> bool {
        self.order.chars().any(|c| c == letter)
    }

    /// Map a string to lowercase using this alphabet's case pairs,
    /// falling back to Unicode lowercasing for anything else
    pub fn to_lower(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match self.full_upper.chars().position(|u| u == c) {
                Some(ix) => self
                    .full_order
                    .chars()
                    .nth(ix)
                    .map(|l| vec![l])
                    .unwrap_or_default(),
                None => c.to_lowercase().collect(),
            })
            .collect()
    }

    /// Sort key of a string of tiles (including '?'), by bag order
    pub fn sort_key(&self, tiles: &str) -> Vec<usize> {
        tiles
            .chars()
            .map(|c| {
                if c == '?' {
                    self.order.chars().count()
                } else {
                    self.order.chars().position(|o| o == c).unwrap_or(usize::MAX)
                }
            })
            .collect()
    }
}

pub static ICELANDIC_ALPHABET: Alphabet = Alphabet {
    order: "aábdðeéfghiíjklmnoóprstuúvxyýþæö",
    upper: "AÁBDÐEÉFGHIÍJKLMNOÓPRSTUÚVXYÝÞÆÖ",
    full_order: "aábcdðeéfghiíjklmnoópqrstuúvwxyýzþæö",
    full_upper: "AÁBCDÐEÉFGHIÍJKLMNOÓPQRSTUÚVWXYÝZÞÆÖ",
};

pub static ENGLISH_ALPHABET: Alphabet = Alphabet {
    order: "abcdefghijklmnopqrstuvwxyz",
    upper: "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    full_order: "abcdefghijklmnopqrstuvwxyz",
    full_upper: "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
};

pub static POLISH_ALPHABET: Alphabet = Alphabet {
    order: "aąbcćdeęfghijklłmnńoóprsśtuwyzźż",
    upper: "AĄBCĆDEĘFGHIJKLŁMNŃOÓPRSŚTUWYZŹŻ",
    full_order: "aąbcćdeęfghijklłmnńoópqrsśtuvwxyzźż",
    full_upper: "AĄBCĆDEĘFGHIJKLŁMNŃOÓPQRSŚTUVWXYZŹŻ",
};

/// The tuple of language particulars controlling game rules for a
/// given region
#[derive(Clone)]
pub struct Locale {
    pub code: String,
    pub language: &'static str,
    pub alphabet: &'static Alphabet,
    pub tile_set: &'static TileSet,
    pub vocabulary: String,
    pub board_type: &'static str,
}

impl Locale {
    /// Resolve a locale code to its full particulars, falling back from
    /// "is_IS" to "is" to the deployment default
    pub fn for_code(lc: &str) -> Locale {
        Locale {
            code: lc.to_string(),
            language: language_for_locale(lc),
            alphabet: alphabet_for_locale(lc),
            tile_set: tile_set_for_locale(lc, false),
            vocabulary: vocabulary_for_locale(lc, "main"),
            board_type: board_type_for_locale(lc),
        }
    }

    /// Resolve a locale for a particular game; the `new_bag` game option
    /// selects the updated tile distribution where one exists
    pub fn for_game(lc: &str, new_bag: bool) -> Locale {
        let mut locale = Self::for_code(lc);
        locale.tile_set = tile_set_for_locale(lc, new_bag);
        locale
    }

    pub fn board(&self) -> &'static BoardGeometry {
        BoardGeometry::for_type(self.board_type)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::for_game(DEFAULT_LOCALE, true)
    }
}

/// The base language of a locale code, e.g. "is" for "is_IS"
fn base_language(lc: &str) -> &str {
    lc.split('_').next().unwrap_or(lc)
}

pub fn language_for_locale(lc: &str) -> &'static str {
    match base_language(lc) {
        "is" => "is",
        "pl" => "pl",
        _ => "en",
    }
}

pub fn alphabet_for_locale(lc: &str) -> &'static Alphabet {
    match base_language(lc) {
        "is" => &ICELANDIC_ALPHABET,
        "pl" => &POLISH_ALPHABET,
        "en" => &ENGLISH_ALPHABET,
        // Everything else presently defaults to the Icelandic alphabet
        _ => &ICELANDIC_ALPHABET,
    }
}

pub fn tile_set_for_locale(lc: &str, new_bag: bool) -> &'static TileSet {
    match base_language(lc) {
        "is" => {
            if new_bag {
                &tiles::NEW_ICELANDIC
            } else {
                &tiles::OLD_ICELANDIC
            }
        }
        "pl" => &tiles::POLISH,
        "en" => {
            if new_bag {
                &tiles::NEW_ENGLISH
            } else {
                &tiles::ENGLISH
            }
        }
        _ => &tiles::NEW_ICELANDIC,
    }
}

/// Return the name of the vocabulary for the given locale. A category
/// such as "common" or "medium" selects a constraining subset where one
/// is available.
pub fn vocabulary_for_locale(lc: &str, category: &str) -> String {
    let vocab = match (lc, base_language(lc)) {
        ("en_US", _) => match category {
            "main" => "otcwl2014",
            _ => "",
        },
        (_, "en") => match category {
            "main" => "sowpods",
            _ => "",
        },
        (_, "pl") => match category {
            "main" => "osps37",
            _ => "",
        },
        _ => match category {
            "main" => "ordalisti",
            "common" => "amlodi",
            "medium" => "midlungur",
            _ => "",
        },
    };
    vocab.to_string()
}

pub fn board_type_for_locale(lc: &str) -> &'static str {
    match base_language(lc) {
        "is" => "standard",
        // Everything else defaults to the mobile client board
        _ => "explo",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn locale_fallback() {
        let is = Locale::for_code("is_IS");
        assert_eq!(is.language, "is");
        assert_eq!(is.vocabulary, "ordalisti");
        assert_eq!(is.board_type, "standard");

        let us = Locale::for_code("en_US");
        assert_eq!(us.language, "en");
        assert_eq!(us.vocabulary, "otcwl2014");
        assert_eq!(us.board_type, "explo");

        let gb = Locale::for_code("en_GB");
        assert_eq!(gb.vocabulary, "sowpods");

        // Unknown locales fall back to the defaults
        let xx = Locale::for_code("xx_XX");
        assert_eq!(xx.language, "en");
        assert_eq!(xx.vocabulary, "ordalisti");
    }

    #[test]
    fn new_bag_selects_tile_set() {
        let old = Locale::for_game("is_IS", false);
        let new = Locale::for_game("is_IS", true);
        assert_eq!(old.tile_set.name, "old-icelandic");
        assert_eq!(new.tile_set.name, "new-icelandic");
    }

    #[test]
    fn alphabet_case_mapping() {
        assert_eq!(ICELANDIC_ALPHABET.to_lower("ÞÓRA"), "þóra");
        assert!(ICELANDIC_ALPHABET.contains('ð'));
        assert!(!ENGLISH_ALPHABET.contains('ð'));
    }
}

//! Target character pools.
//!
//! Numbers mode starts with the ten digits in the order the game has always
//! prompted them and widens to 10..=20 once enough answers are correct.
//! Letters mode covers uppercase A..=Z.

use serde::{Deserialize, Serialize};

pub const BASIC_NUMBERS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"];

pub const EXTENDED_NUMBERS: &[&str] = &[
    "10", "11", "12", "13", "14", "15", "16", "17", "18", "19", "20",
];

pub const LETTERS: &[&str] = &[
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Numbers,
    Letters,
}

impl Mode {
    /// localStorage key holding this mode's per-character table.
    pub fn storage_key(self) -> &'static str {
        match self {
            Mode::Numbers => "dd_scores_numbers",
            Mode::Letters => "dd_scores_letters",
        }
    }

    /// Noun used in prompts ("Draw the number: 7").
    pub fn label(self) -> &'static str {
        match self {
            Mode::Numbers => "number",
            Mode::Letters => "letter",
        }
    }

    pub fn toggled(self) -> Mode {
        match self {
            Mode::Numbers => Mode::Letters,
            Mode::Letters => Mode::Numbers,
        }
    }
}

/// Targets available in `mode`. The extended number range only joins the pool
/// once unlocked; letters have no unlock tier.
pub fn pool(mode: Mode, extended_unlocked: bool) -> Vec<&'static str> {
    match mode {
        Mode::Numbers => {
            let mut p = BASIC_NUMBERS.to_vec();
            if extended_unlocked {
                p.extend_from_slice(EXTENDED_NUMBERS);
            }
            p
        }
        Mode::Letters => LETTERS.to_vec(),
    }
}

/// Every target the mode can ever ask for, in display order (stats panel).
pub fn all_targets(mode: Mode) -> Vec<&'static str> {
    pool(mode, true)
}

/// Characters the recognizer is allowed to emit for `mode`.
pub fn whitelist(mode: Mode) -> String {
    match mode {
        Mode::Numbers => "0123456789".to_string(),
        Mode::Letters => LETTERS.concat(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_pool_is_ten_digits() {
        let p = pool(Mode::Numbers, false);
        assert_eq!(p.len(), 10);
        assert_eq!(p[0], "1");
        assert_eq!(p[9], "0");
    }

    #[test]
    fn unlocked_pool_adds_ten_through_twenty() {
        let p = pool(Mode::Numbers, true);
        assert_eq!(p.len(), 21);
        assert!(p.contains(&"10"));
        assert!(p.contains(&"20"));
        assert!(!p.contains(&"21"));
    }

    #[test]
    fn letters_ignore_unlock_flag() {
        assert_eq!(pool(Mode::Letters, false), pool(Mode::Letters, true));
        assert_eq!(pool(Mode::Letters, false).len(), 26);
    }

    #[test]
    fn whitelist_covers_every_pool_character() {
        for mode in [Mode::Numbers, Mode::Letters] {
            let wl = whitelist(mode);
            for t in all_targets(mode) {
                for c in t.chars() {
                    assert!(wl.contains(c), "{c} missing from {mode:?} whitelist");
                }
            }
        }
    }

    #[test]
    fn storage_keys_differ_per_mode() {
        assert_ne!(Mode::Numbers.storage_key(), Mode::Letters.storage_key());
        assert_eq!(Mode::Numbers.toggled(), Mode::Letters);
    }
}

// Character pool invariants.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::HashSet;

use doodle_digits::charset::{self, BASIC_NUMBERS, EXTENDED_NUMBERS, LETTERS, Mode};

#[test]
fn basic_numbers_are_unique_single_digits() {
    let mut seen = HashSet::new();
    for d in BASIC_NUMBERS {
        assert!(seen.insert(*d), "duplicate digit '{}' in BASIC_NUMBERS", d);
        assert_eq!(d.len(), 1, "basic number '{}' should be one character", d);
        assert!(d.chars().all(|c| c.is_ascii_digit()), "'{}' is not a digit", d);
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn extended_numbers_are_ten_through_twenty() {
    let parsed: Vec<u32> = EXTENDED_NUMBERS.iter().map(|s| s.parse().unwrap()).collect();
    assert_eq!(parsed, (10..=20).collect::<Vec<_>>());
    let basic: HashSet<&str> = BASIC_NUMBERS.iter().copied().collect();
    for n in EXTENDED_NUMBERS {
        assert!(!basic.contains(n), "'{}' appears in both number tiers", n);
    }
}

#[test]
fn letters_are_uppercase_alphabet() {
    let mut seen = HashSet::new();
    for l in LETTERS {
        assert!(seen.insert(*l), "duplicate letter '{}'", l);
        let c = l.chars().next().unwrap();
        assert!(c.is_ascii_uppercase(), "'{}' is not an uppercase letter", l);
    }
    assert_eq!(seen.len(), 26);
}

#[test]
fn whitelists_do_not_overlap() {
    let digits = charset::whitelist(Mode::Numbers);
    let letters = charset::whitelist(Mode::Letters);
    assert!(digits.chars().all(|c| !letters.contains(c)));
}

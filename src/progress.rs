//! Persistent per-character statistics and the cumulative score.

use std::collections::BTreeMap;

use crate::charset::{self, Mode};
use crate::error::Result;
use crate::storage::KeyValueStore;

pub const TOTAL_SCORE_KEY: &str = "dd_total_score";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreBook {
    numbers: BTreeMap<String, u32>,
    letters: BTreeMap<String, u32>,
    total: u64,
}

impl ScoreBook {
    /// Load all tables. Missing or malformed entries start from zero.
    pub fn load(store: &dyn KeyValueStore) -> ScoreBook {
        ScoreBook {
            numbers: load_table(store, Mode::Numbers),
            letters: load_table(store, Mode::Letters),
            total: load_total(store),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        for mode in [Mode::Numbers, Mode::Letters] {
            let raw = serde_json::to_string(self.table(mode))?;
            store.set(mode.storage_key(), &raw)?;
        }
        store.set(TOTAL_SCORE_KEY, &self.total.to_string())?;
        Ok(())
    }

    /// Wipe everything, in memory and in the store.
    pub fn reset(&mut self, store: &dyn KeyValueStore) -> Result<()> {
        *self = ScoreBook::default();
        for mode in [Mode::Numbers, Mode::Letters] {
            store.remove(mode.storage_key())?;
        }
        store.remove(TOTAL_SCORE_KEY)?;
        Ok(())
    }

    pub fn record_correct(&mut self, mode: Mode, target: &str) {
        let count = self.table_mut(mode).entry(target.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.total = self.total.saturating_add(1);
    }

    pub fn correct_for(&self, mode: Mode, target: &str) -> u32 {
        self.table(mode).get(target).copied().unwrap_or(0)
    }

    pub fn mode_total(&self, mode: Mode) -> u64 {
        self.table(mode).values().map(|&n| u64::from(n)).sum()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The 10..=20 range opens once numbers mode has `threshold` correct answers.
    pub fn extended_unlocked(&self, threshold: u32) -> bool {
        self.mode_total(Mode::Numbers) >= u64::from(threshold)
    }

    /// Rows for the stats panel, in prompt order, including untouched targets.
    pub fn summary(&self, mode: Mode) -> Vec<(&'static str, u32)> {
        charset::all_targets(mode)
            .into_iter()
            .map(|t| (t, self.correct_for(mode, t)))
            .collect()
    }

    fn table(&self, mode: Mode) -> &BTreeMap<String, u32> {
        match mode {
            Mode::Numbers => &self.numbers,
            Mode::Letters => &self.letters,
        }
    }

    fn table_mut(&mut self, mode: Mode) -> &mut BTreeMap<String, u32> {
        match mode {
            Mode::Numbers => &mut self.numbers,
            Mode::Letters => &mut self.letters,
        }
    }
}

fn load_table(store: &dyn KeyValueStore, mode: Mode) -> BTreeMap<String, u32> {
    let raw = match store.get(mode.storage_key()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return BTreeMap::new(),
        Err(e) => {
            log::warn!("reading {}: {e}", mode.storage_key());
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("discarding malformed {}: {e}", mode.storage_key());
        BTreeMap::new()
    })
}

fn load_total(store: &dyn KeyValueStore) -> u64 {
    match store.get(TOTAL_SCORE_KEY) {
        Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("discarding malformed {TOTAL_SCORE_KEY}: {raw:?}");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            log::warn!("reading {TOTAL_SCORE_KEY}: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn correct_answer_adds_exactly_one() {
        let mut book = ScoreBook::default();
        book.record_correct(Mode::Numbers, "7");
        assert_eq!(book.total(), 1);
        assert_eq!(book.correct_for(Mode::Numbers, "7"), 1);
        assert_eq!(book.correct_for(Mode::Numbers, "8"), 0);
        assert_eq!(book.correct_for(Mode::Letters, "7"), 0);
    }

    #[test]
    fn unlock_after_four_number_answers() {
        let mut book = ScoreBook::default();
        for t in ["1", "2", "3"] {
            book.record_correct(Mode::Numbers, t);
        }
        assert!(!book.extended_unlocked(4));
        book.record_correct(Mode::Letters, "A");
        assert!(!book.extended_unlocked(4), "letters must not count toward numbers");
        book.record_correct(Mode::Numbers, "3");
        assert!(book.extended_unlocked(4));
    }

    #[test]
    fn save_then_load_restores_tables() {
        let store = MemoryStore::new();
        let mut book = ScoreBook::default();
        book.record_correct(Mode::Numbers, "5");
        book.record_correct(Mode::Numbers, "5");
        book.record_correct(Mode::Letters, "Q");
        book.save(&store).unwrap();

        let loaded = ScoreBook::load(&store);
        assert_eq!(loaded, book);
        assert_eq!(store.get(TOTAL_SCORE_KEY).unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn malformed_entries_load_empty() {
        let store = MemoryStore::new();
        store.set(Mode::Numbers.storage_key(), "{not json").unwrap();
        store.set(TOTAL_SCORE_KEY, "lots").unwrap();
        store.set(Mode::Letters.storage_key(), r#"{"B":2}"#).unwrap();
        let book = ScoreBook::load(&store);
        assert_eq!(book.mode_total(Mode::Numbers), 0);
        assert_eq!(book.total(), 0);
        assert_eq!(book.correct_for(Mode::Letters, "B"), 2);
    }

    #[test]
    fn huge_stored_counts_do_not_overflow() {
        let store = MemoryStore::new();
        store
            .set(Mode::Numbers.storage_key(), r#"{"1":4294967295,"2":1}"#)
            .unwrap();
        store.set(TOTAL_SCORE_KEY, &u64::MAX.to_string()).unwrap();
        let mut book = ScoreBook::load(&store);
        assert_eq!(book.mode_total(Mode::Numbers), 4_294_967_296);
        assert!(book.extended_unlocked(4));

        book.record_correct(Mode::Numbers, "1");
        assert_eq!(book.correct_for(Mode::Numbers, "1"), u32::MAX);
        assert_eq!(book.total(), u64::MAX);
    }

    #[test]
    fn reset_clears_store() {
        let store = MemoryStore::new();
        let mut book = ScoreBook::default();
        book.record_correct(Mode::Numbers, "1");
        book.save(&store).unwrap();
        book.reset(&store).unwrap();
        assert_eq!(book.total(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn summary_lists_untouched_targets() {
        let mut book = ScoreBook::default();
        book.record_correct(Mode::Numbers, "9");
        let rows = book.summary(Mode::Numbers);
        assert_eq!(rows.len(), 21);
        assert_eq!(rows[0], ("1", 0));
        assert!(rows.contains(&("9", 1)));
    }
}

// Set-finder oracle: decides whether a group of cards satisfies the matching
// rule, and enumerates the matching groups within a collection.
//
// The engine only ever talks to the `SetFinder` trait. The board uses
// `test_set` to validate claims and `find_sets(cards, 1)` as an existence
// check; the dealer uses the same existence check over the deck to decide
// when the game is over.
//
// `FeatureSetFinder` implements the standard rule. A card id is read as
// `feature_count` digits in base `feature_size`; a group of `feature_size`
// distinct cards is a set when, for every feature, the cards' values are
// either all equal or all different. For `feature_size >= 3` the rule pins
// the last card of a set given the others, so enumeration walks
// `(feature_size - 1)`-combinations and looks the completing card up in a
// hash index instead of testing every full combination.

use rustc_hash::FxHashMap;

use crate::config::GameConfig;
use crate::types::CardId;

/// Matching-rule oracle. Implementations must be pure and cheap: they are
/// called synchronously from the dealer and from inside board operations.
pub trait SetFinder: Send + Sync {
    /// Up to `limit` sets drawn from `cards`. `limit == 1` is used purely as
    /// an existence check.
    fn find_sets(&self, cards: &[CardId], limit: usize) -> Vec<Vec<CardId>>;

    /// Whether `cards` forms a set.
    fn test_set(&self, cards: &[CardId]) -> bool;

    /// Feature values of a card, for hint output.
    fn card_features(&self, card: CardId) -> Vec<usize>;
}

/// The all-equal-or-all-different rule over base-`feature_size` digits.
#[derive(Clone, Debug)]
pub struct FeatureSetFinder {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureSetFinder {
    pub fn new(feature_size: usize, feature_count: usize) -> Self {
        Self {
            feature_size,
            feature_count,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.feature_size, config.feature_count)
    }

    fn feature(&self, card: CardId, index: usize) -> usize {
        let mut value = card.0;
        for _ in 0..index {
            value /= self.feature_size;
        }
        value % self.feature_size
    }

    /// The single card that turns `partial` (`feature_size - 1` cards) into
    /// a set, if the rule admits one.
    fn completing_card(&self, partial: &[CardId]) -> Option<CardId> {
        let mut id = 0;
        let mut place = 1;
        for index in 0..self.feature_count {
            let mut seen = vec![false; self.feature_size];
            let mut distinct = 0;
            for card in partial {
                let value = self.feature(*card, index);
                if !seen[value] {
                    seen[value] = true;
                    distinct += 1;
                }
            }
            let value = if distinct == 1 {
                self.feature(partial[0], index)
            } else if distinct == partial.len() {
                seen.iter().position(|s| !s)?
            } else {
                return None;
            };
            id += value * place;
            place *= self.feature_size;
        }
        Some(CardId(id))
    }

    /// Walk `(feature_size - 1)`-combinations of `cards` (by position) and
    /// collect every set whose completing card sits at a later position.
    fn collect_sets(
        &self,
        cards: &[CardId],
        positions: &FxHashMap<CardId, usize>,
        start: usize,
        partial: &mut Vec<CardId>,
        limit: usize,
        out: &mut Vec<Vec<CardId>>,
    ) {
        if out.len() >= limit {
            return;
        }
        if partial.len() == self.feature_size - 1 {
            let last = positions[&partial[partial.len() - 1]];
            if let Some(card) = self.completing_card(partial) {
                if positions.get(&card).is_some_and(|pos| *pos > last) {
                    let mut set = partial.clone();
                    set.push(card);
                    out.push(set);
                }
            }
            return;
        }
        for i in start..cards.len() {
            partial.push(cards[i]);
            self.collect_sets(cards, positions, i + 1, partial, limit, out);
            partial.pop();
            if out.len() >= limit {
                return;
            }
        }
    }
}

impl SetFinder for FeatureSetFinder {
    fn find_sets(&self, cards: &[CardId], limit: usize) -> Vec<Vec<CardId>> {
        let mut out = Vec::new();
        if limit == 0 || cards.len() < self.feature_size {
            return out;
        }

        // Two-valued features: any pair of distinct cards matches.
        if self.feature_size == 2 {
            for (i, a) in cards.iter().enumerate() {
                for b in &cards[i + 1..] {
                    if a != b {
                        out.push(vec![*a, *b]);
                        if out.len() >= limit {
                            return out;
                        }
                    }
                }
            }
            return out;
        }

        let mut positions = FxHashMap::default();
        for (i, card) in cards.iter().enumerate() {
            positions.entry(*card).or_insert(i);
        }
        let mut partial = Vec::with_capacity(self.feature_size);
        self.collect_sets(cards, &positions, 0, &mut partial, limit, &mut out);
        out
    }

    fn test_set(&self, cards: &[CardId]) -> bool {
        if cards.len() != self.feature_size {
            return false;
        }
        for (i, card) in cards.iter().enumerate() {
            if cards[i + 1..].contains(card) {
                return false;
            }
        }
        (0..self.feature_count).all(|index| {
            let first = self.feature(cards[0], index);
            let all_same = cards.iter().all(|c| self.feature(*c, index) == first);
            let mut seen = vec![false; self.feature_size];
            let all_different = cards.iter().all(|c| {
                let value = self.feature(*c, index);
                !std::mem::replace(&mut seen[value], true)
            });
            all_same || all_different
        })
    }

    fn card_features(&self, card: CardId) -> Vec<usize> {
        (0..self.feature_count)
            .map(|index| self.feature(card, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[usize]) -> Vec<CardId> {
        ids.iter().map(|id| CardId(*id)).collect()
    }

    fn classic() -> FeatureSetFinder {
        FeatureSetFinder::new(3, 4)
    }

    #[test]
    fn features_are_base_digits() {
        // 5 = 2 + 1*3 -> [2, 1, 0, 0]
        assert_eq!(classic().card_features(CardId(5)), vec![2, 1, 0, 0]);
        assert_eq!(classic().card_features(CardId(80)), vec![2, 2, 2, 2]);
    }

    #[test]
    fn all_same_or_all_different_is_a_set() {
        let finder = classic();
        // [0,0,0,0], [1,0,0,0], [2,0,0,0]
        assert!(finder.test_set(&cards(&[0, 1, 2])));
        // [0,0,0,0], [1,1,1,1], [2,2,2,2]
        assert!(finder.test_set(&cards(&[0, 40, 80])));
        // [0,0,0,0], [1,0,0,0], [1,1,0,0]: feature 0 is two-and-one.
        assert!(!finder.test_set(&cards(&[0, 1, 4])));
    }

    #[test]
    fn test_set_rejects_wrong_size_and_duplicates() {
        let finder = classic();
        assert!(!finder.test_set(&cards(&[0, 1])));
        assert!(!finder.test_set(&cards(&[0, 0, 0])));
        assert!(!finder.test_set(&cards(&[0, 1, 2, 3])));
    }

    #[test]
    fn find_sets_agrees_with_test_set() {
        let finder = classic();
        let table = cards(&[0, 1, 2, 4, 40, 80, 13, 26, 7]);
        let sets = finder.find_sets(&table, usize::MAX);
        assert!(!sets.is_empty());
        for set in &sets {
            assert!(finder.test_set(set), "{set:?} is not a set");
        }

        // Brute force count for comparison.
        let mut expected = 0;
        for a in 0..table.len() {
            for b in a + 1..table.len() {
                for c in b + 1..table.len() {
                    if finder.test_set(&[table[a], table[b], table[c]]) {
                        expected += 1;
                    }
                }
            }
        }
        assert_eq!(sets.len(), expected);
    }

    #[test]
    fn limit_bounds_the_result() {
        let finder = classic();
        let deck: Vec<CardId> = (0..81).map(CardId).collect();
        assert_eq!(finder.find_sets(&deck, 1).len(), 1);
        assert_eq!(finder.find_sets(&deck, 5).len(), 5);
        // 81 * 80 / 6 sets in the full deck.
        assert_eq!(finder.find_sets(&deck, usize::MAX).len(), 1080);
    }

    #[test]
    fn cap_set_has_no_sets() {
        // 3 values, 2 features: ids 0,1,3,4 are (0,0),(1,0),(0,1),(1,1).
        let finder = FeatureSetFinder::new(3, 2);
        assert!(finder.find_sets(&cards(&[0, 1, 3, 4]), 1).is_empty());
        assert!(finder.find_sets(&cards(&[0, 1]), 1).is_empty());
    }

    #[test]
    fn four_valued_features() {
        let finder = FeatureSetFinder::new(4, 2);
        // (0,0),(1,0),(2,0),(3,0)
        assert!(finder.test_set(&cards(&[0, 1, 2, 3])));
        let deck: Vec<CardId> = (0..16).map(CardId).collect();
        for set in finder.find_sets(&deck, usize::MAX) {
            assert!(finder.test_set(&set));
        }
    }

    #[test]
    fn two_valued_features_match_any_pair() {
        let finder = FeatureSetFinder::new(2, 3);
        assert!(finder.test_set(&cards(&[0, 7])));
        assert_eq!(finder.find_sets(&cards(&[0, 3, 5]), usize::MAX).len(), 3);
    }
}

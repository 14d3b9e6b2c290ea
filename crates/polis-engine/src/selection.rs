//! Option selection — weighted multi-choice outcomes and their significant
//! minority.
//!
//! A voter who picks `k` options gives `1/k` to each, so every voter's total
//! influence is 1 however many options they pick. Summed weights are
//! expressed as a percentage of all eligible voters.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::thresholds::Thresholds;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only the heaviest option can win; an exact tie for the lead means
    /// no winner.
    Single,
    /// Every option reaching the vote threshold wins.
    Multi,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub selected: Vec<Uuid>,
    pub minority: Vec<Uuid>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn has_minority(&self) -> bool {
        !self.minority.is_empty()
    }
}

/// Per-option weight, each voter's picks summing to 1. Repeated picks of
/// the same option by one voter count once.
pub fn weigh<'a, I>(picks: I) -> BTreeMap<Uuid, f64>
where
    I: IntoIterator<Item = &'a [Uuid]>,
{
    let mut weights = BTreeMap::new();
    for voter_picks in picks {
        let distinct: BTreeSet<Uuid> = voter_picks.iter().copied().collect();
        if distinct.is_empty() {
            continue;
        }
        let share = 1.0 / distinct.len() as f64;
        for option in distinct {
            *weights.entry(option).or_insert(0.0) += share;
        }
    }
    weights
}

pub fn percent_of(weight: f64, eligible: usize) -> f64 {
    if eligible == 0 {
        0.0
    } else {
        weight * 100.0 / eligible as f64
    }
}

fn reaches(weight: f64, eligible: usize, threshold: i32) -> bool {
    weight > EPSILON && percent_of(weight, eligible) + EPSILON >= threshold as f64
}

/// Heaviest option; among equals the first in id order.
fn leader(weights: &BTreeMap<Uuid, f64>) -> Option<(Uuid, f64)> {
    weights
        .iter()
        .fold(None, |best: Option<(Uuid, f64)>, (&id, &weight)| match best {
            Some((_, top)) if top + EPSILON >= weight => best,
            _ => Some((id, weight)),
        })
}

fn is_tied_lead(weights: &BTreeMap<Uuid, f64>, lead: Uuid, lead_weight: f64) -> bool {
    weights
        .iter()
        .any(|(&id, &weight)| id != lead && (weight - lead_weight).abs() <= EPSILON)
}

/// Resolve the winners and the significant minority among `picks`, one
/// entry per eligible voter (an empty entry for voters who picked nothing).
pub fn select(picks: &[Vec<Uuid>], thresholds: &Thresholds, mode: SelectionMode) -> Selection {
    let eligible = picks.len();
    let weights = weigh(picks.iter().map(Vec::as_slice));

    let selected: Vec<Uuid> = match mode {
        SelectionMode::Multi => weights
            .iter()
            .filter(|&(_, &weight)| reaches(weight, eligible, thresholds.vote))
            .map(|(&id, _)| id)
            .collect(),
        SelectionMode::Single => match leader(&weights) {
            Some((lead, weight))
                if !is_tied_lead(&weights, lead, weight)
                    && reaches(weight, eligible, thresholds.vote) =>
            {
                vec![lead]
            }
            _ => Vec::new(),
        },
    };

    let minority = minority(picks, &selected, thresholds.significant_minority);
    Selection { selected, minority }
}

/// Options backed by a significant share of the voters who supported none
/// of the winners, measured against all eligible voters. Without winners
/// the whole pool counts.
fn minority(picks: &[Vec<Uuid>], selected: &[Uuid], threshold: i32) -> Vec<Uuid> {
    let eligible = picks.len();
    let pool = picks
        .iter()
        .filter(|voter_picks| !voter_picks.iter().any(|id| selected.contains(id)))
        .map(Vec::as_slice);

    weigh(pool)
        .into_iter()
        .filter(|(id, weight)| !selected.contains(id) && reaches(*weight, eligible, threshold))
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(vote: i32, significant_minority: i32) -> Thresholds {
        Thresholds {
            vote,
            significant_minority,
            ..Default::default()
        }
    }

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::now_v7()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_voter_weight_sums_to_one() {
        let options = ids(3);
        let weights = weigh([options.as_slice()]);
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(weights.values().all(|w| (w - 1.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_duplicate_picks_count_once() {
        let options = ids(2);
        let picks = vec![options[0], options[0], options[1]];
        let weights = weigh([picks.as_slice()]);
        assert!((weights[&options[0]] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_select_below_threshold_selects_nothing() {
        let options = ids(2);
        // 11 of 20 voters back the leader: 55% against a 60% threshold.
        let mut picks = vec![vec![options[0]]; 11];
        picks.extend(vec![vec![options[1]]; 9]);
        let selection = select(&picks, &thresholds(60, 100), SelectionMode::Single);
        assert!(selection.selected.is_empty());
    }

    #[test]
    fn test_multi_select_has_no_winner_cap() {
        let options = ids(3);
        let picks = vec![
            vec![options[0]],
            vec![options[1]],
            vec![options[0], options[1]],
            vec![options[2]],
        ];
        // weights: 1.5, 1.5, 1.0 over 4 voters -> 37.5%, 37.5%, 25%
        let selection = select(&picks, &thresholds(30, 20), SelectionMode::Multi);
        assert_eq!(selection.selected, vec![options[0], options[1]]);
        assert_eq!(selection.minority, vec![options[2]]);
    }

    #[test]
    fn test_minority_counts_only_non_supporters() {
        let options = ids(2);
        let picks = vec![
            vec![options[0]],
            vec![options[0]],
            vec![options[0], options[1]],
            vec![options[1]],
        ];
        // The third voter backed the winner, so only the fourth voter's
        // weight counts for the minority: 25%.
        let selection = select(&picks, &thresholds(50, 30), SelectionMode::Single);
        assert_eq!(selection.selected, vec![options[0]]);
        assert!(!selection.has_minority());

        let selection = select(&picks, &thresholds(50, 25), SelectionMode::Single);
        assert_eq!(selection.minority, vec![options[1]]);
    }

    #[test]
    fn test_exact_tie_has_no_winner() {
        let candidates = ids(2);
        let picks = vec![
            vec![candidates[0]],
            vec![candidates[0]],
            vec![candidates[1]],
            vec![candidates[1]],
        ];
        let selection = select(&picks, &thresholds(50, 100), SelectionMode::Single);
        assert!(selection.selected.is_empty());

        // Both tied options stay visible as minority positions.
        let selection = select(&picks, &thresholds(50, 50), SelectionMode::Single);
        assert_eq!(selection.minority, candidates);

        let mut picks = picks;
        picks.push(vec![candidates[1]]);
        let selection = select(&picks, &thresholds(50, 100), SelectionMode::Single);
        assert_eq!(selection.selected, vec![candidates[1]]);
    }

    #[test]
    fn test_minority_over_full_pool_without_winners() {
        let options = ids(2);
        let picks = vec![vec![options[0]], vec![options[1]], vec![], vec![]];
        let selection = select(&picks, &thresholds(60, 25), SelectionMode::Multi);
        assert!(selection.selected.is_empty());
        assert_eq!(selection.minority, options);
    }

    #[test]
    fn test_no_eligible_voters() {
        let selection = select(&[], &thresholds(0, 0), SelectionMode::Multi);
        assert_eq!(selection, Selection::default());
    }
}

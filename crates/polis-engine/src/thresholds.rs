//! Threshold aggregation — a community's quorum, vote, significant-minority
//! and timing parameters as the median of its active members' preferences.
//!
//! The median (not the mean) keeps a small bloc of extreme values from
//! dominating. With an even count the two central values are averaged and
//! rounded half-up. A community without active members gets all zeros.

use polis_common::error::PolisResult;
use polis_common::models::{CommunitySettings, UserCommunitySettings};
use polis_common::store::Store;
use polis_common::validation::validate_model;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Thresholds {
    pub quorum: i32,
    pub vote: i32,
    pub significant_minority: i32,
    pub decision_delay: i32,
    pub dispute_time_limit: i32,
}

/// Preference rows that count towards consolidation: unblocked rows whose
/// values pass validation. Invalid rows are logged and left out.
pub fn eligible_preferences(preferences: &[UserCommunitySettings]) -> Vec<&UserCommunitySettings> {
    preferences
        .iter()
        .filter(|prefs| !prefs.is_blocked)
        .filter(|prefs| match validate_model(*prefs) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    user_id = %prefs.user_id,
                    community_id = %prefs.community_id,
                    "Ignoring member preferences in consolidation: {e}"
                );
                false
            }
        })
        .collect()
}

impl Thresholds {
    /// Aggregate over preference rows. Blocked rows and rows with
    /// out-of-range values are left out.
    pub fn from_preferences(preferences: &[UserCommunitySettings]) -> Self {
        Self::from_eligible(&eligible_preferences(preferences))
    }

    /// Aggregate over rows already filtered by [`eligible_preferences`].
    pub fn from_eligible(eligible: &[&UserCommunitySettings]) -> Self {
        let column = |field: fn(&UserCommunitySettings) -> i32| {
            median(&eligible.iter().map(|prefs| field(prefs)).collect::<Vec<_>>())
        };

        Self {
            quorum: column(|p| p.quorum),
            vote: column(|p| p.vote),
            significant_minority: column(|p| p.significant_minority),
            decision_delay: column(|p| p.decision_delay),
            dispute_time_limit: column(|p| p.dispute_time_limit),
        }
    }

    pub fn from_settings(settings: &CommunitySettings) -> Self {
        Self {
            quorum: settings.quorum,
            vote: settings.vote,
            significant_minority: settings.significant_minority,
            decision_delay: settings.decision_delay,
            dispute_time_limit: settings.dispute_time_limit,
        }
    }

    pub fn apply_to(&self, settings: &mut CommunitySettings) {
        settings.quorum = self.quorum;
        settings.vote = self.vote;
        settings.significant_minority = self.significant_minority;
        settings.decision_delay = self.decision_delay;
        settings.dispute_time_limit = self.dispute_time_limit;
    }
}

/// Compute the live thresholds of a community.
pub async fn aggregate<S: Store + ?Sized>(
    store: &mut S,
    community_id: Uuid,
) -> PolisResult<Thresholds> {
    let preferences = store.list_member_settings(community_id).await?;
    Ok(Thresholds::from_preferences(&preferences))
}

/// Median of `values`, `0` for an empty slice.
pub fn median(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        round_half_up((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    }
}

pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(quorum: i32, vote: i32, minority: i32) -> UserCommunitySettings {
        let settings = CommunitySettings::empty(Uuid::now_v7(), Uuid::now_v7());
        let mut row = UserCommunitySettings::seeded_from(Uuid::now_v7(), Uuid::now_v7(), &settings);
        row.quorum = quorum;
        row.vote = vote;
        row.significant_minority = minority;
        row
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[]), 0);
        assert_eq!(median(&[7]), 7);
        assert_eq!(median(&[90, 10, 50]), 50);
        assert_eq!(median(&[10, 20, 30, 40]), 25);
        // 50.5 rounds half-up
        assert_eq!(median(&[50, 51]), 51);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-1.5), -1);
    }

    #[test]
    fn test_extremes_do_not_dominate() {
        let rows = vec![prefs(50, 50, 10), prefs(55, 60, 10), prefs(100, 100, 100)];
        let thresholds = Thresholds::from_preferences(&rows);
        assert_eq!(thresholds.quorum, 55);
        assert_eq!(thresholds.vote, 60);
        assert_eq!(thresholds.significant_minority, 10);
    }

    #[test]
    fn test_blocked_and_invalid_rows_are_excluded() {
        let mut blocked = prefs(100, 100, 100);
        blocked.is_blocked = true;
        let invalid = prefs(250, 100, 100);
        let rows = vec![prefs(40, 60, 20), blocked, invalid];
        let thresholds = Thresholds::from_preferences(&rows);
        assert_eq!(thresholds.quorum, 40);
        assert_eq!(thresholds.vote, 60);
    }

    #[test]
    fn test_no_active_members_is_all_zero() {
        let mut blocked = prefs(60, 60, 20);
        blocked.is_blocked = true;
        assert_eq!(Thresholds::from_preferences(&[blocked]), Thresholds::default());
    }
}

//! The closed set of AI-operation quotas (spec §4.3).

use chrono::{DateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// A quota kind, its reset cadence, and its per-period limit.
///
/// This is a closed enum per spec §4.3 ("the set of quota kinds is fixed at
/// three") rather than an open string, so a caller can never accidentally
/// check a quota that doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaKind {
    AiRecipeGeneration,
    AiNutritionAdvice,
    PoseAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCadence {
    Daily,
    WeeklyMonday,
}

impl QuotaKind {
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::AiRecipeGeneration, Self::AiNutritionAdvice, Self::PoseAnalysis]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AiRecipeGeneration => "AI_RECIPE_GENERATION",
            Self::AiNutritionAdvice => "AI_NUTRITION_ADVICE",
            Self::PoseAnalysis => "POSE_ANALYSIS",
        }
    }

    /// spec §4.3 default limits, per period.
    #[must_use]
    pub const fn default_limit(self) -> u32 {
        match self {
            Self::AiRecipeGeneration => 10,
            Self::AiNutritionAdvice => 5,
            Self::PoseAnalysis => 20,
        }
    }

    #[must_use]
    pub const fn cadence(self) -> ResetCadence {
        match self {
            Self::AiRecipeGeneration | Self::PoseAnalysis => ResetCadence::Daily,
            Self::AiNutritionAdvice => ResetCadence::WeeklyMonday,
        }
    }

    /// Calendar window containing `now`, aligned to the user's local
    /// timezone midnight (spec §4.3: windows reset at local midnight, not a
    /// rolling 24h/7d period, so a user who never uses the feature still
    /// resets exactly at midnight in their zone).
    #[must_use]
    pub fn window_containing(self, now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let local = now.with_timezone(&tz);
        let today_midnight = local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time");

        let window_start_local = match self.cadence() {
            ResetCadence::Daily => today_midnight,
            ResetCadence::WeeklyMonday => {
                let days_since_monday = local.weekday().num_days_from_monday();
                today_midnight - chrono::Duration::days(i64::from(days_since_monday))
            }
        };

        let window_start = tz
            .from_local_datetime(&window_start_local)
            .single()
            .unwrap_or_else(|| tz.from_utc_datetime(&window_start_local));

        let window_end = match self.cadence() {
            ResetCadence::Daily => window_start + chrono::Duration::days(1),
            ResetCadence::WeeklyMonday => window_start + chrono::Duration::days(7),
        };

        debug_assert_eq!(window_start.weekday(), Weekday::Mon, "weekly windows start on Monday")
            ;

        (window_start.with_timezone(&Utc), window_end.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn daily_window_spans_local_midnight_to_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 7, 30, 18, 0, 0).unwrap();
        let (start, end) = QuotaKind::PoseAnalysis.window_containing(now, chrono_tz::UTC);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 30, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_window_always_starts_on_monday() {
        // 2026-07-30 is a Thursday.
        let now = Utc.with_ymd_and_hms(2026, 7, 30, 12, 0, 0).unwrap();
        let (start, end) = QuotaKind::AiNutritionAdvice.window_containing(now, chrono_tz::UTC);
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!(end - start, chrono::Duration::days(7));
        assert!(start <= now && now < end);
    }

    #[test]
    fn window_respects_non_utc_timezone() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 2, 30, 0).unwrap(); // 22:30 previous day in NY
        let (start, _) = QuotaKind::PoseAnalysis.window_containing(now, New_York);
        let local_start = start.with_timezone(&New_York);
        assert_eq!(local_start.hour(), 0);
        assert_eq!(local_start.date_naive(), now.with_timezone(&New_York).date_naive());
    }
}

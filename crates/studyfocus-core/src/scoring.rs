//! Session scoring engine.
//!
//! Converts one finished focus session into a point value:
//!
//! ```text
//! minutes     = max(1, ceil(seconds / 60))
//! scored_base = max(1, minutes * 5 - min(pauses, 100) * 2)
//! multiplier  = 1 + quality - mistakes + writing + habits
//! points      = max(1, round(scored_base * multiplier))
//! ```
//!
//! | Term | Range | Source |
//! |------|-------|--------|
//! | quality | 0.0 ..= 0.4 | `(rating - 1) * 0.1`, rating clamped to 1..=5, default 3 |
//! | mistakes | 0.0 ..= 0.3 | `mistakes * 0.05`, capped |
//! | writing | 0.0 ..= 0.3 | `stars * 0.1`, stars clamped to 0..=3 |
//! | habits | 0.0 ..= 0.3 | 0.1 per review / fix / preview check |
//!
//! Every input is clamped or defaulted, so scoring never fails.

use serde::{Deserialize, Serialize};

use crate::models::RecordEntry;

const POINTS_PER_MINUTE: f64 = 5.0;
const PAUSE_PENALTY: f64 = 2.0;
const MAX_PENALIZED_PAUSES: i64 = 100;
const DEFAULT_RATING: f64 = 3.0;
const MISTAKE_PENALTY_STEP: f64 = 0.05;
const MAX_MISTAKE_PENALTY: f64 = 0.3;
const MAX_WRITING_STARS: i64 = 3;
const BONUS_STEP: f64 = 0.1;

/// Inputs for scoring one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringInput {
    /// Elapsed focus time in seconds.
    pub seconds: f64,
    pub pause_count: i64,
    /// Self-rated quality, 1..=5. Defaults to 3.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub mistake_count: Option<i64>,
    /// Handwriting practice stars, 0..=3.
    #[serde(default)]
    pub writing_stars: Option<i64>,
    #[serde(default)]
    pub review_checked: bool,
    #[serde(default)]
    pub fix_checked: bool,
    #[serde(default)]
    pub preview_checked: bool,
}

impl ScoringInput {
    /// Time and pauses only; quality signals take their defaults.
    pub fn new(seconds: f64, pause_count: i64) -> Self {
        Self {
            seconds,
            pause_count,
            ..Self::default()
        }
    }

    /// Time and pauses plus the quality signals captured in a record.
    pub fn from_record(seconds: f64, pause_count: i64, record: &RecordEntry) -> Self {
        Self {
            seconds,
            pause_count,
            rating: Some(f64::from(record.rating)),
            mistake_count: Some(i64::from(record.mistake_count)),
            writing_stars: Some(i64::from(record.writing_stars)),
            review_checked: record.review_checked,
            fix_checked: record.fix_checked,
            preview_checked: record.preview_checked,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_mistakes(mut self, mistake_count: i64) -> Self {
        self.mistake_count = Some(mistake_count);
        self
    }

    pub fn with_writing_stars(mut self, stars: i64) -> Self {
        self.writing_stars = Some(stars);
        self
    }

    pub fn with_habits(mut self, review: bool, fix: bool, preview: bool) -> Self {
        self.review_checked = review;
        self.fix_checked = fix;
        self.preview_checked = preview;
        self
    }
}

/// Every intermediate term of a score, for explaining it to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub minutes: f64,
    pub base: f64,
    pub pause_penalty: f64,
    pub quality_bonus: f64,
    pub mistake_penalty: f64,
    pub writing_bonus: f64,
    pub habit_bonus: f64,
    pub multiplier: f64,
    pub scored_base: f64,
    pub points: u32,
}

/// Compute all scoring terms for `input`.
pub fn score_breakdown(input: &ScoringInput) -> ScoreBreakdown {
    // Non-finite time scores as one minute.
    let minutes = if input.seconds.is_finite() {
        (input.seconds / 60.0).ceil().max(1.0)
    } else {
        1.0
    };
    let base = minutes * POINTS_PER_MINUTE;

    let capped_pauses = input.pause_count.clamp(0, MAX_PENALIZED_PAUSES);
    let pause_penalty = capped_pauses as f64 * PAUSE_PENALTY;

    let rating = input.rating.filter(|r| !r.is_nan()).unwrap_or(DEFAULT_RATING);
    let quality_bonus = (rating.clamp(1.0, 5.0) - 1.0) * BONUS_STEP;

    let mistakes = input.mistake_count.unwrap_or(0).max(0);
    let mistake_penalty = (mistakes as f64 * MISTAKE_PENALTY_STEP).min(MAX_MISTAKE_PENALTY);

    let stars = input.writing_stars.unwrap_or(0).clamp(0, MAX_WRITING_STARS);
    let writing_bonus = stars as f64 * BONUS_STEP;

    let habits = [input.review_checked, input.fix_checked, input.preview_checked]
        .iter()
        .filter(|checked| **checked)
        .count();
    let habit_bonus = habits as f64 * BONUS_STEP;

    let multiplier = 1.0 + quality_bonus - mistake_penalty + writing_bonus + habit_bonus;
    let scored_base = (base - pause_penalty).max(1.0);
    let points = (scored_base * multiplier).round().max(1.0);

    ScoreBreakdown {
        minutes,
        base,
        pause_penalty,
        quality_bonus,
        mistake_penalty,
        writing_bonus,
        habit_bonus,
        multiplier,
        scored_base,
        points: points.min(u32::MAX as f64) as u32,
    }
}

/// Points for one completed session. Always at least 1.
pub fn calculate_session_points(input: &ScoringInput) -> u32 {
    score_breakdown(input).points
}

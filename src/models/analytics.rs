// src/models/analytics.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::exercise::Difficulty;
use crate::models::progress::AttemptStatus;

/// Granularity for the performance trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPeriod {
    #[default]
    Day,
    Week,
}

/// One progress row joined with its exercise, the input unit of the
/// analytics aggregator.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    pub status: AttemptStatus,
    pub score: Option<f64>,
    pub max_score: f64,
    pub requires_manual_grading: bool,
    pub time_spent_seconds: i64,
    pub subject: String,
    pub difficulty: Difficulty,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Headline metrics over one filtered set of attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_attempts: u64,
    pub completed_attempts: u64,
    pub in_progress_attempts: u64,
    /// Percentage of attempts in a terminal state, 0 for an empty set.
    pub completion_rate: f64,
    /// Mean percentage score over auto-graded terminal attempts.
    /// `None` when there is nothing scorable (empty set, or everything
    /// pending manual grading).
    pub average_score: Option<f64>,
    pub total_time_spent_seconds: i64,
}

/// Fixed score buckets over the percentage of max score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreDistribution {
    #[serde(rename = "90-100")]
    pub range_90_100: u64,
    #[serde(rename = "80-89")]
    pub range_80_89: u64,
    #[serde(rename = "70-79")]
    pub range_70_79: u64,
    #[serde(rename = "60-69")]
    pub range_60_69: u64,
    #[serde(rename = "below-60")]
    pub below_60: u64,
}

/// Per-group metrics for subject/difficulty breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub total_attempts: u64,
    pub completed_attempts: u64,
    pub completion_rate: f64,
    pub average_score: Option<f64>,
}

/// One point of the time-ordered performance trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Start of the bucket (date for `Day`, Monday of the week for `Week`),
    /// formatted YYYY-MM-DD.
    pub period: String,
    pub average_score: f64,
    pub completed_attempts: u64,
}

/// A point-in-time aggregate over a filtered set of progress records.
/// Recomputed on demand; never the system of record.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    pub summary: AnalyticsSummary,
    pub score_distribution: ScoreDistribution,
    pub subject_breakdown: BTreeMap<String, GroupStats>,
    pub difficulty_breakdown: BTreeMap<String, GroupStats>,
    pub performance_trend: Vec<TrendPoint>,
}

/// Query parameters for the dashboard endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct DashboardParams {
    pub course_id: Option<i64>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub group_by: Option<TrendPeriod>,
}

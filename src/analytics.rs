// src/analytics.rs
//
// Pure aggregation over (progress x exercise) rows. Handlers fetch one
// consistent set of rows and derive everything here; nothing in this module
// touches the database, so a snapshot is always recomputable from scratch.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::analytics::{
    AnalyticsSnapshot, AnalyticsSummary, AttemptRow, GroupStats, ScoreDistribution, TrendPeriod,
    TrendPoint,
};
use crate::scoring::round2;

/// Computes a full snapshot over a filtered set of attempts.
///
/// Conventions (documented policy, held by the tests):
/// * rates are percentages rounded to 2 decimals, 0 for an empty set;
/// * scores are normalized to percent-of-max before averaging/bucketing;
/// * attempts pending manual grading count toward completion but are
///   excluded from every score average and from the distribution;
/// * `average_score` is `None` (JSON null) when nothing is scorable.
pub fn aggregate(rows: &[AttemptRow], period: TrendPeriod) -> AnalyticsSnapshot {
    let summary = summarize(rows);
    let score_distribution = distribution(rows);

    let mut subject_breakdown: BTreeMap<String, Vec<&AttemptRow>> = BTreeMap::new();
    let mut difficulty_breakdown: BTreeMap<String, Vec<&AttemptRow>> = BTreeMap::new();
    for row in rows {
        subject_breakdown
            .entry(row.subject.clone())
            .or_default()
            .push(row);
        difficulty_breakdown
            .entry(row.difficulty.as_str().to_string())
            .or_default()
            .push(row);
    }

    AnalyticsSnapshot {
        summary,
        score_distribution,
        subject_breakdown: group_stats(subject_breakdown),
        difficulty_breakdown: group_stats(difficulty_breakdown),
        performance_trend: trend(rows, period),
    }
}

/// Percentage score of a terminal, auto-graded attempt.
fn scorable_percentage(row: &AttemptRow) -> Option<f64> {
    if !row.status.is_terminal() || row.requires_manual_grading || row.max_score <= 0.0 {
        return None;
    }
    row.score.map(|s| s / row.max_score * 100.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

fn summarize(rows: &[AttemptRow]) -> AnalyticsSummary {
    let total_attempts = rows.len() as u64;
    let completed_attempts = rows.iter().filter(|r| r.status.is_terminal()).count() as u64;
    let in_progress_attempts = total_attempts - completed_attempts;

    let completion_rate = if total_attempts > 0 {
        round2(completed_attempts as f64 / total_attempts as f64 * 100.0)
    } else {
        0.0
    };

    let percentages: Vec<f64> = rows.iter().filter_map(scorable_percentage).collect();

    AnalyticsSummary {
        total_attempts,
        completed_attempts,
        in_progress_attempts,
        completion_rate,
        average_score: mean(&percentages),
        total_time_spent_seconds: rows.iter().map(|r| r.time_spent_seconds).sum(),
    }
}

fn distribution(rows: &[AttemptRow]) -> ScoreDistribution {
    let mut dist = ScoreDistribution::default();
    for pct in rows.iter().filter_map(scorable_percentage) {
        if pct >= 90.0 {
            dist.range_90_100 += 1;
        } else if pct >= 80.0 {
            dist.range_80_89 += 1;
        } else if pct >= 70.0 {
            dist.range_70_79 += 1;
        } else if pct >= 60.0 {
            dist.range_60_69 += 1;
        } else {
            dist.below_60 += 1;
        }
    }
    dist
}

fn group_stats(groups: BTreeMap<String, Vec<&AttemptRow>>) -> BTreeMap<String, GroupStats> {
    groups
        .into_iter()
        .map(|(key, rows)| {
            let total = rows.len() as u64;
            let completed = rows.iter().filter(|r| r.status.is_terminal()).count() as u64;
            let percentages: Vec<f64> = rows
                .iter()
                .filter_map(|r| scorable_percentage(r))
                .collect();
            let stats = GroupStats {
                total_attempts: total,
                completed_attempts: completed,
                completion_rate: if total > 0 {
                    round2(completed as f64 / total as f64 * 100.0)
                } else {
                    0.0
                },
                average_score: mean(&percentages),
            };
            (key, stats)
        })
        .collect()
}

/// Maps a completion date to its bucket start.
fn bucket_start(date: NaiveDate, period: TrendPeriod) -> NaiveDate {
    match period {
        TrendPeriod::Day => date,
        TrendPeriod::Week => {
            date - Duration::days(date.weekday().num_days_from_monday() as i64)
        }
    }
}

fn trend(rows: &[AttemptRow], period: TrendPeriod) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let (Some(pct), Some(completed_at)) = (scorable_percentage(row), row.completed_at)
        else {
            continue;
        };
        buckets
            .entry(bucket_start(completed_at.date_naive(), period))
            .or_default()
            .push(pct);
    }

    buckets
        .into_iter()
        .map(|(start, percentages)| TrendPoint {
            period: start.format("%Y-%m-%d").to_string(),
            average_score: mean(&percentages).unwrap_or(0.0),
            completed_attempts: percentages.len() as u64,
        })
        .collect()
}

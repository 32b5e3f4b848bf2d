//! Best-set trend per exercise

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregator::ExerciseHistory;
use super::predictor::TrendLine;
use crate::config::AnalysisConfig;

/// Deltas smaller than this are treated as no change
const DELTA_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Plateaued,
    InsufficientData,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Plateaued => "plateaued",
            Trend::InsufficientData => "insufficient-data",
        }
    }
}

/// What the trend is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMetric {
    /// Heaviest qualifying set, kg
    Weight,
    /// Most reps in a set (bodyweight-only exercises)
    Reps,
}

/// Best set of one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgression {
    pub exercise: String,
    pub metric: ProgressMetric,
    /// Sessions the exercise appears in
    pub sessions: usize,
    /// Best set per chronologically distinct session
    pub points: Vec<ProgressPoint>,
    pub first: Option<f64>,
    pub latest: Option<f64>,
    pub delta: Option<f64>,
    pub trend: Trend,
    pub personal_best: Option<f64>,
    pub avg_weight_kg: Option<f64>,
    pub avg_reps: Option<f64>,
    /// Least-squares change per week (3+ points)
    pub weekly_rate: Option<f64>,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { None } else { Some(sum / count as f64) }
}

/// Compute the progression of one aggregated exercise
pub fn analyze_exercise(history: &ExerciseHistory, config: &AnalysisConfig) -> ExerciseProgression {
    let metric = if history.sets.iter().any(|s| s.set.weight_kg.is_some()) {
        ProgressMetric::Weight
    } else {
        ProgressMetric::Reps
    };

    let per_session = history.by_session();

    let mut points: Vec<ProgressPoint> = Vec::new();
    for session in &per_session {
        let best = session
            .sets
            .iter()
            .filter(|s| s.reps.unwrap_or(0) >= config.min_reps)
            .filter_map(|s| match metric {
                ProgressMetric::Weight => s.weight_kg,
                ProgressMetric::Reps => s.reps.map(f64::from),
            })
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

        let Some(value) = best else { continue };

        // Sessions sharing a start time are one point in time
        match points.last_mut() {
            Some(last) if last.at == session.started_at => last.value = last.value.max(value),
            _ => points.push(ProgressPoint { at: session.started_at, value }),
        }
    }

    let first = points.first().map(|p| p.value);
    let latest = points.last().map(|p| p.value);

    let (delta, trend) = match (first, latest) {
        (Some(f), Some(l)) if points.len() >= 2 => {
            let delta = l - f;
            let trend = if delta > DELTA_EPSILON {
                Trend::Increasing
            } else if delta < -DELTA_EPSILON {
                Trend::Decreasing
            } else if points.len() >= config.plateau_threshold {
                Trend::Plateaued
            } else {
                Trend::InsufficientData
            };
            (Some(delta), trend)
        }
        _ => (None, Trend::InsufficientData),
    };

    let personal_best = points.iter().map(|p| p.value).reduce(f64::max);

    let weekly_rate = TrendLine::fit(&points.iter().map(|p| (p.at, p.value)).collect::<Vec<_>>())
        .map(|line| line.weekly_rate());

    ExerciseProgression {
        exercise: history.name.clone(),
        metric,
        sessions: per_session.len(),
        points,
        first,
        latest,
        delta,
        trend,
        personal_best,
        avg_weight_kg: mean(history.sets.iter().filter_map(|s| s.set.weight_kg)),
        avg_reps: mean(history.sets.iter().filter_map(|s| s.set.reps.map(f64::from))),
        weekly_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::models::{ExerciseEntry, Session, SetRecord};
    use chrono::{Duration, TimeZone};

    fn create_session(id: &str, days: i64, exercise: &str, sets: Vec<SetRecord>) -> Session {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap() + Duration::days(days);
        Session::new(id, start, vec![ExerciseEntry::new(exercise, sets)])
    }

    fn progression_of(sessions: &[Session], config: &AnalysisConfig) -> ExerciseProgression {
        let agg = aggregate(sessions);
        let history = agg.exercises.values().next().expect("one exercise");
        analyze_exercise(history, config)
    }

    #[test]
    fn test_bench_press_increasing() {
        let sessions = vec![
            create_session("a", 0, "Bench Press", vec![SetRecord::weighted(100.0, 5)]),
            create_session("b", 7, "Bench Press", vec![SetRecord::weighted(110.0, 5)]),
        ];
        let p = progression_of(&sessions, &AnalysisConfig::default());

        assert_eq!(p.trend, Trend::Increasing);
        assert_eq!(p.delta, Some(10.0));
        assert_eq!(p.metric, ProgressMetric::Weight);
        assert_eq!(p.personal_best, Some(110.0));
    }

    #[test]
    fn test_decreasing() {
        let sessions = vec![
            create_session("a", 0, "Squat", vec![SetRecord::weighted(120.0, 5)]),
            create_session("b", 7, "Squat", vec![SetRecord::weighted(115.0, 5)]),
        ];
        let p = progression_of(&sessions, &AnalysisConfig::default());
        assert_eq!(p.trend, Trend::Decreasing);
        assert_eq!(p.delta, Some(-5.0));
    }

    #[test]
    fn test_single_session_insufficient() {
        let sessions = vec![create_session("a", 0, "Squat", vec![SetRecord::weighted(120.0, 5)])];
        let p = progression_of(&sessions, &AnalysisConfig::default());
        assert_eq!(p.trend, Trend::InsufficientData);
        assert_eq!(p.delta, None);
        assert_eq!(p.sessions, 1);
    }

    #[test]
    fn test_plateau_needs_threshold_sessions() {
        let two = vec![
            create_session("a", 0, "Row", vec![SetRecord::weighted(60.0, 8)]),
            create_session("b", 3, "Row", vec![SetRecord::weighted(60.0, 8)]),
        ];
        assert_eq!(progression_of(&two, &AnalysisConfig::default()).trend, Trend::InsufficientData);

        let mut three = two.clone();
        three.push(create_session("c", 6, "Row", vec![SetRecord::weighted(60.0, 8)]));
        let p = progression_of(&three, &AnalysisConfig::default());
        assert_eq!(p.trend, Trend::Plateaued);
        assert_eq!(p.delta, Some(0.0));
    }

    #[test]
    fn test_plateau_threshold_configurable() {
        let sessions = vec![
            create_session("a", 0, "Row", vec![SetRecord::weighted(60.0, 8)]),
            create_session("b", 3, "Row", vec![SetRecord::weighted(60.0, 8)]),
        ];
        let config = AnalysisConfig::default().with_plateau_threshold(2);
        assert_eq!(progression_of(&sessions, &config).trend, Trend::Plateaued);
    }

    #[test]
    fn test_best_set_respects_min_reps() {
        let sessions = vec![
            create_session("a", 0, "Deadlift", vec![SetRecord::weighted(140.0, 5)]),
            // heavy single below the threshold must not count
            create_session(
                "b",
                7,
                "Deadlift",
                vec![SetRecord::weighted(180.0, 1), SetRecord::weighted(135.0, 5)],
            ),
        ];
        let config = AnalysisConfig { min_reps: 3, ..AnalysisConfig::default() };
        let p = progression_of(&sessions, &config);

        assert_eq!(p.latest, Some(135.0));
        assert_eq!(p.trend, Trend::Decreasing);
    }

    #[test]
    fn test_bodyweight_uses_reps() {
        let sessions = vec![
            create_session("a", 0, "Pull Up", vec![SetRecord::bodyweight(8), SetRecord::bodyweight(6)]),
            create_session("b", 7, "Pull Up", vec![SetRecord::bodyweight(10)]),
        ];
        let p = progression_of(&sessions, &AnalysisConfig::default());

        assert_eq!(p.metric, ProgressMetric::Reps);
        assert_eq!(p.first, Some(8.0));
        assert_eq!(p.delta, Some(2.0));
        assert_eq!(p.trend, Trend::Increasing);
    }

    #[test]
    fn test_same_timestamp_is_one_point() {
        let sessions = vec![
            create_session("a", 0, "Curl", vec![SetRecord::weighted(15.0, 10)]),
            create_session("b", 0, "Curl", vec![SetRecord::weighted(17.5, 10)]),
        ];
        let p = progression_of(&sessions, &AnalysisConfig::default());

        assert_eq!(p.points.len(), 1);
        assert_eq!(p.points[0].value, 17.5);
        assert_eq!(p.trend, Trend::InsufficientData);
        assert_eq!(p.sessions, 2);
    }

    #[test]
    fn test_averages_and_weekly_rate() {
        let sessions = vec![
            create_session("a", 0, "Squat", vec![SetRecord::weighted(100.0, 5)]),
            create_session("b", 7, "Squat", vec![SetRecord::weighted(102.5, 5)]),
            create_session("c", 14, "Squat", vec![SetRecord::weighted(105.0, 3)]),
        ];
        let p = progression_of(&sessions, &AnalysisConfig::default());

        assert_eq!(p.avg_weight_kg, Some(102.5));
        assert!((p.avg_reps.unwrap() - 13.0 / 3.0).abs() < 1e-9);
        let rate = p.weekly_rate.expect("three points");
        assert!((rate - 2.5).abs() < 1e-6, "Weekly rate: {}", rate);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::InsufficientData.label(), "insufficient-data");
        assert_eq!(serde_json::to_string(&Trend::InsufficientData).unwrap(), "\"insufficient-data\"");
    }
}

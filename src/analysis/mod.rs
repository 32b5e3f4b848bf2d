//! Analysis engine - workout history statistics and recommendations
//!
//! Pipeline:
//! - Aggregator groups sets by exercise across sessions
//! - Progression, balance and frequency run independently on the result
//! - Recommender turns the numbers into advice

pub mod aggregator;
pub mod balance;
pub mod frequency;
pub mod predictor;
pub mod progression;
pub mod recommender;

pub use aggregator::{Aggregation, ExerciseHistory, aggregate};
pub use balance::{BalanceReport, GroupVolume, Imbalance, ImbalanceFinding};
pub use frequency::FrequencyReport;
pub use predictor::TrendLine;
pub use progression::{ExerciseProgression, ProgressMetric, ProgressPoint, Trend};
pub use recommender::{Recommender, exercise_suggestion};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::exercises::{MuscleGroupMap, normalize_name};
use crate::models::Session;

/// Calendar-day window ending at a reference instant (both ends inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start_date: NaiveDate,
    pub end: DateTime<Utc>,
    pub days: i64,
}

impl AnalysisWindow {
    pub fn ending_at(end: DateTime<Utc>, days: i64) -> Self {
        let back = u64::try_from(days.max(1) - 1).unwrap_or(0);
        let end_date = end.date_naive();
        let start_date = end_date.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
        Self {
            start_date,
            end,
            days: days.max(1),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at <= self.end && at.date_naive() >= self.start_date
    }
}

/// Output of one analysis call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sessions that contributed at least one counted set
    pub sessions_analyzed: usize,
    pub window: Option<AnalysisWindow>,
    /// Sorted by exercise name
    pub progression: Vec<ExerciseProgression>,
    pub frequency: FrequencyReport,
    pub balance: BalanceReport,
    pub recommendations: Vec<String>,
    /// Malformed records skipped along the way
    pub skipped_records: usize,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.progression.is_empty()
    }

    /// Progression of one exercise by name (case-insensitive)
    pub fn exercise(&self, name: &str) -> Option<&ExerciseProgression> {
        let key = normalize_name(name);
        self.progression
            .iter()
            .find(|p| normalize_name(&p.exercise) == key)
    }
}

/// Analyse a workout history.
///
/// Pure: the same sessions, map and config always give the same result.
/// The window ends at `config.as_of`, or at the latest session start.
pub fn analyze(
    sessions: &[Session],
    map: &MuscleGroupMap,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;

    let aggregation = aggregate(sessions);
    if aggregation.is_empty() {
        debug!("Nothing to analyse ({} sessions in input)", sessions.len());
        return Ok(AnalysisResult {
            skipped_records: aggregation.skipped.len(),
            ..AnalysisResult::default()
        });
    }

    let window = config
        .as_of
        .or_else(|| aggregation.latest_start())
        .map(|end| AnalysisWindow::ending_at(end, config.window_days));

    let progression: Vec<ExerciseProgression> = aggregation
        .exercises
        .values()
        .map(|history| progression::analyze_exercise(history, config))
        .collect();
    let balance = balance::analyze_balance(&aggregation, map, window.as_ref(), config);
    let frequency = frequency::analyze_frequency(&aggregation, map, window.as_ref());

    let recommendations =
        Recommender::new(&progression, &balance, &frequency, config.window_days).recommendations();

    let sessions_analyzed = {
        let mut orders: Vec<usize> = aggregation
            .exercises
            .values()
            .flat_map(|h| h.sets.iter().map(|s| s.session_order))
            .collect();
        orders.sort_unstable();
        orders.dedup();
        orders.len()
    };

    info!(
        "Analysed {} sessions: {} exercises, {} findings, {} skipped records",
        sessions_analyzed,
        progression.len(),
        balance.findings.len(),
        aggregation.skipped.len()
    );

    Ok(AnalysisResult {
        sessions_analyzed,
        window,
        progression,
        frequency,
        balance,
        recommendations,
        skipped_records: aggregation.skipped.len(),
    })
}

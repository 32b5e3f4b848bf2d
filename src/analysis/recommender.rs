//! Plain-text recommendations derived from the structured analysis

use super::balance::{BalanceReport, Imbalance};
use super::frequency::FrequencyReport;
use super::progression::{ExerciseProgression, ProgressMetric, Trend};

/// Aim for at least this many different exercises per window
const MIN_VARIETY: usize = 5;
/// Mean sessions per exercise below this reads as inconsistent
const MIN_REPEAT_FREQUENCY: f64 = 2.0;
const MIN_SESSIONS_PER_WEEK: f64 = 2.0;

/// Per-exercise advice based on its trend
pub fn exercise_suggestion(p: &ExerciseProgression) -> String {
    let name = &p.exercise;
    match (p.trend, p.metric) {
        (Trend::Increasing, ProgressMetric::Weight) => format!(
            "Great progress with {}! Keep adding weight in small steps while your reps hold.",
            name
        ),
        (Trend::Increasing, ProgressMetric::Reps) => format!(
            "Good work on {}! You're adding reps. Consider adding load once sets get easy.",
            name
        ),
        (Trend::Decreasing, ProgressMetric::Weight) => format!(
            "Your best set on {} has dropped. Consider a deload week, then build the weight back up gradually.",
            name
        ),
        (Trend::Decreasing, ProgressMetric::Reps) => format!(
            "Your reps on {} have dropped. Focus on form and work back to your previous level.",
            name
        ),
        (Trend::Plateaued, _) => format!(
            "{} has stalled for {} sessions. Try progressive overload: add 2.5kg or 2 reps per set.",
            name,
            p.points.len()
        ),
        (Trend::InsufficientData, _) => format!(
            "Keep tracking {} to see your progress. Try to gradually increase weight or reps.",
            name
        ),
    }
}

/// Builds the recommendation list for one analysis
pub struct Recommender<'a> {
    progression: &'a [ExerciseProgression],
    balance: &'a BalanceReport,
    frequency: &'a FrequencyReport,
    window_days: i64,
}

impl<'a> Recommender<'a> {
    pub fn new(
        progression: &'a [ExerciseProgression],
        balance: &'a BalanceReport,
        frequency: &'a FrequencyReport,
        window_days: i64,
    ) -> Self {
        Self {
            progression,
            balance,
            frequency,
            window_days,
        }
    }

    /// Everything worth telling the user; empty when there is no data
    pub fn recommendations(&self) -> Vec<String> {
        if self.progression.is_empty() {
            return Vec::new();
        }

        let mut out = Vec::new();

        if self.frequency.sessions_in_window == 0 {
            out.push(format!(
                "No workouts logged in the last {} days. Getting back to regular sessions comes first.",
                self.window_days
            ));
        } else {
            out.extend(self.balance_advice());
            out.extend(self.frequency_advice());
        }

        out.extend(self.trend_advice());
        out.extend(self.overload_advice());
        out
    }

    fn balance_advice(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .balance
            .findings
            .iter()
            .filter_map(|f| match f.kind {
                Imbalance::Untrained => None,
                Imbalance::UnderTrained => Some(format!(
                    "{} is under-trained: {:.0}% of your sets vs {:.0}% average per group. Add a few sets that target it.",
                    capitalize(f.group.name()),
                    f.share * 100.0,
                    f.mean_share * 100.0
                )),
                Imbalance::OverTrained => Some(format!(
                    "{} gets {:.0}% of your sets vs {:.0}% average per group. Shift some volume to other groups.",
                    capitalize(f.group.name()),
                    f.share * 100.0,
                    f.mean_share * 100.0
                )),
            })
            .collect();

        let untrained: Vec<&str> = self
            .balance
            .findings
            .iter()
            .filter(|f| f.kind == Imbalance::Untrained)
            .map(|f| f.group.name())
            .collect();
        if !untrained.is_empty() {
            out.push(format!(
                "No sets for {} in the last {} days. Consider adding exercises that target them.",
                untrained.join(", "),
                self.window_days
            ));
        }

        out
    }

    fn frequency_advice(&self) -> Vec<String> {
        let mut out = Vec::new();

        let variety = self.frequency.exercises.len();
        if variety < MIN_VARIETY {
            out.push(format!(
                "Try incorporating more variety: {} different exercises in the last {} days, aim for at least {}.",
                variety, self.window_days, MIN_VARIETY
            ));
        }

        if let Some(mean) = self.frequency.mean_exercise_frequency()
            && mean < MIN_REPEAT_FREQUENCY
        {
            out.push(
                "You're not repeating exercises often enough. Consistency is key for progress.".to_string(),
            );
        }

        if self.frequency.sessions_per_week < MIN_SESSIONS_PER_WEEK {
            out.push(format!(
                "You averaged {:.1} sessions per week. Aim for at least {:.0}.",
                self.frequency.sessions_per_week, MIN_SESSIONS_PER_WEEK
            ));
        }

        out
    }

    fn trend_advice(&self) -> Vec<String> {
        self.progression
            .iter()
            .filter(|p| matches!(p.trend, Trend::Decreasing | Trend::Plateaued))
            .map(exercise_suggestion)
            .collect()
    }

    fn overload_advice(&self) -> Option<String> {
        let tracked = self
            .progression
            .iter()
            .filter(|p| p.trend != Trend::InsufficientData)
            .count();
        let increasing = self
            .progression
            .iter()
            .filter(|p| p.trend == Trend::Increasing)
            .count();

        if tracked > 0 && increasing * 2 < tracked {
            Some(format!(
                "Focus on progressive overload: only {} of {} tracked exercises are trending up.",
                increasing, tracked
            ))
        } else {
            None
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! Plain-text rendering of an analysis for the terminal

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, ExerciseProgression, ProgressMetric};

pub const KG_TO_LBS: f64 = 2.20462;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn from_kg(&self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kg => kg,
            WeightUnit::Lbs => kg * KG_TO_LBS,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }

    pub fn format(&self, kg: f64) -> String {
        format!("{:.1}{}", self.from_kg(kg), self.suffix())
    }
}

/// Format a progression value in its metric
fn format_value(metric: ProgressMetric, value: f64, unit: WeightUnit) -> String {
    match metric {
        ProgressMetric::Weight => unit.format(value),
        ProgressMetric::Reps => format!("{:.0} reps", value),
    }
}

fn format_delta(metric: ProgressMetric, delta: f64, unit: WeightUnit) -> String {
    let sign = if delta > 0.0 { "+" } else { "" };
    match metric {
        ProgressMetric::Weight => format!("{}{}", sign, unit.format(delta)),
        ProgressMetric::Reps => format!("{}{:.0} reps", sign, delta),
    }
}

/// Share bar, 0.0-1.0 relative to the busiest group
pub fn share_bar(ratio: f64) -> &'static str {
    match ratio {
        r if r >= 0.75 => "[++++]",
        r if r >= 0.50 => "[+++.]",
        r if r >= 0.25 => "[++..]",
        r if r > 0.0 => "[+...]",
        _ => "[....]",
    }
}

/// One-line summary of an exercise ("100.0kg -> 110.0kg (+10.0kg), increasing")
pub fn progression_line(p: &ExerciseProgression, unit: WeightUnit) -> String {
    match (p.first, p.latest, p.delta) {
        (Some(first), Some(latest), Some(delta)) => format!(
            "{} -> {} ({}), {}",
            format_value(p.metric, first, unit),
            format_value(p.metric, latest, unit),
            format_delta(p.metric, delta, unit),
            p.trend.label()
        ),
        (_, Some(latest), _) => format!("{}, {}", format_value(p.metric, latest, unit), p.trend.label()),
        _ => p.trend.label().to_string(),
    }
}

/// Detailed view of a single exercise
pub struct ProgressionReport<'a> {
    pub progression: &'a ExerciseProgression,
    pub unit: WeightUnit,
}

impl fmt::Display for ProgressionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (p, unit) = (self.progression, self.unit);

        writeln!(f, "{}", p.exercise)?;
        writeln!(f, "{:-<40}", "")?;
        writeln!(f, "Sessions:      {}", p.sessions)?;
        writeln!(f, "Trend:         {}", progression_line(p, unit))?;
        if let Some(pb) = p.personal_best {
            writeln!(f, "Personal best: {}", format_value(p.metric, pb, unit))?;
        }
        if let Some(w) = p.avg_weight_kg {
            writeln!(f, "Avg weight:    {}", unit.format(w))?;
        }
        if let Some(r) = p.avg_reps {
            writeln!(f, "Avg reps:      {:.1}", r)?;
        }
        if let Some(rate) = p.weekly_rate {
            writeln!(f, "Weekly rate:   {}/week", format_delta(p.metric, rate, unit))?;
        }

        if !p.points.is_empty() {
            writeln!(f)?;
            for point in &p.points {
                writeln!(
                    f,
                    "  {} | {}",
                    point.at.format("%Y-%m-%d"),
                    format_value(p.metric, point.value, unit)
                )?;
            }
        }
        Ok(())
    }
}

pub fn render_progression(progression: &ExerciseProgression, unit: WeightUnit) -> String {
    ProgressionReport { progression, unit }.to_string()
}

/// Full report: summary, progression, balance, frequency and recommendations
pub struct Report<'a> {
    pub result: &'a AnalysisResult,
    pub unit: WeightUnit,
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    writeln!(f, "{:-<60}", "")
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (result, unit) = (self.result, self.unit);

        if result.is_empty() {
            writeln!(f, "No workouts to analyse.")?;
            if result.skipped_records > 0 {
                writeln!(f, "({} malformed records skipped)", result.skipped_records)?;
            }
            return Ok(());
        }

        writeln!(f, "Workout Analysis")?;
        writeln!(f, "{:-<60}", "")?;
        writeln!(f, "Sessions analysed: {}", result.sessions_analyzed)?;
        if let Some(window) = &result.window {
            writeln!(
                f,
                "Window: {} .. {} ({} days)",
                window.start_date,
                window.end.format("%Y-%m-%d"),
                window.days
            )?;
        }
        writeln!(
            f,
            "Sessions in window: {} ({:.1}/week)",
            result.frequency.sessions_in_window, result.frequency.sessions_per_week
        )?;
        if result.skipped_records > 0 {
            writeln!(f, "Skipped records: {}", result.skipped_records)?;
        }

        section(f, "Progression")?;
        for p in &result.progression {
            writeln!(f, "{:28} | {}", p.exercise, progression_line(p, unit))?;
        }

        let balance = &result.balance;
        if !balance.groups.is_empty() {
            section(f, &format!("Muscle balance ({} sets)", balance.total_sets))?;
            let max = balance.groups.iter().map(|g| g.sets).max().unwrap_or(0);
            for g in &balance.groups {
                let ratio = if max > 0 { g.sets as f64 / max as f64 } else { 0.0 };
                writeln!(
                    f,
                    "{:12} {} {:>4} sets {:>5.1}%",
                    g.group.name(),
                    share_bar(ratio),
                    g.sets,
                    g.share * 100.0
                )?;
            }
            if balance.unclassified_sets > 0 {
                writeln!(f, "{:12} {:>11} sets", "unclassified", balance.unclassified_sets)?;
            }
        }

        if !result.frequency.exercises.is_empty() {
            section(f, "Frequency (sessions in window)")?;
            for (exercise, count) in &result.frequency.exercises {
                writeln!(f, "{:28} | {}", exercise, count)?;
            }
        }

        if !result.recommendations.is_empty() {
            section(f, "Recommendations")?;
            for rec in &result.recommendations {
                writeln!(f, "- {}", rec)?;
            }
        }
        Ok(())
    }
}

pub fn render(result: &AnalysisResult, unit: WeightUnit) -> String {
    Report { result, unit }.to_string()
}

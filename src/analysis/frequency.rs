//! Session counts per exercise and muscle group over a rolling window

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::AnalysisWindow;
use super::aggregator::Aggregation;
use crate::exercises::{MuscleGroup, MuscleGroupMap};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyReport {
    /// Distinct sessions with at least one counted set in the window
    pub sessions_in_window: usize,
    pub sessions_per_week: f64,
    /// Exercise name -> sessions; zero counts are omitted
    pub exercises: BTreeMap<String, usize>,
    /// Muscle group -> sessions that trained it; zero counts are omitted
    pub muscle_groups: BTreeMap<MuscleGroup, usize>,
}

impl FrequencyReport {
    /// Mean sessions per exercise
    pub fn mean_exercise_frequency(&self) -> Option<f64> {
        if self.exercises.is_empty() {
            return None;
        }
        let total: usize = self.exercises.values().sum();
        Some(total as f64 / self.exercises.len() as f64)
    }
}

pub fn analyze_frequency(
    aggregation: &Aggregation,
    map: &MuscleGroupMap,
    window: Option<&AnalysisWindow>,
) -> FrequencyReport {
    let Some(window) = window else {
        return FrequencyReport::default();
    };

    let mut all_sessions: BTreeSet<usize> = BTreeSet::new();
    let mut group_sessions: BTreeMap<MuscleGroup, BTreeSet<usize>> = BTreeMap::new();
    let mut exercises = BTreeMap::new();

    for history in aggregation.exercises.values() {
        let sessions: BTreeSet<usize> = history
            .sets
            .iter()
            .filter(|s| window.contains(s.started_at))
            .map(|s| s.session_order)
            .collect();
        if sessions.is_empty() {
            continue;
        }

        for tag in map.classify(&history.name, history.template_id.as_deref()) {
            group_sessions.entry(*tag).or_default().extend(sessions.iter().copied());
        }
        all_sessions.extend(sessions.iter().copied());
        *exercises.entry(history.name.clone()).or_insert(0) += sessions.len();
    }

    let sessions_in_window = all_sessions.len();

    FrequencyReport {
        sessions_in_window,
        sessions_per_week: sessions_in_window as f64 * 7.0 / window.days as f64,
        exercises,
        muscle_groups: group_sessions
            .into_iter()
            .map(|(group, sessions)| (group, sessions.len()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::models::{ExerciseEntry, Session, SetRecord};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap() + Duration::days(n)
    }

    fn create_session(id: &str, days: i64, exercises: &[&str]) -> Session {
        Session::new(
            id,
            day(days),
            exercises
                .iter()
                .map(|name| ExerciseEntry::new(name, vec![SetRecord::weighted(60.0, 8)]))
                .collect(),
        )
    }

    fn frequency_of(sessions: &[Session], end: i64, days: i64) -> FrequencyReport {
        let agg = aggregate(sessions);
        let window = AnalysisWindow::ending_at(day(end), days);
        analyze_frequency(&agg, &MuscleGroupMap::builtin(), Some(&window))
    }

    #[test]
    fn test_empty() {
        let report = frequency_of(&[], 0, 28);
        assert_eq!(report.sessions_in_window, 0);
        assert!(report.exercises.is_empty());
        assert!(report.muscle_groups.is_empty());
    }

    #[test]
    fn test_counts_sessions_per_exercise() {
        let sessions = vec![
            create_session("a", 0, &["Squat (Barbell)", "Bench Press (Barbell)"]),
            create_session("b", 2, &["Squat (Barbell)"]),
            create_session("c", 4, &["Squat (Barbell)", "Bicep Curl (Dumbbell)"]),
        ];
        let report = frequency_of(&sessions, 4, 28);

        assert_eq!(report.sessions_in_window, 3);
        assert_eq!(report.exercises["Squat (Barbell)"], 3);
        assert_eq!(report.exercises["Bench Press (Barbell)"], 1);
        assert_eq!(report.muscle_groups[&MuscleGroup::Quads], 3);
        assert_eq!(report.muscle_groups[&MuscleGroup::Biceps], 1);
        assert_eq!(report.muscle_groups[&MuscleGroup::Chest], 1);
    }

    #[test]
    fn test_group_counted_once_per_session() {
        // bench and push up both hit chest in the same session
        let sessions = vec![create_session("a", 0, &["Bench Press", "Push Up"])];
        let report = frequency_of(&sessions, 0, 28);
        assert_eq!(report.muscle_groups[&MuscleGroup::Chest], 1);
    }

    #[test]
    fn test_unclassified_bucket() {
        let sessions = vec![create_session("a", 0, &["Mystery Machine"])];
        let report = frequency_of(&sessions, 0, 28);
        assert_eq!(report.muscle_groups[&MuscleGroup::Unclassified], 1);
    }

    #[test]
    fn test_omits_exercises_outside_window() {
        let sessions = vec![
            create_session("old", -40, &["Deadlift"]),
            create_session("a", 0, &["Squat"]),
        ];
        let report = frequency_of(&sessions, 0, 28);

        assert!(!report.exercises.contains_key("Deadlift"));
        assert_eq!(report.sessions_in_window, 1);
    }

    #[test]
    fn test_window_boundary_date_included() {
        // a 7 day window ending on day 6 starts on day 0
        let sessions = vec![
            create_session("edge", 0, &["Squat"]),
            create_session("outside", -1, &["Squat"]),
        ];
        let report = frequency_of(&sessions, 6, 7);
        assert_eq!(report.exercises["Squat"], 1);
    }

    #[test]
    fn test_window_restriction_matches_double_window() {
        // every other day, alternating morning/evening so the boundary date
        // has a session earlier in the day than the reference instant
        let sessions: Vec<Session> = (0..40)
            .map(|d| {
                let mut s = create_session(&format!("s{}", d), -d, &["Squat"]);
                if d % 2 == 0 {
                    s.exercises.push(ExerciseEntry::new("Row", vec![SetRecord::weighted(50.0, 10)]));
                }
                if d % 3 == 0 {
                    s.started_at -= Duration::hours(12);
                }
                s
            })
            .collect();

        let agg = aggregate(&sessions);
        let map = MuscleGroupMap::builtin();
        let end = day(0);
        let single = AnalysisWindow::ending_at(end, 10);
        let double = AnalysisWindow::ending_at(end, 20);

        let w = analyze_frequency(&agg, &map, Some(&single));
        let w2 = analyze_frequency(&agg, &map, Some(&double));

        // restrict the 2W sessions per exercise to the last W days
        let restricted: BTreeMap<String, usize> = agg
            .exercises
            .values()
            .map(|h| {
                let in_sub_range: BTreeSet<usize> = h
                    .sets
                    .iter()
                    .filter(|s| double.contains(s.started_at))
                    .filter(|s| s.started_at.date_naive() >= single.start_date)
                    .map(|s| s.session_order)
                    .collect();
                (h.name.clone(), in_sub_range.len())
            })
            .filter(|(_, n)| *n > 0)
            .collect();

        assert_eq!(w.exercises, restricted);
        assert!(w2.exercises["Squat"] > w.exercises["Squat"]);
        // s9 starts at 06:00 on the first day of the 10 day window
        assert_eq!(single.start_date, sessions[9].started_at.date_naive());
        assert!(single.contains(sessions[9].started_at));
        assert_eq!(w.exercises["Squat"], 10);
        assert_eq!(w.exercises["Row"], 5);
    }

    #[test]
    fn test_sessions_per_week() {
        let sessions = vec![
            create_session("a", 0, &["Squat"]),
            create_session("b", 7, &["Squat"]),
            create_session("c", 14, &["Squat"]),
            create_session("d", 21, &["Squat"]),
        ];
        let report = frequency_of(&sessions, 27, 28);
        assert!((report.sessions_per_week - 1.0).abs() < 1e-9);
        assert_eq!(report.mean_exercise_frequency(), Some(4.0));
    }
}

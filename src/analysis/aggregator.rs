//! Groups per-set records by exercise across sessions

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::AnalysisError;
use crate::exercises::normalize_name;
use crate::models::{Session, SetRecord};

/// A counted set with the session it came from
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSet {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    /// Position of the session in the caller's input
    pub session_order: usize,
    pub set: SetRecord,
}

/// All sets of one exercise, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseHistory {
    /// Name as first seen in the history
    pub name: String,
    /// First Hevy template id seen for the exercise
    pub template_id: Option<String>,
    pub sets: Vec<AggregatedSet>,
}

/// Sets of one exercise within a single session
#[derive(Debug, Clone)]
pub struct SessionSets<'a> {
    pub session_id: &'a str,
    pub started_at: DateTime<Utc>,
    pub session_order: usize,
    pub sets: Vec<&'a SetRecord>,
}

impl ExerciseHistory {
    /// Split into per-session slices, keeping chronological order
    pub fn by_session(&self) -> Vec<SessionSets<'_>> {
        let mut out: Vec<SessionSets<'_>> = Vec::new();
        for s in &self.sets {
            match out.last_mut() {
                Some(last) if last.session_order == s.session_order => last.sets.push(&s.set),
                _ => out.push(SessionSets {
                    session_id: &s.session_id,
                    started_at: s.started_at,
                    session_order: s.session_order,
                    sets: vec![&s.set],
                }),
            }
        }
        out
    }
}

/// Aggregator output: exercise key -> history, plus what was skipped
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub exercises: BTreeMap<String, ExerciseHistory>,
    pub skipped: Vec<AnalysisError>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Latest session start among counted sets
    pub fn latest_start(&self) -> Option<DateTime<Utc>> {
        self.exercises
            .values()
            .filter_map(|h| h.sets.last().map(|s| s.started_at))
            .max()
    }
}

/// Group every valid set by normalised exercise name.
///
/// Sessions are visited by start time; equal timestamps keep their input
/// order. Malformed sets and nameless entries are skipped and logged.
pub fn aggregate(sessions: &[Session]) -> Aggregation {
    let mut order: Vec<usize> = (0..sessions.len()).collect();
    order.sort_by_key(|&i| sessions[i].started_at);

    let mut aggregation = Aggregation::default();

    for idx in order {
        let session = &sessions[idx];
        for entry in &session.exercises {
            let key = normalize_name(&entry.name);
            if key.is_empty() {
                let err = AnalysisError::malformed(&session.id, "exercise entry without a name");
                warn!("Skipping record: {}", err);
                aggregation.skipped.push(err);
                continue;
            }

            let counted = entry.counted_sets(&session.id, |err| {
                warn!("Skipping record: {}", err);
                aggregation.skipped.push(err);
            });
            if counted.is_empty() {
                continue;
            }

            let history = aggregation
                .exercises
                .entry(key)
                .or_insert_with(|| ExerciseHistory {
                    name: entry.name.trim().to_string(),
                    template_id: None,
                    sets: Vec::new(),
                });
            if history.template_id.is_none() {
                history.template_id = entry.template_id.clone();
            }

            for set in counted {
                history.sets.push(AggregatedSet {
                    session_id: session.id.clone(),
                    started_at: session.started_at,
                    session_order: idx,
                    set: *set,
                });
            }
        }
    }

    aggregation
}

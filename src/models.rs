//! Workout history model - sessions, exercise entries and sets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One logged workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub exercises: Vec<ExerciseEntry>,
}

/// One exercise performed within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub name: String,
    pub template_id: Option<String>,
    pub sets: Vec<SetRecord>,
}

/// One performed set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SetRecord {
    pub weight_kg: Option<f64>,
    pub reps: Option<u32>,
    pub rpe: Option<f64>,
    pub duration_secs: Option<u32>,
}

/// Exercise definition with its muscle tags, as published by Hevy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub primary_muscle_group: Option<String>,
    #[serde(default)]
    pub secondary_muscle_groups: Vec<String>,
}

impl SetRecord {
    pub fn weighted(weight_kg: f64, reps: u32) -> Self {
        Self {
            weight_kg: Some(weight_kg),
            reps: Some(reps),
            ..Self::default()
        }
    }

    pub fn bodyweight(reps: u32) -> Self {
        Self {
            reps: Some(reps),
            ..Self::default()
        }
    }

    /// A set counts only if it carries a weight or a rep count, and the
    /// weight (if any) is a finite non-negative number
    pub fn validate(&self) -> Result<(), String> {
        if self.weight_kg.is_none() && self.reps.is_none() {
            return Err("set has neither weight nor reps".to_string());
        }
        if let Some(w) = self.weight_kg
            && (!w.is_finite() || w < 0.0)
        {
            return Err(format!("set has invalid weight {}", w));
        }
        Ok(())
    }
}

impl ExerciseEntry {
    pub fn new(name: &str, sets: Vec<SetRecord>) -> Self {
        Self {
            name: name.to_string(),
            template_id: None,
            sets,
        }
    }

    /// Sets that pass validation; the rest are reported through `on_skip`
    pub fn counted_sets<'a>(
        &'a self,
        session_id: &str,
        mut on_skip: impl FnMut(AnalysisError),
    ) -> Vec<&'a SetRecord> {
        let mut counted = Vec::with_capacity(self.sets.len());
        for (idx, set) in self.sets.iter().enumerate() {
            match set.validate() {
                Ok(()) => counted.push(set),
                Err(reason) => on_skip(AnalysisError::malformed(
                    session_id,
                    format!("{} set #{}: {}", self.name, idx + 1, reason),
                )),
            }
        }
        counted
    }
}

impl Session {
    pub fn new(id: &str, started_at: DateTime<Utc>, exercises: Vec<ExerciseEntry>) -> Self {
        Self {
            id: id.to_string(),
            title: None,
            started_at,
            exercises,
        }
    }

    /// Total valid sets in the session
    pub fn set_count(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.validate().is_ok())
            .count()
    }
}

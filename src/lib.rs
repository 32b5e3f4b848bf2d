//! workout-optimizer - Hevy workout history analysis
//!
//! Turns a log of workout sessions into per-exercise progression trends,
//! muscle-group balance, training frequency and plain-text advice.

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod hevy;
pub mod logging;
pub mod models;
pub mod report;
pub mod sync;
pub mod tui;

pub use analysis::{AnalysisResult, analyze};
pub use config::AnalysisConfig;
pub use db::Database;
pub use error::AnalysisError;
pub use exercises::{MuscleGroup, MuscleGroupMap};
pub use models::{ExerciseEntry, Session, SetRecord};

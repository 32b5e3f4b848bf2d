//! Analysis parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub const DEFAULT_WINDOW_DAYS: i64 = 28;
pub const DEFAULT_PLATEAU_THRESHOLD: usize = 3;
pub const DEFAULT_MIN_REPS: u32 = 1;
pub const DEFAULT_UNDER_RATIO: f64 = 0.5;
pub const DEFAULT_OVER_RATIO: f64 = 2.0;

/// Tunables for one `analyze` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rolling window length for frequency and balance
    pub window_days: i64,
    /// Sessions at an unchanged best set before calling it a plateau
    pub plateau_threshold: usize,
    /// Sets with fewer reps don't count towards the best set
    pub min_reps: u32,
    /// Under-trained below `under_ratio` x mean share
    pub under_ratio: f64,
    /// Over-trained above `over_ratio` x mean share
    pub over_ratio: f64,
    /// End of the window; latest session start when unset
    pub as_of: Option<DateTime<Utc>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            plateau_threshold: DEFAULT_PLATEAU_THRESHOLD,
            min_reps: DEFAULT_MIN_REPS,
            under_ratio: DEFAULT_UNDER_RATIO,
            over_ratio: DEFAULT_OVER_RATIO,
            as_of: None,
        }
    }
}

impl AnalysisConfig {
    pub fn with_window(mut self, window_days: i64) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_plateau_threshold(mut self, sessions: usize) -> Self {
        self.plateau_threshold = sessions;
        self
    }

    pub fn as_of(mut self, at: DateTime<Utc>) -> Self {
        self.as_of = Some(at);
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.window_days < 1 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "window_days must be at least 1, got {}",
                self.window_days
            )));
        }
        if self.plateau_threshold < 2 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "plateau_threshold must be at least 2 sessions, got {}",
                self.plateau_threshold
            )));
        }
        if !self.under_ratio.is_finite() || self.under_ratio < 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "under_ratio must be a non-negative number, got {}",
                self.under_ratio
            )));
        }
        if !self.over_ratio.is_finite() || self.over_ratio <= self.under_ratio {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "over_ratio ({}) must be greater than under_ratio ({})",
                self.over_ratio, self.under_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert_eq!(config.window_days, 28);
        assert_eq!(config.plateau_threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_window_rejected() {
        let err = AnalysisConfig::default().with_window(-7).validate().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(AnalysisConfig::default().with_window(0).validate().is_err());
    }

    #[test]
    fn test_plateau_threshold_rejected() {
        assert!(AnalysisConfig::default().with_plateau_threshold(1).validate().is_err());
    }

    #[test]
    fn test_ratio_order_rejected() {
        let config = AnalysisConfig {
            under_ratio: 2.0,
            over_ratio: 1.5,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"window_days": 14}"#).unwrap();
        assert_eq!(config.window_days, 14);
        assert_eq!(config.plateau_threshold, DEFAULT_PLATEAU_THRESHOLD);
    }
}

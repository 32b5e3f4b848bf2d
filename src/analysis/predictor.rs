//! Rate of progress using linear regression (linfa)

use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};

/// Minimum data points required for fitting
const MIN_DATA_POINTS: usize = 3;

const SECS_PER_DAY: f64 = 86_400.0;

/// Least-squares line through (day offset, best set) points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    /// Change per day
    pub slope: f64,
    pub r2_score: f64,
    pub data_points: usize,
}

impl TrendLine {
    /// Fit a line; `None` with fewer than three points or a zero time span
    pub fn fit(points: &[(DateTime<Utc>, f64)]) -> Option<Self> {
        if points.len() < MIN_DATA_POINTS {
            return None;
        }

        let first = points.iter().map(|(at, _)| *at).min()?;
        let last = points.iter().map(|(at, _)| *at).max()?;
        if last == first {
            return None;
        }

        // X = days since first point, Y = best set value
        let x_data: Vec<f64> = points
            .iter()
            .map(|(at, _)| (*at - first).num_seconds() as f64 / SECS_PER_DAY)
            .collect();
        let y_data: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let n_samples = x_data.len();

        let records = Array2::from_shape_vec((n_samples, 1), x_data).ok()?;
        let targets = Array1::from_vec(y_data);
        let dataset = Dataset::new(records, targets);

        let model = LinearRegression::default().fit(&dataset).ok()?;
        let slope = model.params()[0];

        let predictions = model.predict(&dataset);
        let r2_score = predictions.r2(&dataset).unwrap_or(0.0);

        if !slope.is_finite() {
            return None;
        }

        Some(Self {
            slope,
            r2_score,
            data_points: n_samples,
        })
    }

    pub fn weekly_rate(&self) -> f64 {
        self.slope * 7.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn point(days: i64, value: f64) -> (DateTime<Utc>, f64) {
        (Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(days), value)
    }

    #[test]
    fn test_insufficient_data() {
        assert!(TrendLine::fit(&[point(0, 100.0), point(7, 105.0)]).is_none());
    }

    #[test]
    fn test_zero_span() {
        assert!(TrendLine::fit(&[point(0, 100.0), point(0, 105.0), point(0, 110.0)]).is_none());
    }

    #[test]
    fn test_linear_trend() {
        // +2.5 kg every week
        let line = TrendLine::fit(&[point(0, 100.0), point(7, 102.5), point(14, 105.0)]).unwrap();
        assert!((line.weekly_rate() - 2.5).abs() < 1e-6, "Weekly rate: {}", line.weekly_rate());
        assert!(line.r2_score > 0.99, "R2 score: {}", line.r2_score);
        assert_eq!(line.data_points, 3);
    }

    #[test]
    fn test_negative_trend() {
        let line = TrendLine::fit(&[point(0, 20.0), point(7, 18.0), point(14, 16.0)]).unwrap();
        assert!(line.slope < 0.0);
    }
}

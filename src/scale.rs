use crate::aggregate::{KeyGroup, KeyMatrix};
use crate::config::DigestConfig;
use crate::error::DigestError;

/// Power-curve compression of raw counts into display magnitudes:
///
/// `round((1 - (1 - v / max)^degree) * max / divisor)`
///
/// Low counts are lifted away from zero while the largest keys are pulled down,
/// then the result is divided into the display's resolution. Rounds half away
/// from zero, which is half-up for the non-negative inputs seen here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScaler {
    degree: i32,
    divisor: f64,
}

impl DisplayScaler {
    pub fn new(degree: i32, divisor: f64) -> Result<Self, DigestError> {
        if degree < 1 {
            return Err(DigestError::Config(format!(
                "curve degree must be at least 1, got {degree}"
            )));
        }
        if !(divisor.is_finite() && divisor > 0.0) {
            return Err(DigestError::Config(format!(
                "divisor must be a positive number, got {divisor}"
            )));
        }
        Ok(Self { degree, divisor })
    }

    pub fn from_config(config: &DigestConfig) -> Result<Self, DigestError> {
        Self::new(config.curve_degree, config.divisor)
    }

    pub fn scale(&self, value: u64, max_value: u64) -> u64 {
        if max_value == 0 {
            return 0;
        }
        let max = max_value as f64;
        let ratio = (value as f64 / max).clamp(0.0, 1.0);
        let curved = (1.0 - ratio).powi(self.degree);
        ((1.0 - curved) * max / self.divisor).round() as u64
    }

    /// Replaces each group's `day_values` with scaled magnitudes. The raw series
    /// stays in `display_values`.
    pub fn scale_matrix(&self, matrix: KeyMatrix) -> Vec<KeyGroup> {
        let max_value = matrix.max_value;
        matrix
            .groups
            .into_iter()
            .map(|group| KeyGroup {
                day_values: group
                    .display_values
                    .iter()
                    .map(|value| self.scale(*value, max_value))
                    .collect(),
                ..group
            })
            .collect()
    }
}

impl Default for DisplayScaler {
    fn default() -> Self {
        Self {
            degree: 3,
            divisor: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_maps_to_zero() {
        let scaler = DisplayScaler::default();
        assert_eq!(scaler.scale(0, 0), 0);
        assert_eq!(scaler.scale(0, 1_000), 0);
    }

    #[test]
    fn maximum_is_fixed_point() {
        let scaler = DisplayScaler::default();
        assert_eq!(scaler.scale(100, 100), 2);
        assert_eq!(scaler.scale(1_000, 1_000), 20);
        assert_eq!(scaler.scale(75, 75), 2);
        assert_eq!(scaler.scale(74, 74), 1);
    }

    #[test]
    fn no_activity_scales_to_zero() {
        let scaler = DisplayScaler::default();
        assert_eq!(scaler.scale(5, 0), 0);
    }

    #[test]
    fn monotonic_in_value() {
        for degree in 1..=4 {
            let scaler = DisplayScaler::new(degree, 7.0).unwrap();
            let max = 997;
            let mut previous = 0;
            for value in 0..=max {
                let scaled = scaler.scale(value, max);
                assert!(scaled >= previous, "degree {degree} value {value}");
                previous = scaled;
            }
        }
    }

    #[test]
    fn compresses_low_counts_upward() {
        let scaler = DisplayScaler::new(3, 1.0).unwrap();
        // linear would give 10
        assert_eq!(scaler.scale(10, 100), 27);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(DisplayScaler::new(0, 50.0).is_err());
        assert!(DisplayScaler::new(3, 0.0).is_err());
        assert!(DisplayScaler::new(3, f64::NAN).is_err());
    }
}

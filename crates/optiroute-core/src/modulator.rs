//! Rainfall modulation factor.
//!
//! Maps 24-hour accumulated precipitation onto a multiplier in
//! `[floor, 1.0]`. Dry conditions keep the floor so structural hotspots stay
//! visible; the sub-linear exponent makes small amounts matter early and
//! saturates at `reference_mm`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulatorConfig {
    /// Factor returned for zero or missing rainfall
    pub floor: f64,
    /// Accumulation (mm) at which the factor reaches 1.0
    pub reference_mm: f64,
    /// Curve exponent, < 1 for a concave ramp
    pub exponent: f64,
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            floor: 0.1,
            reference_mm: 100.0,
            exponent: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalModulator {
    config: ModulatorConfig,
}

impl EnvironmentalModulator {
    pub fn new(config: ModulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModulatorConfig {
        &self.config
    }

    pub fn modulate(&self, accumulated_mm: f64) -> f64 {
        let floor = self.config.floor.clamp(0.0, 1.0);
        if accumulated_mm.is_nan() || accumulated_mm <= 0.0 {
            return floor;
        }
        let reference = if self.config.reference_mm > 0.0 {
            self.config.reference_mm
        } else {
            return 1.0;
        };
        let normalized = (accumulated_mm / reference).min(1.0);
        (floor + (1.0 - floor) * normalized.powf(self.config.exponent)).clamp(floor, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_conditions_hit_floor() {
        let m = EnvironmentalModulator::default();
        assert_eq!(m.modulate(0.0), 0.1);
        assert_eq!(m.modulate(-4.0), 0.1);
        assert_eq!(m.modulate(f64::NAN), 0.1);
    }

    #[test]
    fn saturates_at_reference() {
        let m = EnvironmentalModulator::default();
        assert_eq!(m.modulate(100.0), 1.0);
        assert_eq!(m.modulate(250.0), 1.0);
    }

    #[test]
    fn infinite_rain_saturates() {
        let m = EnvironmentalModulator::default();
        assert_eq!(m.modulate(f64::INFINITY), m.modulate(100.0));
        assert_eq!(m.modulate(f64::MAX), 1.0);
        assert_eq!(m.modulate(f64::NEG_INFINITY), 0.1);
    }

    #[test]
    fn twenty_mm_is_close_to_half() {
        let m = EnvironmentalModulator::default();
        let value = m.modulate(20.0);
        assert!((value - (0.1 + 0.9 * 0.2_f64.powf(0.6))).abs() < 1e-12);
        assert!(value > 0.4 && value < 0.5);
    }

    #[test]
    fn monotonic_non_decreasing() {
        let m = EnvironmentalModulator::default();
        let mut previous = 0.0;
        for i in 0..=300 {
            let value = m.modulate(i as f64 * 0.5);
            assert!(value >= previous);
            assert!((0.1..=1.0).contains(&value));
            previous = value;
        }
    }
}

//! Static waterlogging preference surface.
//!
//! `preference(x) = max_i severity_i * decay(distance_km(x, pivot_i))`
//!
//! Taking the maximum instead of a sum keeps clustered pivots from
//! compounding, and bounds the surface by the highest severity loaded.

use crate::models::LatLng;
use crate::pivots::PivotRepository;
use crate::spatial::haversine_km;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_SPREAD_KM: f64 = 2.0;

const MIN_SPREAD_KM: f64 = 1e-6;

/// Distance-decay shape applied to each pivot's severity.
///
/// Implementations must return 1 at distance 0, never increase with
/// distance, and stay within [0, 1].
pub trait DecayKernel: Send + Sync + std::fmt::Debug {
    fn weight(&self, distance_km: f64) -> f64;
}

/// `exp(-d / spread)`: influence drops by a factor of e every `spread_km`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecay {
    pub spread_km: f64,
}

impl ExponentialDecay {
    pub fn new(spread_km: f64) -> Self {
        Self {
            spread_km: sanitize_spread(spread_km),
        }
    }
}

impl Default for ExponentialDecay {
    fn default() -> Self {
        Self::new(DEFAULT_SPREAD_KM)
    }
}

impl DecayKernel for ExponentialDecay {
    fn weight(&self, distance_km: f64) -> f64 {
        let d = sanitize_distance(distance_km);
        (-d / sanitize_spread(self.spread_km)).exp()
    }
}

/// `exp(-(d / spread)^2)`: flatter near the pivot, faster fall-off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianDecay {
    pub spread_km: f64,
}

impl DecayKernel for GaussianDecay {
    fn weight(&self, distance_km: f64) -> f64 {
        let ratio = sanitize_distance(distance_km) / sanitize_spread(self.spread_km);
        (-(ratio * ratio)).exp()
    }
}

/// `max(0, 1 - d / radius)`: zero influence beyond `radius_km`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearDecay {
    pub radius_km: f64,
}

impl DecayKernel for LinearDecay {
    fn weight(&self, distance_km: f64) -> f64 {
        let d = sanitize_distance(distance_km);
        (1.0 - d / sanitize_spread(self.radius_km)).clamp(0.0, 1.0)
    }
}

fn sanitize_distance(distance_km: f64) -> f64 {
    if distance_km.is_finite() {
        distance_km.max(0.0)
    } else if distance_km == f64::INFINITY {
        f64::INFINITY
    } else {
        0.0
    }
}

fn sanitize_spread(spread_km: f64) -> f64 {
    if spread_km.is_finite() && spread_km > MIN_SPREAD_KM {
        spread_km
    } else {
        MIN_SPREAD_KM
    }
}

/// Weather-independent structural risk derived from pivot proximity.
#[derive(Debug, Clone)]
pub struct PreferenceSurface {
    pivots: Arc<PivotRepository>,
    kernel: Arc<dyn DecayKernel>,
}

impl PreferenceSurface {
    pub fn new(pivots: Arc<PivotRepository>, kernel: Arc<dyn DecayKernel>) -> Self {
        Self { pivots, kernel }
    }

    /// Surface with the default exponential kernel.
    pub fn exponential(pivots: Arc<PivotRepository>, spread_km: f64) -> Self {
        Self::new(pivots, Arc::new(ExponentialDecay::new(spread_km)))
    }

    pub fn pivots(&self) -> &PivotRepository {
        &self.pivots
    }

    pub fn kernel(&self) -> &dyn DecayKernel {
        self.kernel.as_ref()
    }

    /// Structural risk at `point`, in [0, max severity]. Zero for an empty
    /// repository.
    pub fn preference(&self, point: LatLng) -> f64 {
        let point = point.normalized();
        let mut best = 0.0_f64;
        for pivot in self.pivots.pivots() {
            let distance_km = haversine_km(point, pivot.location());
            let weight = self.kernel.weight(distance_km).clamp(0.0, 1.0);
            best = best.max(pivot.severity * weight);
        }
        best.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pivot;
    use crate::pivots::default_flood_pivots;
    use crate::spatial::meters_to_lat;

    fn hindmata() -> PreferenceSurface {
        let repo = PivotRepository::new(vec![Pivot::new("Hindmata", 19.0056, 72.8417, 0.95)]);
        PreferenceSurface::exponential(Arc::new(repo), DEFAULT_SPREAD_KM)
    }

    #[test]
    fn preference_at_pivot_equals_severity() {
        let surface = PreferenceSurface::exponential(
            Arc::new(PivotRepository::new(default_flood_pivots())),
            DEFAULT_SPREAD_KM,
        );
        for pivot in default_flood_pivots() {
            let value = surface.preference(pivot.location());
            assert!(
                (value - pivot.severity).abs() < 1e-12,
                "{}: expected {}, got {}",
                pivot.name,
                pivot.severity,
                value
            );
        }
    }

    #[test]
    fn preference_decays_by_e_at_spread_distance() {
        let surface = hindmata();
        let lat = 19.0056 + meters_to_lat(2000.0, 19.0056);
        let value = surface.preference(LatLng::new(lat, 72.8417));
        let expected = 0.95 * (-1.0_f64).exp();
        assert!((value - expected).abs() < 0.005, "got {value}");
        assert!((value - 0.349).abs() < 0.005);
    }

    #[test]
    fn preference_bounded_by_max_severity() {
        let repo = Arc::new(PivotRepository::new(vec![
            Pivot::new("a", 19.000, 72.800, 0.6),
            Pivot::new("b", 19.001, 72.801, 0.6),
            Pivot::new("c", 19.002, 72.800, 0.6),
        ]));
        let surface = PreferenceSurface::exponential(repo, DEFAULT_SPREAD_KM);
        for i in 0..20 {
            let p = LatLng::new(18.99 + i as f64 * 0.001, 72.8);
            let value = surface.preference(p);
            assert!((0.0..=0.6 + 1e-12).contains(&value));
        }
    }

    #[test]
    fn empty_repository_is_zero_everywhere() {
        let surface =
            PreferenceSurface::exponential(Arc::new(PivotRepository::empty()), DEFAULT_SPREAD_KM);
        assert_eq!(surface.preference(LatLng::new(19.0, 72.8)), 0.0);
    }

    #[test]
    fn preference_non_increasing_with_distance() {
        let surface = hindmata();
        let mut previous = f64::INFINITY;
        for step in 0..50 {
            let lat = 19.0056 + meters_to_lat(step as f64 * 250.0, 19.0056);
            let value = surface.preference(LatLng::new(lat, 72.8417));
            assert!(value <= previous + 1e-15);
            previous = value;
        }
    }

    #[test]
    fn kernels_are_unit_at_origin_and_bounded() {
        let kernels: Vec<Box<dyn DecayKernel>> = vec![
            Box::new(ExponentialDecay::new(2.0)),
            Box::new(GaussianDecay { spread_km: 2.0 }),
            Box::new(LinearDecay { radius_km: 3.0 }),
            Box::new(ExponentialDecay::new(0.0)),
        ];
        for kernel in kernels {
            assert_eq!(kernel.weight(0.0), 1.0);
            assert_eq!(kernel.weight(-5.0), 1.0);
            let mut last = 1.0;
            for d in [0.1, 0.5, 1.0, 2.0, 5.0, 50.0] {
                let w = kernel.weight(d);
                assert!((0.0..=1.0).contains(&w));
                assert!(w <= last);
                last = w;
            }
        }
        assert_eq!(LinearDecay { radius_km: 3.0 }.weight(4.0), 0.0);
    }

    #[test]
    fn custom_kernel_changes_surface() {
        let repo = Arc::new(PivotRepository::new(vec![Pivot::new("p", 19.0, 72.8, 0.8)]));
        let linear = PreferenceSurface::new(repo, Arc::new(LinearDecay { radius_km: 1.0 }));
        let far = LatLng::new(19.0 + meters_to_lat(1500.0, 19.0), 72.8);
        assert_eq!(linear.preference(far), 0.0);
    }
}

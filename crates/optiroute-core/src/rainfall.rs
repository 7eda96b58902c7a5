//! Per-request rainfall snapshot with nearest-sample lookup.

use crate::models::{LatLng, RainfallSample};
use crate::spatial::haversine_km;

/// Offsets (degrees) around the city centre used to build the sample field.
pub const DEFAULT_OFFSETS_DEG: [(f64, f64); 5] = [
    (0.0, 0.0),
    (0.03, 0.03),
    (0.03, -0.03),
    (-0.03, 0.03),
    (-0.03, -0.03),
];

/// Sparse set of rainfall samples. An empty field reads as 0 mm everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RainfallField {
    samples: Vec<RainfallSample>,
}

impl RainfallField {
    pub fn new(samples: Vec<RainfallSample>) -> Self {
        Self { samples }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replicate one accumulation value at `center` plus each offset.
    pub fn around_center(center: LatLng, accumulated_mm: f64, offsets: &[(f64, f64)]) -> Self {
        let samples = offsets
            .iter()
            .map(|(dlat, dlng)| {
                RainfallSample::new(center.lat + dlat, center.lng + dlng, accumulated_mm)
            })
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[RainfallSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Accumulation of the nearest sample. Exact distance ties keep the
    /// earliest sample.
    pub fn sample_at(&self, point: LatLng) -> f64 {
        let point = point.normalized();
        let mut best: Option<(f64, f64)> = None;
        for sample in &self.samples {
            let distance = haversine_km(point, sample.location());
            match best {
                Some((best_distance, _)) if distance >= best_distance => {}
                _ => best = Some((distance, sample.accumulated_mm)),
            }
        }
        best.map(|(_, mm)| mm).unwrap_or(0.0)
    }

    pub fn mean_accumulation(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self.samples.iter().map(|s| s.accumulated_mm).sum();
        total / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_reads_zero() {
        assert_eq!(RainfallField::empty().sample_at(LatLng::new(19.0, 72.8)), 0.0);
        assert_eq!(RainfallField::empty().mean_accumulation(), 0.0);
    }

    #[test]
    fn picks_nearest_sample() {
        let field = RainfallField::new(vec![
            RainfallSample::new(19.0, 72.8, 5.0),
            RainfallSample::new(19.1, 72.9, 40.0),
        ]);
        assert_eq!(field.sample_at(LatLng::new(19.01, 72.81)), 5.0);
        assert_eq!(field.sample_at(LatLng::new(19.09, 72.88)), 40.0);
    }

    #[test]
    fn exact_tie_resolves_to_first_sample() {
        // Quarter-degree offsets are exact in binary, so both distances match bit for bit.
        let field = RainfallField::new(vec![
            RainfallSample::new(19.0, 72.75, 7.0),
            RainfallSample::new(19.0, 72.25, 70.0),
        ]);
        assert_eq!(field.sample_at(LatLng::new(19.0, 72.5)), 7.0);

        let reversed = RainfallField::new(vec![
            RainfallSample::new(19.0, 72.25, 70.0),
            RainfallSample::new(19.0, 72.75, 7.0),
        ]);
        assert_eq!(reversed.sample_at(LatLng::new(19.0, 72.5)), 70.0);
    }

    #[test]
    fn around_center_builds_five_samples() {
        let field = RainfallField::around_center(LatLng::new(19.076, 72.8777), 12.0, &DEFAULT_OFFSETS_DEG);
        assert_eq!(field.samples().len(), 5);
        assert_eq!(field.mean_accumulation(), 12.0);
        assert_eq!(field.sample_at(LatLng::new(19.2, 73.0)), 12.0);
    }
}

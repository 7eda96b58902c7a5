//! Exclusion geometry for steering the external directions provider.
//!
//! Builds axis-aligned avoidance rectangles around the highest-preference
//! pivots, sized by a per-tier scale factor. Rectangles that overlap are
//! merged into their common bounding box so the output stays a set of
//! simple, disjoint polygons. The result is advisory only: the provider may
//! still route through it, and this crate never enforces it.
//!
//! A polygon that would enclose the request's origin or destination makes
//! the routing problem infeasible, so such polygons are cut back until the
//! endpoint lies outside by a clearance margin, or dropped.

use crate::models::{BoundingBox, ExclusionPolygon, LatLng};
use crate::preference::PreferenceSurface;
use crate::spatial::{meters_per_deg_lat, meters_per_deg_lon, meters_to_lat, meters_to_lon};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Avoidance intensity requested for a candidate route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionTier {
    Moderate,
    Strong,
}

impl fmt::Display for ExclusionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionTier::Moderate => f.write_str("moderate"),
            ExclusionTier::Strong => f.write_str("strong"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown exclusion tier '{0}' (expected 'moderate' or 'strong')")]
pub struct ParseTierError(String);

impl FromStr for ExclusionTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moderate" => Ok(ExclusionTier::Moderate),
            "strong" => Ok(ExclusionTier::Strong),
            other => Err(ParseTierError(other.to_string())),
        }
    }
}

/// Named parameters for one avoidance tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierProfile {
    /// Multiplier on `ExclusionRules::base_half_side_km`
    pub scale: f64,
    /// Maximum number of pivots to enclose
    pub pivot_count: usize,
    /// Pivots whose preference is below this are ignored
    pub min_preference: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionRules {
    /// Half side (km) of a rectangle at scale 1.0
    pub base_half_side_km: f64,
    pub moderate: TierProfile,
    pub strong: TierProfile,
    /// How far outside a cut polygon an endpoint must end up
    pub endpoint_clearance_km: f64,
    /// Rectangles narrower than twice this are dropped
    pub min_half_side_km: f64,
    /// Provider limit on a single avoidance polygon
    pub max_polygon_area_km2: f64,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            base_half_side_km: 3.3,
            moderate: TierProfile {
                scale: 0.5,
                pivot_count: 2,
                min_preference: 0.85,
            },
            strong: TierProfile {
                scale: 1.0,
                pivot_count: 4,
                min_preference: 0.5,
            },
            endpoint_clearance_km: 0.2,
            min_half_side_km: 0.25,
            max_polygon_area_km2: 200.0,
        }
    }
}

impl ExclusionRules {
    pub fn profile(&self, tier: ExclusionTier) -> &TierProfile {
        match tier {
            ExclusionTier::Moderate => &self.moderate,
            ExclusionTier::Strong => &self.strong,
        }
    }
}

/// Polygons produced for one request plus what had to be adjusted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionOutcome {
    pub polygons: Vec<ExclusionPolygon>,
    /// Polygons cut back to keep an endpoint outside
    pub shrunk: usize,
    /// Polygons discarded (outside the service area, or unroutable)
    pub dropped: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    names: Vec<String>,
    bounds: BoundingBox,
    anchor: LatLng,
}

#[derive(Debug, Clone)]
pub struct ExclusionGeometryBuilder {
    surface: PreferenceSurface,
    rules: ExclusionRules,
    service_bbox: BoundingBox,
}

impl ExclusionGeometryBuilder {
    pub fn new(surface: PreferenceSurface, rules: ExclusionRules, service_bbox: BoundingBox) -> Self {
        Self {
            surface,
            rules,
            service_bbox: service_bbox.normalized(),
        }
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Avoidance polygons for `tier` that keep both endpoints routable.
    pub fn build(&self, tier: ExclusionTier, origin: LatLng, destination: LatLng) -> Vec<ExclusionPolygon> {
        self.build_with_report(tier, origin, destination).polygons
    }

    pub fn build_with_report(
        &self,
        tier: ExclusionTier,
        origin: LatLng,
        destination: LatLng,
    ) -> ExclusionOutcome {
        let profile = self.rules.profile(tier);
        let half_side_km = self.rules.base_half_side_km * profile.scale.max(0.0);
        let mut outcome = ExclusionOutcome::default();
        if half_side_km < self.rules.min_half_side_km || profile.pivot_count == 0 {
            return outcome;
        }

        let candidates: Vec<Candidate> = self
            .surface
            .pivots()
            .highest(self.surface.pivots().len())
            .into_iter()
            .filter(|pivot| self.surface.preference(pivot.location()) >= profile.min_preference)
            .take(profile.pivot_count)
            .map(|pivot| Candidate {
                names: vec![pivot.name.clone()],
                bounds: square_around(pivot.location(), half_side_km),
                anchor: pivot.location(),
            })
            .collect();

        let origin = origin.normalized();
        let destination = destination.normalized();

        for candidate in merge_overlapping(candidates) {
            let Some(bounds) = candidate.bounds.intersection(&self.service_bbox) else {
                outcome.dropped += 1;
                continue;
            };
            let mut bounds = cap_area(bounds, self.rules.max_polygon_area_km2);

            let mut cut = false;
            let mut feasible = true;
            for endpoint in [origin, destination] {
                if !bounds.contains(endpoint) {
                    continue;
                }
                match self.cut_away(&bounds, endpoint, candidate.anchor) {
                    Some(next) => {
                        bounds = next;
                        cut = true;
                    }
                    None => {
                        feasible = false;
                        break;
                    }
                }
            }

            if !feasible || !self.wide_enough(&bounds) {
                outcome.dropped += 1;
                continue;
            }
            if cut {
                outcome.shrunk += 1;
            }
            outcome.polygons.push(ExclusionPolygon {
                pivot_name: candidate.names.join("+"),
                ring: bounds.ring(),
            });
        }

        outcome
    }

    /// Cut `bounds` on the side that leaves `endpoint` outside by the
    /// clearance margin, keeping the largest remainder (preferring ones that
    /// still cover `anchor`).
    fn cut_away(&self, bounds: &BoundingBox, endpoint: LatLng, anchor: LatLng) -> Option<BoundingBox> {
        let clearance_m = self.rules.endpoint_clearance_km * 1000.0;
        let clr_lat = meters_to_lat(clearance_m, endpoint.lat);
        let clr_lng = meters_to_lon(clearance_m, endpoint.lat);

        let options = [
            BoundingBox { max_lat: endpoint.lat - clr_lat, ..*bounds },
            BoundingBox { min_lat: endpoint.lat + clr_lat, ..*bounds },
            BoundingBox { max_lng: endpoint.lng - clr_lng, ..*bounds },
            BoundingBox { min_lng: endpoint.lng + clr_lng, ..*bounds },
        ];

        options
            .into_iter()
            .filter(|option| self.wide_enough(option) && !option.contains(endpoint))
            .max_by(|a, b| {
                a.contains(anchor)
                    .cmp(&b.contains(anchor))
                    .then_with(|| area_km2(a).total_cmp(&area_km2(b)))
            })
    }

    fn wide_enough(&self, bounds: &BoundingBox) -> bool {
        let min_side_m = self.rules.min_half_side_km * 2000.0;
        let mid_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
        let height_m = (bounds.max_lat - bounds.min_lat) * meters_per_deg_lat(mid_lat);
        let width_m = (bounds.max_lng - bounds.min_lng) * meters_per_deg_lon(mid_lat);
        height_m >= min_side_m && width_m >= min_side_m
    }
}

fn square_around(center: LatLng, half_side_km: f64) -> BoundingBox {
    let half_lat = meters_to_lat(half_side_km * 1000.0, center.lat);
    let half_lng = meters_to_lon(half_side_km * 1000.0, center.lat);
    BoundingBox::new(
        center.lat - half_lat,
        center.lng - half_lng,
        center.lat + half_lat,
        center.lng + half_lng,
    )
}

fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.min_lat <= b.max_lat && b.min_lat <= a.max_lat && a.min_lng <= b.max_lng && b.min_lng <= a.max_lng
}

fn union(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    BoundingBox::new(
        a.min_lat.min(b.min_lat),
        a.min_lng.min(b.min_lng),
        a.max_lat.max(b.max_lat),
        a.max_lng.max(b.max_lng),
    )
}

// Repeat until stable: a merged box can newly overlap an earlier one.
fn merge_overlapping(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    loop {
        let mut merged_any = false;
        let mut result: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(existing) = result
                .iter_mut()
                .find(|existing| overlaps(&existing.bounds, &candidate.bounds))
            {
                existing.bounds = union(&existing.bounds, &candidate.bounds);
                existing.names.extend(candidate.names);
                merged_any = true;
            } else {
                result.push(candidate);
            }
        }
        candidates = result;
        if !merged_any {
            return candidates;
        }
    }
}

fn area_km2(bounds: &BoundingBox) -> f64 {
    let mid_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
    let height_km = (bounds.max_lat - bounds.min_lat).max(0.0) * meters_per_deg_lat(mid_lat) / 1000.0;
    let width_km = (bounds.max_lng - bounds.min_lng).max(0.0) * meters_per_deg_lon(mid_lat) / 1000.0;
    height_km * width_km
}

fn cap_area(bounds: BoundingBox, max_area_km2: f64) -> BoundingBox {
    let area = area_km2(&bounds);
    if max_area_km2 <= 0.0 || area <= max_area_km2 {
        return bounds;
    }
    let factor = (max_area_km2 / area).sqrt();
    let center = bounds.center();
    let half_lat = (bounds.max_lat - bounds.min_lat) / 2.0 * factor;
    let half_lng = (bounds.max_lng - bounds.min_lng) / 2.0 * factor;
    BoundingBox::new(
        center.lat - half_lat,
        center.lng - half_lng,
        center.lat + half_lat,
        center.lng + half_lng,
    )
}

/// GeoJSON `MultiPolygon` for the provider's `avoid_polygons` option, or
/// `None` when there is nothing to avoid.
pub fn to_geojson(polygons: &[ExclusionPolygon]) -> Option<Value> {
    if polygons.is_empty() {
        return None;
    }
    let coordinates: Vec<Vec<Vec<[f64; 2]>>> = polygons
        .iter()
        .map(|polygon| vec![polygon.geojson_ring()])
        .collect();
    Some(json!({
        "type": "MultiPolygon",
        "coordinates": coordinates,
    }))
}

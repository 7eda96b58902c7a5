//! Side-by-side comparison of the fastest / balanced / safest candidates.

use crate::exclusion::ExclusionTier;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The three route options offered per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Fastest,
    Safer,
    Safest,
}

impl RouteKind {
    pub const ALL: [RouteKind; 3] = [RouteKind::Fastest, RouteKind::Safer, RouteKind::Safest];

    pub fn id(&self) -> &'static str {
        match self {
            RouteKind::Fastest => "fastest",
            RouteKind::Safer => "safer",
            RouteKind::Safest => "safest",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RouteKind::Fastest => "Fastest Route",
            RouteKind::Safer => "Balanced Route",
            RouteKind::Safest => "Safest Route",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RouteKind::Fastest => "#1E88E5",
            RouteKind::Safer => "#43A047",
            RouteKind::Safest => "#F4511E",
        }
    }

    /// Avoidance requested from the directions provider for this option.
    pub fn exclusion_tier(&self) -> Option<ExclusionTier> {
        match self {
            RouteKind::Fastest => None,
            RouteKind::Safer => Some(ExclusionTier::Moderate),
            RouteKind::Safest => Some(ExclusionTier::Strong),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonWeights {
    pub risk: f64,
    pub road: f64,
    pub distance: f64,
}

impl Default for ComparisonWeights {
    fn default() -> Self {
        Self {
            risk: 0.6,
            road: 0.3,
            distance: 0.1,
        }
    }
}

/// Measured inputs for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub kind: RouteKind,
    pub distance_m: f64,
    pub duration_s: f64,
    pub risk: f64,
    pub road_penalty: f64,
    #[serde(default)]
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAssessment {
    pub kind: RouteKind,
    pub score: f64,
    pub explanation: String,
}

/// Combined score and explanation for each candidate, in input order.
pub fn assess(candidates: &[RouteCandidate], weights: &ComparisonWeights) -> Vec<RouteAssessment> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let min_d = candidates
        .iter()
        .map(|c| c.distance_m)
        .fold(f64::INFINITY, f64::min);
    let max_d = candidates
        .iter()
        .map(|c| c.distance_m)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = (max_d - min_d).max(1.0);

    candidates
        .iter()
        .map(|candidate| {
            let distance_norm = (candidate.distance_m - min_d) / range;
            let score = weights.risk * candidate.risk
                + weights.road * candidate.road_penalty
                + weights.distance * distance_norm;
            RouteAssessment {
                kind: candidate.kind,
                score,
                explanation: explain(candidate, min_d),
            }
        })
        .collect()
}

fn explain(candidate: &RouteCandidate, min_distance_m: f64) -> String {
    let mut parts: Vec<String> = Vec::new();

    let longer_pct = (candidate.distance_m - min_distance_m) / min_distance_m.max(1.0) * 100.0;
    if longer_pct <= 1.0 {
        parts.push("Shortest distance".to_string());
    } else {
        parts.push(format!("{:.0}% longer than shortest route", longer_pct));
    }

    if candidate.insufficient_data {
        parts.push("Flood risk: insufficient data".to_string());
    } else {
        parts.push(format!("Flood risk: {:.0}%", candidate.risk * 100.0));
    }

    if candidate.road_penalty > 0.4 {
        parts.push(
            "Passes near known poor road conditions — expect delays or rough patches".to_string(),
        );
    } else if candidate.road_penalty > 0.1 {
        parts.push("Minor poor-road segments noted".to_string());
    }

    match candidate.kind {
        RouteKind::Fastest => parts.push("Good balance of speed".to_string()),
        RouteKind::Safer | RouteKind::Safest => {
            parts.push("Safer routing avoids hotspots".to_string())
        }
    }

    parts.join("; ")
}

/// Candidates ordered by ascending risk; ties fall back to distance.
/// Candidates without risk data sort last.
pub fn rank_by_risk(candidates: &[RouteCandidate]) -> Vec<RouteKind> {
    let mut sorted: Vec<&RouteCandidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| match (a.insufficient_data, b.insufficient_data) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => a
            .risk
            .total_cmp(&b.risk)
            .then_with(|| a.distance_m.total_cmp(&b.distance_m)),
    });
    sorted.into_iter().map(|c| c.kind).collect()
}

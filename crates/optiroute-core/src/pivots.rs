//! Immutable repository of risk pivots.
//!
//! A repository is built once (from a CSV dataset or a fixture list) and
//! shared read-only for the lifetime of the process. Severities outside
//! [0, 1] are clamped on construction rather than rejected.

use crate::models::Pivot;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Severity assumed when a CSV row leaves the column empty.
pub const DEFAULT_CSV_SEVERITY: f64 = 0.5;

#[derive(Debug, Error)]
pub enum PivotLoadError {
    #[error("pivot dataset not found at {0}")]
    NotFound(String),
    #[error("failed to read pivot dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Bookkeeping from building a repository, surfaced to callers for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub clamped: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PivotRepository {
    pivots: Vec<Pivot>,
    report: LoadReport,
}

#[derive(Debug, Deserialize)]
struct PivotRow {
    lat: f64,
    #[serde(alias = "lng")]
    lon: f64,
    #[serde(default)]
    severity: Option<f64>,
    #[serde(default)]
    name: Option<String>,
}

impl PivotRepository {
    /// Build a repository, clamping each severity into [0, 1].
    pub fn new(pivots: Vec<Pivot>) -> Self {
        let mut clamped = 0;
        let pivots: Vec<Pivot> = pivots
            .into_iter()
            .map(|mut pivot| {
                let severity = clamp_severity(pivot.severity);
                if severity != pivot.severity {
                    clamped += 1;
                }
                pivot.severity = severity;
                pivot
            })
            .collect();
        let report = LoadReport {
            loaded: pivots.len(),
            clamped,
            skipped: 0,
        };
        Self { pivots, report }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Read `lat,lon,severity[,name]` rows from a CSV file with a header.
    ///
    /// Rows that fail to parse are skipped and counted in the report.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, PivotLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PivotLoadError::NotFound(path.display().to_string()));
        }
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_csv_reader(reader)
    }

    /// Same as [`PivotRepository::from_csv_path`] for in-memory data.
    pub fn from_csv_str(data: &str) -> Result<Self, PivotLoadError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, PivotLoadError> {
        // Surface a broken header as an error instead of skipping every row.
        reader.headers()?;

        let mut pivots = Vec::new();
        let mut skipped = 0;
        for (index, row) in reader.deserialize::<PivotRow>().enumerate() {
            match row {
                Ok(row) if row.lat.is_finite() && row.lon.is_finite() => {
                    let name = row
                        .name
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| format!("pivot-{}", index + 1));
                    pivots.push(Pivot::new(
                        name,
                        row.lat,
                        row.lon,
                        row.severity.unwrap_or(DEFAULT_CSV_SEVERITY),
                    ));
                }
                _ => skipped += 1,
            }
        }

        let mut repository = Self::new(pivots);
        repository.report.skipped = skipped;
        Ok(repository)
    }

    /// Load from `path`, falling back to `fallback` when the dataset is
    /// missing, unreadable or empty. Never fails.
    pub fn load_or(path: impl AsRef<Path>, fallback: Vec<Pivot>) -> (Self, Option<PivotLoadError>) {
        match Self::from_csv_path(path) {
            Ok(repository) if !repository.is_empty() => (repository, None),
            Ok(_) => (Self::new(fallback), None),
            Err(err) => (Self::new(fallback), Some(err)),
        }
    }

    /// Load flood pivots, falling back to [`default_flood_pivots`].
    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, Option<PivotLoadError>) {
        Self::load_or(path, default_flood_pivots())
    }

    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    pub fn report(&self) -> LoadReport {
        self.report
    }

    pub fn max_severity(&self) -> f64 {
        self.pivots
            .iter()
            .map(|pivot| pivot.severity)
            .fold(0.0, f64::max)
    }

    /// Up to `n` pivots ordered by descending severity; equal severities keep
    /// load order.
    pub fn highest(&self, n: usize) -> Vec<&Pivot> {
        let mut sorted: Vec<&Pivot> = self.pivots.iter().collect();
        sorted.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        sorted.truncate(n);
        sorted
    }
}

fn clamp_severity(severity: f64) -> f64 {
    if !severity.is_finite() {
        return 0.0;
    }
    severity.clamp(0.0, 1.0)
}

/// Built-in Mumbai waterlogging hotspots used when no dataset is present.
pub fn default_flood_pivots() -> Vec<Pivot> {
    vec![
        Pivot::new("Hindmata", 19.0056, 72.8417, 0.95),
        Pivot::new("Andheri Subway", 19.1197, 72.8464, 0.90),
        Pivot::new("Kings Circle", 19.0286, 72.8553, 0.88),
        Pivot::new("Kurla", 19.0728, 72.8826, 0.85),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_severity() {
        let repo = PivotRepository::new(vec![
            Pivot::new("a", 19.0, 72.8, 1.4),
            Pivot::new("b", 19.1, 72.9, -0.2),
            Pivot::new("c", 19.2, 72.9, f64::NAN),
            Pivot::new("d", 19.3, 72.9, 0.4),
        ]);
        let severities: Vec<f64> = repo.pivots().iter().map(|p| p.severity).collect();
        assert_eq!(severities, vec![1.0, 0.0, 0.0, 0.4]);
        assert_eq!(repo.report().clamped, 3);
        assert_eq!(repo.report().loaded, 4);
    }

    #[test]
    fn parses_csv_and_skips_bad_rows() {
        let data = "lat,lon,severity,name\n\
                    19.0056,72.8417,0.95,Hindmata\n\
                    not-a-number,72.8,0.5,Broken\n\
                    19.0286,72.8553,,\n\
                    19.1197,72.8464,2.0,Andheri\n";
        let repo = PivotRepository::from_csv_str(data).expect("csv");
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.report().skipped, 1);
        assert_eq!(repo.report().clamped, 1);
        assert_eq!(repo.pivots()[0].name, "Hindmata");
        assert_eq!(repo.pivots()[1].severity, DEFAULT_CSV_SEVERITY);
        assert_eq!(repo.pivots()[1].name, "pivot-3");
        assert_eq!(repo.pivots()[2].severity, 1.0);
    }

    #[test]
    fn missing_dataset_falls_back() {
        let (repo, err) = PivotRepository::load_or_default("/nonexistent/flood_pivots.csv");
        assert!(matches!(err, Some(PivotLoadError::NotFound(_))));
        assert_eq!(repo.len(), 4);
        assert!((repo.max_severity() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn highest_orders_by_severity() {
        let repo = PivotRepository::new(default_flood_pivots());
        let names: Vec<&str> = repo.highest(2).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Hindmata", "Andheri Subway"]);
        assert!(PivotRepository::empty().highest(3).is_empty());
    }
}

use crate::error::{AppError, Result};
use crate::ml::features::{
    derive_risk, severity_score, to_matrix, FeatureVector, FEATURE_NAMES, N_FEATURES,
};
use crate::ml::models::{RiskLevel, SeverityLevel};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use strum::EnumCount;

/// Labelled feature matrix (n_samples × N_FEATURES)
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Raw, unscaled features
    pub features: Array2<f64>,

    /// Risk class per row
    pub risk: Vec<usize>,

    /// Severity class per row
    pub severity: Vec<usize>,
}

/// Row indices for the held-out evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Dataset {
    /// Build from raw features, deriving any missing label column
    pub fn from_parts(
        features: Array2<f64>,
        risk: Option<Vec<usize>>,
        severity: Option<Vec<usize>>,
    ) -> Result<Self> {
        if features.ncols() != N_FEATURES {
            return Err(AppError::Dataset(format!(
                "Expected {} feature columns, got {}",
                N_FEATURES,
                features.ncols()
            )));
        }

        let risk = match risk {
            Some(labels) => labels,
            None => derive_risk_labels(&features),
        };
        let severity = match severity {
            Some(labels) => labels,
            None => derive_severity_labels(&features),
        };

        if risk.len() != features.nrows() || severity.len() != features.nrows() {
            return Err(AppError::Dataset(
                "Label columns do not match the number of rows".to_string(),
            ));
        }

        Ok(Self {
            features,
            risk,
            severity,
        })
    }

    /// Draw `n` rows of plausible vitals from fixed distributions
    pub fn synthesize(n: usize, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let temperature = Normal::new(37.0, 1.5)
            .map_err(|e| AppError::Dataset(format!("Invalid temperature distribution: {}", e)))?;

        let rows: Vec<FeatureVector> = (0..n)
            .map(|_| FeatureVector {
                age: rng.gen_range(0..100),
                temperature: round_to(temperature.sample(&mut rng), 1),
                heart_rate: rng.gen_range(60..120),
                bp_sys: rng.gen_range(90..180),
                bp_dia: rng.gen_range(60..110),
                oxygen_sat: rng.gen_range(85..100),
                symptoms_count: rng.gen_range(0..8),
                chronic_conditions: rng.gen_range(0..4),
                region_risk_index: round_to(rng.gen::<f64>(), 2),
                days_since_onset: rng.gen_range(0..14),
            })
            .collect();

        tracing::debug!(rows = n, seed, "Synthesized dataset");

        Self::from_parts(to_matrix(&rows), None, None)
    }

    /// Read a CSV with the ten feature columns and optional label columns.
    ///
    /// Columns are matched by header name; extra columns are ignored.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| AppError::Dataset(format!("Failed to open {}: {}", path.display(), e)))?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let feature_columns: Vec<usize> = FEATURE_NAMES
            .iter()
            .map(|&name| {
                column(name).ok_or_else(|| {
                    AppError::Dataset(format!(
                        "{} is missing feature column '{}'",
                        path.display(),
                        name
                    ))
                })
            })
            .collect::<Result<_>>()?;
        let risk_column = column("risk");
        let severity_column = column("severity");

        let mut data = Vec::new();
        let mut risk = risk_column.map(|_| Vec::new());
        let mut severity = severity_column.map(|_| Vec::new());
        let mut n_rows = 0;

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = line + 2;

            for (&idx, name) in feature_columns.iter().zip(FEATURE_NAMES.iter()) {
                data.push(parse_cell(&record, idx, name, line)?);
            }
            if let (Some(idx), Some(labels)) = (risk_column, risk.as_mut()) {
                labels.push(parse_label(&record, idx, "risk", RiskLevel::COUNT, line)?);
            }
            if let (Some(idx), Some(labels)) = (severity_column, severity.as_mut()) {
                labels.push(parse_label(
                    &record,
                    idx,
                    "severity",
                    SeverityLevel::COUNT,
                    line,
                )?);
            }
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(AppError::Dataset(format!(
                "{} contains no rows",
                path.display()
            )));
        }

        let features = Array2::from_shape_vec((n_rows, N_FEATURES), data)
            .map_err(|e| AppError::Dataset(format!("Failed to build feature matrix: {}", e)))?;

        tracing::info!(
            path = %path.display(),
            rows = n_rows,
            derived_risk = risk.is_none(),
            derived_severity = severity.is_none(),
            "Loaded dataset"
        );

        Self::from_parts(features, risk, severity)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Shuffle row indices with `seed` and hold out `ceil(n * test_size)` rows
    pub fn split_indices(&self, test_size: f64, seed: u64) -> Result<SplitIndices> {
        if !(0.0..1.0).contains(&test_size) {
            return Err(AppError::Validation(format!(
                "test_size must be in [0, 1), got {}",
                test_size
            )));
        }

        let n = self.n_samples();
        let n_test = (n as f64 * test_size).ceil() as usize;
        if n_test >= n {
            return Err(AppError::Dataset(format!(
                "{} rows are too few for a {} test split",
                n, test_size
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok(SplitIndices {
            train,
            test: indices,
        })
    }

    /// Copy out the rows at `indices`, keeping both label sets aligned
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            risk: indices.iter().map(|&i| self.risk[i]).collect(),
            severity: indices.iter().map(|&i| self.severity[i]).collect(),
        }
    }
}

fn derive_risk_labels(features: &Array2<f64>) -> Vec<usize> {
    features
        .rows()
        .into_iter()
        .map(|row| derive_risk(&row.to_vec()))
        .collect()
}

fn derive_severity_labels(features: &Array2<f64>) -> Vec<usize> {
    let scores: Vec<f64> = features
        .rows()
        .into_iter()
        .map(|row| severity_score(&row.to_vec()))
        .collect();
    quantile_bins(&scores, SeverityLevel::COUNT)
}

/// Equal-frequency binning into `n_bins` buckets.
///
/// Edges are interpolated quantiles; buckets are right-inclusive, so a value
/// equal to an edge falls in the lower bucket.
pub fn quantile_bins(values: &[f64], n_bins: usize) -> Vec<usize> {
    if values.is_empty() || n_bins == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let edges: Vec<f64> = (1..n_bins)
        .map(|k| quantile(&sorted, k as f64 / n_bins as f64))
        .collect();

    values
        .iter()
        .map(|&v| edges.iter().take_while(|&&edge| v > edge).count())
        .collect()
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn parse_cell(record: &csv::StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("");
    let value = raw.parse::<f64>().map_err(|_| {
        AppError::Dataset(format!(
            "Line {}: column '{}' has non-numeric value '{}'",
            line, name, raw
        ))
    })?;
    if !value.is_finite() {
        return Err(AppError::Dataset(format!(
            "Line {}: column '{}' has non-finite value '{}'",
            line, name, raw
        )));
    }
    Ok(value)
}

fn parse_label(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    n_classes: usize,
    line: usize,
) -> Result<usize> {
    let value = parse_cell(record, idx, name, line)?;
    if value.fract() != 0.0 || value < 0.0 || value >= n_classes as f64 {
        return Err(AppError::Dataset(format!(
            "Line {}: label '{}' must be an integer in 0..{}, got {}",
            line, name, n_classes, value
        )));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "age,temperature,heart_rate,bp_sys,bp_dia,oxygen_sat,symptoms_count,chronic_conditions,region_risk_index,days_since_onset";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_synthesize_row_count_and_ranges() {
        let dataset = Dataset::synthesize(2000, 42).unwrap();
        assert_eq!(dataset.n_samples(), 2000);
        assert_eq!(dataset.risk.len(), 2000);
        assert_eq!(dataset.severity.len(), 2000);

        for row in dataset.features.rows() {
            assert!((0.0..100.0).contains(&row[0]));
            assert!((85.0..100.0).contains(&row[5]));
            assert!((0.0..=1.0).contains(&row[8]));
        }
        assert!(dataset.risk.iter().all(|&r| r < 2));
        assert!(dataset.severity.iter().all(|&s| s < 3));
    }

    #[test]
    fn test_synthesize_is_reproducible() {
        let a = Dataset::synthesize(100, 7).unwrap();
        let b = Dataset::synthesize(100, 7).unwrap();
        let c = Dataset::synthesize(100, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.features, c.features);
    }

    #[test]
    fn test_quantile_bins_equal_frequency() {
        let values: Vec<f64> = (0..9).map(|v| v as f64).collect();
        let bins = quantile_bins(&values, 3);
        assert_eq!(bins, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_quantile_bins_edge_goes_low() {
        // Edges at 1/3 and 2/3 quantiles of [0, 1, 2, 3] are 1.0 and 2.0
        let bins = quantile_bins(&[0.0, 1.0, 2.0, 3.0], 3);
        assert_eq!(bins, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_quantile_bins_constant_input() {
        assert_eq!(quantile_bins(&[5.0; 4], 3), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let dataset = Dataset::synthesize(2000, 42).unwrap();
        let split = dataset.split_indices(0.2, 42).unwrap();

        assert_eq!(split.test.len(), 400);
        assert_eq!(split.train.len(), 1600);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..2000).collect::<Vec<_>>());

        assert_eq!(split, dataset.split_indices(0.2, 42).unwrap());
    }

    #[test]
    fn test_select_keeps_labels_aligned() {
        let dataset = Dataset::synthesize(50, 1).unwrap();
        let subset = dataset.select(&[3, 10]);
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.risk, vec![dataset.risk[3], dataset.risk[10]]);
        assert_eq!(subset.severity, vec![dataset.severity[3], dataset.severity[10]]);
        assert_eq!(subset.features.row(1), dataset.features.row(10));
    }

    #[test]
    fn test_from_csv_derives_missing_labels() {
        let csv = format!(
            "{},source\n70,37.0,80,120,80,98,1,0,0.5,2,kaggle\n30,39.5,100,120,80,90,4,3,0.2,5,kaggle\n20,36.5,70,110,70,99,0,0,0.1,1,kaggle\n",
            HEADER
        );
        let file = write_csv(&csv);
        let dataset = Dataset::from_csv(file.path()).unwrap();

        assert_eq!(dataset.n_samples(), 3);
        assert_eq!(dataset.risk, vec![1, 1, 0]);
        assert_eq!(dataset.severity[1], 2);
        assert_eq!(dataset.severity[2], 0);
    }

    #[test]
    fn test_from_csv_keeps_given_labels() {
        let csv = format!(
            "risk,{},severity\n0,70,37.0,80,120,80,98,1,0,0.5,2,2\n1,20,36.5,70,110,70,99,0,0,0.1,1,1\n",
            HEADER
        );
        let file = write_csv(&csv);
        let dataset = Dataset::from_csv(file.path()).unwrap();

        assert_eq!(dataset.risk, vec![0, 1]);
        assert_eq!(dataset.severity, vec![2, 1]);
        assert_eq!(dataset.features[[0, 0]], 70.0);
    }

    #[test]
    fn test_from_csv_missing_column_fails() {
        let file = write_csv("age,temperature\n45,38.5\n");
        let err = Dataset::from_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("heart_rate"));
    }

    #[test]
    fn test_from_csv_rejects_bad_label() {
        let csv = format!("{},risk\n70,37.0,80,120,80,98,1,0,0.5,2,3\n", HEADER);
        let file = write_csv(&csv);
        assert!(matches!(
            Dataset::from_csv(file.path()),
            Err(AppError::Dataset(_))
        ));
    }

    #[test]
    fn test_from_csv_rejects_non_finite_values() {
        for bad in ["NaN", "inf", "-inf"] {
            let csv = format!(
                "{}\n45,37.0,80,120,80,98,1,0,0.5,2\n50,{},80,120,80,98,1,0,0.5,2\n",
                HEADER, bad
            );
            let file = write_csv(&csv);
            match Dataset::from_csv(file.path()) {
                Err(AppError::Dataset(msg)) => {
                    assert!(msg.contains("Line 3"), "{}", msg);
                    assert!(msg.contains("temperature"), "{}", msg);
                }
                other => panic!("{} accepted: {:?}", bad, other.map(|d| d.n_samples())),
            }
        }
    }

    #[test]
    fn test_from_csv_missing_file_fails() {
        assert!(matches!(
            Dataset::from_csv("/nonexistent/final_dataset.csv"),
            Err(AppError::Dataset(_))
        ));
    }
}

use crate::error::{AppError, Result};
use crate::ml::metrics::ModelMetrics;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Fit on a standardized feature matrix and class indices
    fn fit(&mut self, features: &Array2<f64>, labels: &[usize]) -> Result<()>;

    /// Predict class indices
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>>;

    /// Check if model is trained
    fn is_trained(&self) -> bool;

    /// Score predictions on a held-out set
    fn evaluate(
        &self,
        features: &Array2<f64>,
        labels: &[usize],
        class_names: &[String],
    ) -> Result<ModelMetrics> {
        let predictions = self.predict(features)?;
        Ok(ModelMetrics::calculate(labels, &predictions, class_names))
    }
}

type Forest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Random forest over standardized vitals
#[derive(Serialize, Deserialize)]
pub struct ForestClassifier {
    /// Number of trees
    n_trees: u16,

    /// Seed for bootstrap sampling and feature subsets
    seed: u64,

    /// Number of classes
    n_classes: usize,

    /// Trained model
    model: Option<Forest>,
}

impl ForestClassifier {
    pub fn new(n_classes: usize, n_trees: u16, seed: u64) -> Self {
        Self {
            n_trees,
            seed,
            n_classes,
            model: None,
        }
    }

    pub fn n_trees(&self) -> u16 {
        self.n_trees
    }

    fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
        let shape = arr.shape();
        let data: Vec<f64> = arr.iter().copied().collect();
        DenseMatrix::new(shape[0], shape[1], data, false)
    }

    fn vec_to_labels(vec: &[usize]) -> Vec<i32> {
        vec.iter().map(|&x| x as i32).collect()
    }
}

impl Classifier for ForestClassifier {
    fn fit(&mut self, features: &Array2<f64>, labels: &[usize]) -> Result<()> {
        if features.nrows() != labels.len() {
            return Err(AppError::Training(format!(
                "Feature rows ({}) and labels ({}) differ in length",
                features.nrows(),
                labels.len()
            )));
        }
        if labels.is_empty() {
            return Err(AppError::Training("No training samples".to_string()));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= self.n_classes) {
            return Err(AppError::Training(format!(
                "Label {} outside 0..{}",
                bad, self.n_classes
            )));
        }

        let x = Self::ndarray_to_densematrix(features);
        let y = Self::vec_to_labels(labels);

        let params = RandomForestClassifierParameters::default()
            .with_n_trees(self.n_trees)
            .with_seed(self.seed);

        let model = RandomForestClassifier::fit(&x, &y, params)
            .map_err(|e| AppError::Training(format!("Failed to train random forest: {}", e)))?;

        self.model = Some(model);

        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| AppError::Internal("Model not trained".to_string()))?;

        let x = Self::ndarray_to_densematrix(features);
        let predictions = model
            .predict(&x)
            .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;

        Ok(predictions.iter().map(|&x| x as usize).collect())
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Array2<f64>, Vec<usize>) {
        let mut x = Array2::zeros((n, 2));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let class = i % 3;
            x[[i, 0]] = class as f64 * 10.0 + (i % 5) as f64 * 0.1;
            x[[i, 1]] = (i % 7) as f64;
            y.push(class);
        }
        (x, y)
    }

    #[test]
    fn test_forest_learns_separable_classes() {
        let (x, y) = separable(90);
        let mut forest = ForestClassifier::new(3, 15, 42);

        assert!(!forest.is_trained());
        forest.fit(&x, &y).unwrap();
        assert!(forest.is_trained());

        let names: Vec<String> = (0..3).map(|i| i.to_string()).collect();
        let metrics = forest.evaluate(&x, &y, &names).unwrap();
        assert!(metrics.accuracy > 0.95);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let forest = ForestClassifier::new(2, 5, 42);
        assert!(forest.predict(&Array2::zeros((1, 2))).is_err());
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        let (x, _) = separable(10);
        let mut forest = ForestClassifier::new(3, 5, 42);
        assert!(forest.fit(&x, &[0, 1]).is_err());
    }

    #[test]
    fn test_fit_rejects_out_of_range_label() {
        let (x, mut y) = separable(9);
        y[0] = 7;
        let mut forest = ForestClassifier::new(3, 5, 42);
        assert!(matches!(forest.fit(&x, &y), Err(AppError::Training(_))));
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable(60);
        let mut a = ForestClassifier::new(3, 10, 7);
        let mut b = ForestClassifier::new(3, 10, 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(
            bincode::serialize(&a).unwrap(),
            bincode::serialize(&b).unwrap()
        );
    }
}

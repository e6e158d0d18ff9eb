//! Bagged decision-tree ensemble used as the default direction classifier.
//!
//! Each member is a smartcore `DecisionTreeClassifier` fitted on a bootstrap
//! sample of the rows and a random subset of the feature columns. The
//! positive-class probability is the share of members voting "up".

use super::classifier::{Classifier, validate_training_input};
use crate::domain::errors::ModelError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use tracing::debug;

type Tree = DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub min_samples_split: usize,
    pub max_depth: Option<u16>,
    /// Columns drawn per tree. `None` means ceil(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            min_samples_split: 200,
            max_depth: None,
            max_features: None,
            seed: 1,
        }
    }
}

impl RandomForestParams {
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<u16>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn features_per_tree(&self, n_features: usize) -> usize {
        let k = self
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize);
        k.clamp(1, n_features.max(1))
    }
}

/// Rows and columns one ensemble member is trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSample {
    pub rows: Vec<usize>,
    pub features: Vec<usize>,
}

/// Draws a bootstrap sample of `n_rows` rows (with replacement) and
/// `n_selected` distinct columns, sorted ascending.
pub fn draw_tree_sample(
    rng: &mut StdRng,
    n_rows: usize,
    n_features: usize,
    n_selected: usize,
) -> TreeSample {
    let rows = (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect();
    let mut features = rand::seq::index::sample(rng, n_features, n_selected).into_vec();
    features.sort_unstable();
    TreeSample { rows, features }
}

enum Member {
    Tree { tree: Tree, features: Vec<usize> },
    /// Bootstrap sample held a single class
    Constant(u8),
}

pub struct RandomForestClassifier {
    params: RandomForestParams,
    members: Vec<Member>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            members: Vec::new(),
            n_features: None,
        }
    }

    fn tree_params(&self) -> DecisionTreeClassifierParameters {
        let params = DecisionTreeClassifierParameters::default()
            .with_min_samples_split(self.params.min_samples_split);
        match self.params.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None => params,
        }
    }

    fn fit_member(
        &self,
        features: &[Vec<f64>],
        labels: &[u8],
        sample: &TreeSample,
    ) -> Result<Member, ModelError> {
        let y: Vec<i32> = sample.rows.iter().map(|&r| labels[r] as i32).collect();
        let first = y[0];
        if y.iter().all(|&l| l == first) {
            return Ok(Member::Constant(first as u8));
        }

        let x = project(features, &sample.rows, &sample.features);
        let x = DenseMatrix::from_2d_vec(&x).map_err(|e| ModelError::TrainingFailed {
            reason: format!("Matrix error: {}", e),
        })?;
        let tree = DecisionTreeClassifier::fit(&x, &y, self.tree_params()).map_err(|e| {
            ModelError::TrainingFailed {
                reason: e.to_string(),
            }
        })?;

        Ok(Member::Tree {
            tree,
            features: sample.features.clone(),
        })
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(RandomForestParams::default())
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), ModelError> {
        validate_training_input(features, labels)?;
        if self.params.n_trees == 0 {
            return Err(ModelError::InvalidInput {
                reason: "n_trees must be > 0".to_string(),
            });
        }

        let n_rows = features.len();
        let n_features = features[0].len();
        self.members.clear();
        self.n_features = None;

        if labels.iter().all(|&l| l == labels[0]) {
            debug!(
                "Training labels are all {}; forest degenerates to a constant",
                labels[0]
            );
            self.members.push(Member::Constant(labels[0]));
            self.n_features = Some(n_features);
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let per_tree = self.params.features_per_tree(n_features);
        let mut members = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let sample = draw_tree_sample(&mut rng, n_rows, n_features, per_tree);
            members.push(self.fit_member(features, labels, &sample)?);
        }

        debug!(
            "Fitted {} trees on {} rows x {} features ({} per tree)",
            members.len(),
            n_rows,
            n_features,
            per_tree
        );
        self.members = members;
        self.n_features = Some(n_features);
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = features.iter().find(|r| r.len() != n_features) {
            return Err(ModelError::InvalidInput {
                reason: format!("expected {} features, got {}", n_features, row.len()),
            });
        }

        let all_rows: Vec<usize> = (0..features.len()).collect();
        let mut up_votes = vec![0usize; features.len()];

        for member in &self.members {
            match member {
                Member::Constant(label) => {
                    if *label == 1 {
                        up_votes.iter_mut().for_each(|v| *v += 1);
                    }
                }
                Member::Tree {
                    tree,
                    features: cols,
                } => {
                    let x = DenseMatrix::from_2d_vec(&project(features, &all_rows, cols))
                        .map_err(|e| ModelError::PredictionFailed {
                            reason: format!("Matrix error: {}", e),
                        })?;
                    let votes: Vec<i32> =
                        tree.predict(&x).map_err(|e| ModelError::PredictionFailed {
                            reason: e.to_string(),
                        })?;
                    for (count, vote) in up_votes.iter_mut().zip(votes) {
                        if vote == 1 {
                            *count += 1;
                        }
                    }
                }
            }
        }

        let n_members = self.members.len() as f64;
        Ok(up_votes.into_iter().map(|v| v as f64 / n_members).collect())
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }
}

fn project(features: &[Vec<f64>], rows: &[usize], cols: &[usize]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|&r| cols.iter().map(|&c| features[r][c]).collect())
        .collect()
}

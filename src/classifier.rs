//! Pre-trained classifier artifacts and inference
//!
//! The trained model is an externally-produced artifact consumed as a black
//! box: a random forest serialized as JSON, paired with a feature-list
//! artifact naming the features the model expects, in order. Both are
//! loaded once into a [`ClassifierHandle`] and passed explicitly into the
//! classification step; nothing resolves paths implicitly at predict time.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;
use crate::types::{Prediction, SessionFeatures};

/// A random forest: ordered class labels plus an ensemble of trees.
///
/// Class probabilities are the mean of the per-tree normalized leaf
/// distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    /// Class labels, in the order probabilities are reported
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

/// One decision tree, stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Branch left when `x[feature] <= threshold`, else right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding per-class sample weights
    Leaf { weights: Vec<f64> },
}

impl DecisionTree {
    /// Walk from the root to a leaf. Traversal is bounded by the node
    /// count, so a malformed artifact with a cycle fails instead of
    /// spinning.
    fn traverse<'a>(&'a self, x: &[f64]) -> Result<&'a [f64], PipelineError> {
        let mut index = 0usize;
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(index).ok_or_else(|| {
                PipelineError::ArtifactLoad(format!("tree node index {} out of range", index))
            })?;
            match node {
                TreeNode::Leaf { weights } => return Ok(weights),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(*feature).copied().ok_or_else(|| {
                        PipelineError::ArtifactLoad(format!(
                            "split references feature index {} but the model takes {} features",
                            feature,
                            x.len()
                        ))
                    })?;
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
        Err(PipelineError::ArtifactLoad(
            "tree traversal did not terminate".to_string(),
        ))
    }
}

impl ForestModel {
    /// Per-class probabilities for one feature vector.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if self.classes.is_empty() || self.trees.is_empty() {
            return Err(PipelineError::ArtifactLoad(
                "model has no classes or no trees".to_string(),
            ));
        }

        let mut probabilities = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let weights = tree.traverse(x)?;
            if weights.len() != self.classes.len() {
                return Err(PipelineError::ArtifactLoad(format!(
                    "leaf has {} weights for {} classes",
                    weights.len(),
                    self.classes.len()
                )));
            }
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(PipelineError::ArtifactLoad(
                    "leaf has non-positive weight sum".to_string(),
                ));
            }
            for (p, w) in probabilities.iter_mut().zip(weights) {
                *p += w / total;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in &mut probabilities {
            *p /= n_trees;
        }
        Ok(probabilities)
    }
}

/// A loaded model plus its expected feature ordering.
#[derive(Debug, Clone)]
pub struct ClassifierHandle {
    model: ForestModel,
    feature_names: Vec<String>,
}

impl ClassifierHandle {
    /// Bundle a model with its feature list. Fails fast when the list
    /// names a feature the extractor never computes.
    pub fn new(model: ForestModel, feature_names: Vec<String>) -> Result<Self, PipelineError> {
        let unknown: Vec<&str> = feature_names
            .iter()
            .map(String::as_str)
            .filter(|name| !SessionFeatures::FIELD_ORDER.iter().any(|field| field == name))
            .collect();
        if !unknown.is_empty() {
            return Err(PipelineError::ArtifactMismatch(unknown.join(", ")));
        }
        Ok(Self {
            model,
            feature_names,
        })
    }

    /// Parse both artifacts from JSON text.
    pub fn from_json(model_json: &str, features_json: &str) -> Result<Self, PipelineError> {
        let model: ForestModel = serde_json::from_str(model_json)
            .map_err(|e| PipelineError::ArtifactLoad(format!("model artifact: {}", e)))?;
        let feature_names: Vec<String> = serde_json::from_str(features_json)
            .map_err(|e| PipelineError::ArtifactLoad(format!("feature-list artifact: {}", e)))?;
        Self::new(model, feature_names)
    }

    /// Load both artifacts from disk.
    pub fn load(model_path: &Path, features_path: &Path) -> Result<Self, PipelineError> {
        let model_json = std::fs::read_to_string(model_path).map_err(|e| {
            PipelineError::ArtifactLoad(format!("{}: {}", model_path.display(), e))
        })?;
        let features_json = std::fs::read_to_string(features_path).map_err(|e| {
            PipelineError::ArtifactLoad(format!("{}: {}", features_path.display(), e))
        })?;
        Self::from_json(&model_json, &features_json)
    }

    pub fn classes(&self) -> &[String] {
        &self.model.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Classify a session feature vector.
    pub fn predict(&self, features: &SessionFeatures) -> Result<Prediction, PipelineError> {
        let x = self.feature_vector(features);
        let probabilities = self.model.predict_proba(&x)?;

        let (best, confidence) = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |(bi, bp), (i, p)| {
                if *p > bp {
                    (i, *p)
                } else {
                    (bi, bp)
                }
            });

        Ok(Prediction {
            label: self.model.classes[best].clone(),
            confidence,
            probabilities: self
                .model
                .classes
                .iter()
                .cloned()
                .zip(probabilities)
                .collect(),
        })
    }

    /// Select the model's features in its expected order. Undefined (NaN)
    /// values are substituted with zero so the classifier stays total over
    /// degenerate sessions, but each substitution changes the prediction
    /// silently, so it is logged at warning level.
    fn feature_vector(&self, features: &SessionFeatures) -> Vec<f64> {
        self.feature_names
            .iter()
            .map(|name| {
                // Validated against FIELD_ORDER in new(), so get() cannot miss
                let value = features.get(name).unwrap_or(f64::NAN);
                if value.is_nan() {
                    log::warn!(
                        "feature {} is undefined for this session; substituting 0 before inference",
                        name
                    );
                    0.0
                } else {
                    value
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Two-class stump forest over (session_time_min, num_bouts): the
    /// first tree splits on feature 0, the second on feature 1.
    fn fixture_model() -> ForestModel {
        ForestModel {
            classes: vec!["explorer".to_string(), "hesitant".to_string()],
            trees: vec![
                DecisionTree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 0,
                            threshold: 5.0,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf {
                            weights: vec![1.0, 9.0],
                        },
                        TreeNode::Leaf {
                            weights: vec![8.0, 2.0],
                        },
                    ],
                },
                DecisionTree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 1,
                            threshold: 3.0,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf {
                            weights: vec![2.0, 8.0],
                        },
                        TreeNode::Leaf {
                            weights: vec![9.0, 1.0],
                        },
                    ],
                },
            ],
        }
    }

    fn fixture_feature_names() -> Vec<String> {
        vec!["session_time_min".to_string(), "num_bouts".to_string()]
    }

    fn make_features(session_time_min: f64, num_bouts: u32) -> SessionFeatures {
        SessionFeatures {
            session_time_min,
            active_time_min: 0.0,
            moving_time_min: 0.0,
            avg_path_length: 0.0,
            hist_fr: 0.0,
            hist_f: 0.0,
            hist_fl: 0.0,
            hist_bl: 0.0,
            hist_b: 0.0,
            hist_br: 0.0,
            path_ft: 0.0,
            hist_joy_per6_fr: 0.0,
            hist_joy_per6_f: 0.0,
            hist_joy_per6_fl: 0.0,
            hist_joy_per6_bl: 0.0,
            hist_joy_per6_b: 0.0,
            hist_joy_per6_br: 0.0,
            num_bouts,
            mean_bout_duration_s: 0.0,
            max_bout_duration_s: 0.0,
            joy_activations: 0,
            joy_attempts: 0,
            activation_ratio: 0.0,
            per_max_mean: 0.0,
            per_max_std: 0.0,
            per_move_2s: 0.0,
            angle_range_mean: 0.0,
            move_mean_dur: 0.0,
            joy_count_norm: 0.0,
            move_count_norm: 0.0,
            path_length_avg_norm: 0.0,
            path_efficiency: 0.0,
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let handle = ClassifierHandle::new(fixture_model(), fixture_feature_names()).unwrap();
        let prediction = handle.predict(&make_features(10.0, 5)).unwrap();

        let total: f64 = prediction.probabilities.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let handle = ClassifierHandle::new(fixture_model(), fixture_feature_names()).unwrap();
        let prediction = handle.predict(&make_features(10.0, 5)).unwrap();

        let max = prediction
            .probabilities
            .iter()
            .map(|(_, p)| *p)
            .fold(f64::MIN, f64::max);
        assert_eq!(prediction.confidence, max);
    }

    #[test]
    fn test_prediction_follows_splits() {
        let handle = ClassifierHandle::new(fixture_model(), fixture_feature_names()).unwrap();

        // Long session, many bouts: both trees vote "explorer"
        let prediction = handle.predict(&make_features(10.0, 5)).unwrap();
        assert_eq!(prediction.label, "explorer");
        assert!((prediction.confidence - 0.85).abs() < 1e-9);

        // Short session, few bouts: both trees vote "hesitant"
        let prediction = handle.predict(&make_features(2.0, 1)).unwrap();
        assert_eq!(prediction.label, "hesitant");
        assert!((prediction.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_nan_features_zero_filled() {
        let handle = ClassifierHandle::new(fixture_model(), fixture_feature_names()).unwrap();
        let mut features = make_features(10.0, 5);
        features.session_time_min = f64::NAN;

        // Zero-fill sends feature 0 down the left branch of tree one
        let prediction = handle.predict(&features).unwrap();
        let zeroed = handle.predict(&make_features(0.0, 5)).unwrap();
        assert_eq!(prediction, zeroed);
    }

    #[test]
    fn test_unknown_feature_name_is_mismatch() {
        let err = ClassifierHandle::new(
            fixture_model(),
            vec!["session_time_min".to_string(), "wingspan".to_string()],
        )
        .unwrap_err();

        match err {
            PipelineError::ArtifactMismatch(names) => assert_eq!(names, "wingspan"),
            other => panic!("expected ArtifactMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_model_json_is_load_error() {
        let err = ClassifierHandle::from_json("{not json", "[\"num_bouts\"]").unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactLoad(_)));

        let model_json = serde_json::to_string(&fixture_model()).unwrap();
        let err = ClassifierHandle::from_json(&model_json, "{not json").unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactLoad(_)));
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let model_json = serde_json::to_string(&fixture_model()).unwrap();
        let features_json = serde_json::to_string(&fixture_feature_names()).unwrap();
        let handle = ClassifierHandle::from_json(&model_json, &features_json).unwrap();

        assert_eq!(handle.classes(), ["explorer", "hesitant"]);
        assert_eq!(handle.feature_names().len(), 2);

        let prediction = handle.predict(&make_features(10.0, 5)).unwrap();
        assert_eq!(prediction.label, "explorer");
    }

    #[test]
    fn test_empty_model_is_load_error() {
        let model = ForestModel {
            classes: vec!["a".to_string()],
            trees: vec![],
        };
        let err = model.predict_proba(&[0.0]).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactLoad(_)));
    }
}

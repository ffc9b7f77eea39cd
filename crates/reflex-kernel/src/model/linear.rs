//! Linear backend - byte-frequency features scored by a weight matrix.

use reflex_core::{ActionId, EncodedInput};
use serde::Deserialize;

use super::{Model, ModelBackend};
use crate::error::InferenceError;

/// One weight row per action id; the best-scoring row wins.
///
/// Input bytes are folded into `dims` buckets (`byte % dims`) and normalized
/// by input length.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    dims: usize,
    weights: Vec<Vec<f32>>,
    #[serde(default)]
    bias: Vec<f32>,
}

impl LinearModel {
    /// Build a model, rejecting shapes `predict` cannot score.
    pub fn new(dims: usize, weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self, String> {
        let model = Self {
            dims,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.weights.len()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.dims == 0 {
            return Err("dims must be positive".into());
        }
        if self.weights.is_empty() {
            return Err("weight matrix has no rows".into());
        }
        for (i, row) in self.weights.iter().enumerate() {
            if row.len() != self.dims {
                return Err(format!(
                    "row {i} has {} weights, expected {}",
                    row.len(),
                    self.dims
                ));
            }
            if row.iter().any(|w| !w.is_finite()) {
                return Err(format!("row {i} has non-finite weights"));
            }
        }
        if !self.bias.is_empty() && self.bias.len() != self.weights.len() {
            return Err(format!(
                "bias has {} entries for {} rows",
                self.bias.len(),
                self.weights.len()
            ));
        }
        Ok(())
    }

    /// Empty when `dims` is zero.
    pub fn features(&self, input: &[u8]) -> Vec<f32> {
        let mut buckets = vec![0.0f32; self.dims];
        if self.dims == 0 {
            return buckets;
        }
        for &byte in input {
            buckets[byte as usize % self.dims] += 1.0;
        }
        if !input.is_empty() {
            let len = input.len() as f32;
            for b in &mut buckets {
                *b /= len;
            }
        }
        buckets
    }

    pub fn scores(&self, input: &[u8]) -> Vec<f32> {
        let features = self.features(input);
        self.weights
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let dot: f32 = row.iter().zip(&features).map(|(w, x)| w * x).sum();
                let score = dot + self.bias.get(i).copied().unwrap_or(0.0);
                if score.is_nan() { f32::NEG_INFINITY } else { score }
            })
            .collect()
    }
}

impl Model for LinearModel {
    fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        let scores = self.scores(input.as_bytes());

        // First row wins ties.
        let mut best: Option<(usize, f32)> = None;
        for (i, score) in scores.into_iter().enumerate() {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        let (index, _) =
            best.ok_or_else(|| InferenceError::MalformedOutput("no scores produced".into()))?;
        u32::try_from(index)
            .map(ActionId)
            .map_err(|_| InferenceError::MalformedOutput(format!("row index {index} out of range")))
    }

    fn backend(&self) -> &'static str {
        ModelBackend::Linear.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> LinearModel {
        LinearModel {
            dims: 2,
            weights,
            bias,
        }
    }

    #[test]
    fn features_are_normalized_bucket_counts() {
        let m = model(vec![vec![0.0, 0.0]], vec![]);
        // 'a' = 97 (odd), 'b' = 98 (even)
        assert_eq!(m.features(b"aab"), vec![1.0 / 3.0, 2.0 / 3.0]);
    }

    #[test]
    fn highest_score_wins_and_ties_go_to_the_first_row() {
        let m = model(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![]);
        assert_eq!(m.predict(&EncodedInput::from(b"bb".as_slice())), Ok(ActionId(0)));
        assert_eq!(m.predict(&EncodedInput::from(b"aa".as_slice())), Ok(ActionId(1)));

        let tied = model(vec![vec![1.0, 1.0], vec![1.0, 1.0]], vec![]);
        assert_eq!(tied.predict(&EncodedInput::from(b"ab".as_slice())), Ok(ActionId(0)));
    }

    #[test]
    fn bias_shifts_the_decision() {
        let m = model(vec![vec![1.0, 0.0], vec![0.0, 0.0]], vec![0.0, 5.0]);
        assert_eq!(m.predict(&EncodedInput::from(b"bb".as_slice())), Ok(ActionId(1)));
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(model(vec![], vec![]).validate().is_err());
        assert!(model(vec![vec![1.0]], vec![]).validate().is_err());
        assert!(model(vec![vec![1.0, 2.0]], vec![1.0, 2.0]).validate().is_err());
        assert!(model(vec![vec![f32::NAN, 2.0]], vec![]).validate().is_err());
        assert!(model(vec![vec![1.0, 2.0]], vec![0.5]).validate().is_ok());
    }

    #[test]
    fn constructor_validates_the_shape() {
        assert!(LinearModel::new(0, vec![vec![]], vec![]).is_err());
        assert!(LinearModel::new(2, vec![vec![1.0]], vec![]).is_err());

        let m = LinearModel::new(2, vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![]).unwrap();
        assert_eq!((m.dims(), m.rows()), (2, 2));
        assert_eq!(m.predict(&EncodedInput::from(b"aa".as_slice())), Ok(ActionId(1)));
    }

    #[test]
    fn zero_dims_scores_without_panicking() {
        let m: LinearModel =
            serde_json::from_str(r#"{"dims": 0, "weights": [[], []]}"#).unwrap();
        assert!(m.features(b"attack").is_empty());
        assert_eq!(m.predict(&EncodedInput::from(b"attack".as_slice())), Ok(ActionId(0)));
    }
}

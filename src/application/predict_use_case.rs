// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
//   1. Load the trained model, config and channel stats
//   2. Load input samples (labels optional)
//   3. Predict, and report MAE when every input carries a label

use anyhow::Result;
use serde::Serialize;

use crate::data::loader::JsonlLoader;
use crate::domain::traits::SampleSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Predictor;

/// One prediction, with the label when the input had one
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub index:      usize,
    pub prediction: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target:     Option<Vec<f32>>,
}

pub struct PredictUseCase {
    predictor: Predictor,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str, epoch: Option<usize>) -> Result<Self> {
        let ckpt      = CheckpointManager::new(checkpoint_dir);
        let predictor = Predictor::from_checkpoint(&ckpt, epoch)?;
        Ok(Self { predictor })
    }

    pub fn run(&self, input: &str) -> Result<Vec<Prediction>> {
        let samples = JsonlLoader::new(input).load_all()?;
        if samples.is_empty() {
            tracing::warn!("No input samples found in '{}'", input);
            return Ok(Vec::new());
        }

        let outputs = self.predictor.predict(&samples)?;

        Ok(samples
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(index, (sample, prediction))| Prediction {
                index,
                prediction,
                target: sample.is_labelled().then_some(sample.targets),
            })
            .collect())
    }
}

/// Mean absolute error over predictions that have a target.
/// None when no prediction is labelled.
pub fn mean_absolute_error(predictions: &[Prediction]) -> Option<f64> {
    let mut sum   = 0.0f64;
    let mut count = 0usize;

    for p in predictions {
        if let Some(target) = &p.target {
            for (y, t) in p.prediction.iter().zip(target) {
                sum   += (*y as f64 - *t as f64).abs();
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae_ignores_unlabelled() {
        let preds = vec![
            Prediction { index: 0, prediction: vec![1.0], target: Some(vec![2.0]) },
            Prediction { index: 1, prediction: vec![5.0], target: None },
            Prediction { index: 2, prediction: vec![0.0], target: Some(vec![-3.0]) },
        ];
        assert_eq!(mean_absolute_error(&preds), Some(2.0));
    }

    #[test]
    fn test_mae_none_without_labels() {
        let preds = vec![Prediction { index: 0, prediction: vec![1.0], target: None }];
        assert_eq!(mean_absolute_error(&preds), None);
    }

    #[test]
    fn test_unlabelled_predictions_omit_target_in_json() {
        let p    = Prediction { index: 3, prediction: vec![0.5], target: None };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"index":3,"prediction":[0.5]}"#);
    }
}

//! Supervised training loop for [`DenseNetwork`].
//!
//! Mini-batch Adam on mean squared error with a seeded train/validation
//! split, early stopping that restores the best weights, and learning
//! rate reduction on validation plateaus.

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    ModelError,
    dataset::TrainingSample,
    network::{DenseNetwork, Gradients},
    scaler::StandardScaler,
};

/// Hyperparameters for [`fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Maximum number of passes over the training split.
    pub epochs: usize,
    /// Samples per gradient step.
    pub batch_size: usize,
    /// Initial Adam learning rate.
    pub learning_rate: f64,
    /// Fraction of samples held out for validation.
    pub validation_split: f64,
    /// Seed for the split, shuffling and dropout.
    pub seed: u64,
    /// Epochs without validation improvement before stopping.
    pub early_stopping_patience: usize,
    /// Epochs without validation improvement before reducing the
    /// learning rate.
    pub lr_patience: usize,
    /// Factor applied to the learning rate on a plateau.
    pub lr_factor: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            validation_split: 0.2,
            seed: 42,
            early_stopping_patience: 10,
            lr_patience: 5,
            lr_factor: 0.5,
        }
    }
}

impl TrainingConfig {
    /// Checks that every hyperparameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ModelError> {
        let message = if self.epochs == 0 {
            "epochs must be at least 1"
        } else if self.batch_size == 0 {
            "batch_size must be at least 1"
        } else if !(0.0..1.0).contains(&self.validation_split) || self.validation_split <= 0.0 {
            "validation_split must be in (0, 1)"
        } else if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            "learning_rate must be positive"
        } else if self.lr_factor.is_nan() || self.lr_factor <= 0.0 || self.lr_factor > 1.0 {
            "lr_factor must be in (0, 1]"
        } else {
            return Ok(());
        };
        Err(ModelError::InvalidConfig {
            message: message.to_string(),
        })
    }
}

/// Regression accuracy on a held-out set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Mean absolute error (score points).
    pub mae: f64,
    /// Root mean squared error (score points).
    pub rmse: f64,
    /// Coefficient of determination.
    pub r2_score: f64,
}

/// Losses recorded after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Training MSE (with dropout active).
    pub loss: f64,
    /// Training MAE (with dropout active).
    pub mae: f64,
    /// Validation MSE.
    pub val_loss: f64,
    /// Validation MAE.
    pub val_mae: f64,
    /// Learning rate used during the epoch.
    pub learning_rate: f64,
}

/// Per-epoch record of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Metrics for every completed epoch.
    pub epochs: Vec<EpochMetrics>,
    /// Epoch whose weights were kept.
    pub best_epoch: usize,
    /// Whether early stopping ended the run.
    pub stopped_early: bool,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Everything a training run produces besides the updated weights.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Normalization learned from the training split.
    pub scaler: StandardScaler,
    /// Per-epoch record.
    pub history: TrainingHistory,
    /// Accuracy of the kept weights on the validation split.
    pub metrics: EvaluationMetrics,
}

/// Adam optimizer state.
struct Adam {
    learning_rate: f64,
    step: i32,
    m: Gradients,
    v: Gradients,
}

impl Adam {
    const BETA1: f64 = 0.9;
    const BETA2: f64 = 0.999;
    const EPSILON: f64 = 1e-7;

    fn new(network: &DenseNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            step: 0,
            m: Gradients::zeros_like(network),
            v: Gradients::zeros_like(network),
        }
    }

    fn apply(&mut self, network: &mut DenseNetwork, grads: &Gradients) {
        self.step += 1;
        let bias1 = 1.0 - Self::BETA1.powi(self.step);
        let bias2 = 1.0 - Self::BETA2.powi(self.step);
        let lr = self.learning_rate;

        let update = |param: &mut f64, g: f64, m: &mut f64, v: &mut f64| {
            *m = Self::BETA1.mul_add(*m, (1.0 - Self::BETA1) * g);
            *v = Self::BETA2.mul_add(*v, (1.0 - Self::BETA2) * g * g);
            *param -= lr * (*m / bias1) / ((*v / bias2).sqrt() + Self::EPSILON);
        };

        for (l, layer) in network.layers.iter_mut().enumerate() {
            for (j, row) in layer.weights.iter_mut().enumerate() {
                for (k, w) in row.iter_mut().enumerate() {
                    update(
                        w,
                        grads.weights[l][j][k],
                        &mut self.m.weights[l][j][k],
                        &mut self.v.weights[l][j][k],
                    );
                }
            }
            for (j, b) in layer.biases.iter_mut().enumerate() {
                update(
                    b,
                    grads.biases[l][j],
                    &mut self.m.biases[l][j],
                    &mut self.v.biases[l][j],
                );
            }
        }
    }
}

/// Splits samples into `(train, validation)` after a seeded shuffle.
///
/// The validation split gets `ceil(len * fraction)` samples.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn train_validation_split<'a>(
    samples: &'a [TrainingSample],
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<&'a TrainingSample>, Vec<&'a TrainingSample>) {
    let mut shuffled: Vec<&TrainingSample> = samples.iter().collect();
    shuffled.shuffle(rng);
    let n_val = (samples.len() as f64 * fraction).ceil() as usize;
    let train = shuffled.split_off(n_val);
    (train, shuffled)
}

/// Computes accuracy of `network` on already-normalized inputs.
///
/// # Errors
///
/// Returns [`ModelError`] if an input has the wrong width or the set is
/// empty.
#[allow(clippy::cast_precision_loss)]
pub fn evaluate(
    network: &DenseNetwork,
    inputs: &[Vec<f64>],
    targets: &[f64],
) -> Result<EvaluationMetrics, ModelError> {
    if inputs.is_empty() || inputs.len() != targets.len() {
        return Err(ModelError::InsufficientData {
            message: format!(
                "cannot evaluate {} inputs against {} targets",
                inputs.len(),
                targets.len()
            ),
        });
    }

    let n = targets.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    for (x, y) in inputs.iter().zip(targets) {
        let err = network.predict(x)? - y;
        abs_sum += err.abs();
        sq_sum += err * err;
    }

    let target_mean = targets.iter().sum::<f64>() / n;
    let total: f64 = targets.iter().map(|y| (y - target_mean).powi(2)).sum();
    let r2_score = if total > 0.0 {
        1.0 - sq_sum / total
    } else if sq_sum == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(EvaluationMetrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        r2_score,
    })
}

/// Trains `network` in place and returns the fitted scaler and history.
///
/// On return `network` holds the weights of the epoch with the lowest
/// validation loss.
///
/// # Errors
///
/// * [`ModelError::InvalidConfig`] for out-of-range hyperparameters
/// * [`ModelError::InsufficientData`] if either split would be empty
/// * [`ModelError::DimensionMismatch`] if a sample has the wrong width
#[allow(clippy::cast_precision_loss)]
pub fn fit(
    network: &mut DenseNetwork,
    samples: &[TrainingSample],
    config: &TrainingConfig,
) -> Result<TrainingOutcome, ModelError> {
    config.validate()?;
    if let Some(bad) = samples
        .iter()
        .find(|s| s.features.len() != network.input_size())
    {
        return Err(ModelError::DimensionMismatch {
            expected: network.input_size(),
            actual: bad.features.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train, validation) = train_validation_split(samples, config.validation_split, &mut rng);
    if train.is_empty() || validation.is_empty() {
        return Err(ModelError::InsufficientData {
            message: format!(
                "{} samples give {} training and {} validation rows",
                samples.len(),
                train.len(),
                validation.len()
            ),
        });
    }

    let train_rows: Vec<Vec<f64>> = train.iter().map(|s| s.features.clone()).collect();
    let scaler = StandardScaler::fit(&train_rows)?;
    let train_x = train_rows
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<Vec<_>, _>>()?;
    let train_y: Vec<f64> = train.iter().map(|s| s.risk_score).collect();
    let val_x = validation
        .iter()
        .map(|s| scaler.transform(&s.features))
        .collect::<Result<Vec<_>, _>>()?;
    let val_y: Vec<f64> = validation.iter().map(|s| s.risk_score).collect();

    log::info!(
        "Training on {} samples, validating on {}",
        train_x.len(),
        val_x.len()
    );

    let mut optimizer = Adam::new(network, config.learning_rate);
    let mut order: Vec<usize> = (0..train_x.len()).collect();
    let mut epochs = Vec::new();
    let mut best_network = network.clone();
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch = 0;
    let mut since_best = 0;
    let mut since_lr_change = 0;
    let mut stopped_early = false;

    for epoch in 0..config.epochs {
        order.shuffle(&mut rng);
        let mut loss_sum = 0.0;
        let mut abs_sum = 0.0;

        for batch in order.chunks(config.batch_size) {
            let mut grads = Gradients::zeros_like(network);
            for &i in batch {
                let trace = network.forward_trace(&train_x[i], &mut rng);
                let err = trace.output - train_y[i];
                loss_sum += err * err;
                abs_sum += err.abs();
                network.backward(&trace, train_y[i], &mut grads);
            }
            grads.scale(1.0 / batch.len() as f64);
            optimizer.apply(network, &grads);
        }

        let val = evaluate(network, &val_x, &val_y)?;
        let metrics = EpochMetrics {
            epoch,
            loss: loss_sum / train_x.len() as f64,
            mae: abs_sum / train_x.len() as f64,
            val_loss: val.rmse * val.rmse,
            val_mae: val.mae,
            learning_rate: optimizer.learning_rate,
        };
        log::debug!(
            "epoch {epoch}: loss={:.3} mae={:.3} val_loss={:.3} val_mae={:.3}",
            metrics.loss,
            metrics.mae,
            metrics.val_loss,
            metrics.val_mae
        );
        epochs.push(metrics);

        if metrics.val_loss < best_val_loss {
            best_val_loss = metrics.val_loss;
            best_network = network.clone();
            best_epoch = epoch;
            since_best = 0;
            since_lr_change = 0;
            continue;
        }

        since_best += 1;
        since_lr_change += 1;

        if since_lr_change >= config.lr_patience {
            optimizer.learning_rate *= config.lr_factor;
            since_lr_change = 0;
            log::debug!(
                "Validation loss plateaued, learning rate reduced to {}",
                optimizer.learning_rate
            );
        }

        if since_best >= config.early_stopping_patience {
            log::info!("Early stopping at epoch {epoch}, restoring epoch {best_epoch}");
            stopped_early = true;
            break;
        }
    }

    *network = best_network;
    let metrics = evaluate(network, &val_x, &val_y)?;
    log::info!(
        "Model trained successfully. Validation MAE: {:.2}, RMSE: {:.2}, R2: {:.3}",
        metrics.mae,
        metrics.rmse,
        metrics.r2_score
    );

    Ok(TrainingOutcome {
        scaler,
        history: TrainingHistory {
            epochs,
            best_epoch,
            stopped_early,
            finished_at: Utc::now(),
        },
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Score driven by the first feature; the rest is structured noise.
    #[allow(clippy::cast_precision_loss)]
    fn synthetic_samples(n: usize, width: usize) -> Vec<TrainingSample> {
        (0..n)
            .map(|i| {
                let driver = ((i * 37) % 101) as f64 / 100.0;
                let mut features = vec![driver];
                features.extend((1..width).map(|k| ((i * (k + 3)) % 13) as f64));
                TrainingSample {
                    features,
                    risk_score: 60.0f64.mul_add(driver, 20.0),
                }
            })
            .collect()
    }

    #[test]
    fn split_sizes_follow_ceiling_rule() {
        let samples = synthetic_samples(11, 2);
        let mut rng = StdRng::seed_from_u64(42);
        let (train, val) = train_validation_split(&samples, 0.2, &mut rng);
        assert_eq!(val.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn training_learns_a_simple_relationship() {
        let samples = synthetic_samples(400, 4);
        let mut network = DenseNetwork::with_hidden_layers(4, &[(16, 0.0)], 3);
        let config = TrainingConfig {
            epochs: 60,
            learning_rate: 0.01,
            ..TrainingConfig::default()
        };

        let outcome = fit(&mut network, &samples, &config).unwrap();

        assert!(!outcome.history.epochs.is_empty());
        assert!(outcome.metrics.mae < 10.0, "mae {}", outcome.metrics.mae);
        assert!(outcome.metrics.r2_score > 0.5);
        let best = outcome.history.epochs[outcome.history.best_epoch];
        assert!((best.val_mae - outcome.metrics.mae).abs() < 1e-9);
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let samples = synthetic_samples(60, 3);
        let config = TrainingConfig {
            epochs: 3,
            ..TrainingConfig::default()
        };

        let mut a = DenseNetwork::with_hidden_layers(3, &[(8, 0.2)], 11);
        let mut b = a.clone();
        fit(&mut a, &samples, &config).unwrap();
        fit(&mut b, &samples, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unusable_inputs() {
        let mut network = DenseNetwork::with_hidden_layers(3, &[(4, 0.0)], 1);
        let config = TrainingConfig::default();

        assert!(matches!(
            fit(&mut network, &synthetic_samples(1, 3), &config),
            Err(ModelError::InsufficientData { .. })
        ));
        assert!(matches!(
            fit(&mut network, &synthetic_samples(10, 2), &config),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));

        let bad = TrainingConfig {
            batch_size: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            fit(&mut network, &synthetic_samples(10, 3), &bad),
            Err(ModelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn perfect_predictions_score_r2_of_one() {
        let network = DenseNetwork::with_hidden_layers(1, &[(2, 0.0)], 1);
        let input = vec![vec![0.5], vec![-0.5]];
        let targets: Vec<f64> = input
            .iter()
            .map(|x| network.predict(x).unwrap())
            .collect();
        let metrics = evaluate(&network, &input, &targets).unwrap();
        assert!(metrics.mae < 1e-12);
        assert!(metrics.rmse < 1e-12);
        assert!((metrics.r2_score - 1.0).abs() < 1e-12);
    }
}

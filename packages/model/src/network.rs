//! Dense feed-forward regression network.
//!
//! ReLU hidden layers with inverted dropout (active only while training)
//! and a single sigmoid output unit scaled to `[0, 100]`.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Multiplier applied to the sigmoid output.
pub const OUTPUT_SCALE: f64 = 100.0;

/// Hidden layer widths and dropout rates of the production architecture.
pub const DEFAULT_HIDDEN_LAYERS: [(usize, f64); 3] = [(128, 0.3), (64, 0.2), (32, 0.0)];

/// Activation function of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// `max(0, z)`
    Relu,
    /// `1 / (1 + e^-z)`
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Self::Relu => z.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    fn derivative(self, z: f64) -> f64 {
        match self {
            Self::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Sigmoid => {
                let s = self.apply(z);
                s * (1.0 - s)
            }
        }
    }
}

/// A fully connected layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `[output][input]` weight matrix.
    pub(crate) weights: Vec<Vec<f64>>,
    pub(crate) biases: Vec<f64>,
    pub(crate) activation: Activation,
    /// Fraction of units dropped during training.
    pub(crate) dropout: f64,
}

impl DenseLayer {
    /// Glorot-uniform initialized layer with zero biases.
    #[allow(clippy::cast_precision_loss)]
    fn new(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        dropout: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = (0..outputs)
            .map(|_| {
                (0..inputs)
                    .map(|_| rng.random_range(-limit..limit))
                    .collect()
            })
            .collect();

        Self {
            weights,
            biases: vec![0.0; outputs],
            activation,
            dropout,
        }
    }

    fn pre_activation(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.pre_activation(input)
            .into_iter()
            .map(|z| self.activation.apply(z))
            .collect()
    }
}

/// Intermediate values of one training-mode forward pass.
pub(crate) struct ForwardTrace {
    /// Input fed to each layer.
    inputs: Vec<Vec<f64>>,
    pre_activations: Vec<Vec<f64>>,
    /// Dropout multipliers per unit (`0` or `1 / keep`).
    masks: Vec<Vec<f64>>,
    /// Scaled network output.
    pub(crate) output: f64,
}

/// Parameter-shaped accumulator for gradients and optimizer moments.
#[derive(Debug, Clone)]
pub(crate) struct Gradients {
    pub(crate) weights: Vec<Vec<Vec<f64>>>,
    pub(crate) biases: Vec<Vec<f64>>,
}

impl Gradients {
    pub(crate) fn zeros_like(network: &DenseNetwork) -> Self {
        Self {
            weights: network
                .layers
                .iter()
                .map(|l| l.weights.iter().map(|row| vec![0.0; row.len()]).collect())
                .collect(),
            biases: network
                .layers
                .iter()
                .map(|l| vec![0.0; l.biases.len()])
                .collect(),
        }
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        for layer in &mut self.weights {
            for row in layer {
                for g in row {
                    *g *= factor;
                }
            }
        }
        for layer in &mut self.biases {
            for g in layer {
                *g *= factor;
            }
        }
    }
}

/// Feed-forward regression network producing a score in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    input_size: usize,
    pub(crate) layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Builds the production architecture for `input_size` features.
    #[must_use]
    pub fn new(input_size: usize, seed: u64) -> Self {
        Self::with_hidden_layers(input_size, &DEFAULT_HIDDEN_LAYERS, seed)
    }

    /// Builds a network with the given `(units, dropout)` hidden layers
    /// followed by one sigmoid output unit.
    #[must_use]
    pub fn with_hidden_layers(input_size: usize, hidden: &[(usize, f64)], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = input_size;

        for &(units, dropout) in hidden {
            layers.push(DenseLayer::new(
                fan_in,
                units,
                Activation::Relu,
                dropout,
                &mut rng,
            ));
            fan_in = units;
        }
        layers.push(DenseLayer::new(
            fan_in,
            1,
            Activation::Sigmoid,
            0.0,
            &mut rng,
        ));

        Self { input_size, layers }
    }

    /// Number of input features.
    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.input_size
    }

    /// Whether every weight and bias is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.layers.iter().all(|layer| {
            layer.biases.iter().all(|b| b.is_finite())
                && layer.weights.iter().flatten().all(|w| w.is_finite())
        })
    }

    /// Runs inference on one normalized feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if `input` has the wrong
    /// width.
    pub fn predict(&self, input: &[f64]) -> Result<f64, ModelError> {
        if input.len() != self.input_size {
            return Err(ModelError::DimensionMismatch {
                expected: self.input_size,
                actual: input.len(),
            });
        }

        let output = self
            .layers
            .iter()
            .fold(input.to_vec(), |activations, layer| layer.forward(&activations));

        Ok(output[0] * OUTPUT_SCALE)
    }

    /// Training-mode forward pass with dropout applied.
    pub(crate) fn forward_trace(&self, input: &[f64], rng: &mut impl Rng) -> ForwardTrace {
        let mut trace = ForwardTrace {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(self.layers.len()),
            masks: Vec::with_capacity(self.layers.len()),
            output: 0.0,
        };

        let mut current = input.to_vec();
        for layer in &self.layers {
            let z = layer.pre_activation(&current);
            let mask: Vec<f64> = if layer.dropout > 0.0 {
                let keep = 1.0 - layer.dropout;
                z.iter()
                    .map(|_| {
                        if rng.random::<f64>() < keep {
                            1.0 / keep
                        } else {
                            0.0
                        }
                    })
                    .collect()
            } else {
                vec![1.0; z.len()]
            };
            let activations = z
                .iter()
                .zip(&mask)
                .map(|(z, m)| layer.activation.apply(*z) * m)
                .collect();

            trace.inputs.push(current);
            trace.pre_activations.push(z);
            trace.masks.push(mask);
            current = activations;
        }

        trace.output = current[0] * OUTPUT_SCALE;
        trace
    }

    /// Accumulates squared-error gradients for one traced sample into
    /// `grads`.
    pub(crate) fn backward(&self, trace: &ForwardTrace, target: f64, grads: &mut Gradients) {
        let last = self.layers.len() - 1;
        let output_grad = 2.0 * (trace.output - target) * OUTPUT_SCALE;

        let mut delta: Vec<f64> = trace.pre_activations[last]
            .iter()
            .zip(&trace.masks[last])
            .map(|(z, m)| output_grad * m * self.layers[last].activation.derivative(*z))
            .collect();

        for l in (0..self.layers.len()).rev() {
            for (j, d) in delta.iter().enumerate() {
                grads.biases[l][j] += d;
                for (g, x) in grads.weights[l][j].iter_mut().zip(&trace.inputs[l]) {
                    *g += d * x;
                }
            }

            if l == 0 {
                break;
            }

            let below = &self.layers[l - 1];
            let mut next = vec![0.0; trace.inputs[l].len()];
            for (row, d) in self.layers[l].weights.iter().zip(&delta) {
                for (n, w) in next.iter_mut().zip(row) {
                    *n += w * d;
                }
            }
            for ((n, z), m) in next
                .iter_mut()
                .zip(&trace.pre_activations[l - 1])
                .zip(&trace.masks[l - 1])
            {
                *n *= m * below.activation.derivative(*z);
            }
            delta = next;
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`EnsembleMlp`](super::EnsembleMlp).
pub struct EnsembleMlpConfig {
    pub(super) obs_dim: usize,
    pub(super) act_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) ensemble_size: usize,
}

impl EnsembleMlpConfig {
    /// Creates configuration of the ensemble MLP.
    ///
    /// * `obs_dim` - dimension of observations.
    /// * `act_dim` - dimension of action representations.
    /// * `units` - hidden layer sizes, must not be empty.
    /// * `ensemble_size` - number of members K, at least 1.
    pub fn new(obs_dim: usize, act_dim: usize, units: Vec<usize>, ensemble_size: usize) -> Self {
        Self {
            obs_dim,
            act_dim,
            units,
            ensemble_size,
        }
    }
}

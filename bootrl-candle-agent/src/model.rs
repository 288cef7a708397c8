//! Interface of ensemble action-value networks.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarBuilder;

/// An ensemble of K action-value estimators behind a single interface.
///
/// The network does not own its
/// [`VarMap`](https://docs.rs/candle-nn/0.8.4/candle_nn/var_map/struct.VarMap.html);
/// vars are registered through the [`VarBuilder`] passed to
/// [`build`](EnsembleModel::build), so one optimizer can cover the whole
/// ensemble and a target copy can be snapshot from the owning model.
pub trait EnsembleModel {
    /// Configuration from which the model is constructed.
    type Config;

    /// Builds the model, registering its vars through `vb`.
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Number of ensemble members K.
    fn ensemble_size(&self) -> usize;

    /// Action values of member `z`.
    ///
    /// * `obs` - observations, shape `(batch, obs_dim)`.
    /// * `actions` - candidate action representations per observation,
    ///   shape `(batch, m, act_dim)`.
    ///
    /// Returns a `(batch, m)` tensor of Q-values.
    fn forward(&self, obs: &Tensor, actions: &Tensor, z: usize) -> Result<Tensor>;
}

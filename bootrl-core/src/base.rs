//! Policy learner interface.
use crate::{record::Record, ActionSpace};
use anyhow::Result;
use std::path::Path;

/// A trainable policy.
///
/// A policy learner owns its models and optimizer state. Training and
/// decision steps are blocking calls taking `&mut self`; callers serialize
/// them by construction.
pub trait PolicyLearner {
    /// Observation type.
    type Obs;

    /// Action type.
    type Act;

    /// Batch type accepted by [`learn_batch`](PolicyLearner::learn_batch).
    type Batch;

    /// Performs one training step on a batch.
    ///
    /// Returns a record with at least a `"loss"` entry.
    fn learn_batch(&mut self, batch: &Self::Batch) -> Result<Record>;

    /// Chooses an action for the given observation.
    ///
    /// With `exploit` set, the greedy action is returned; otherwise the
    /// learner's exploration module picks the final action.
    fn act(&mut self, obs: &Self::Obs, action_space: &ActionSpace, exploit: bool)
        -> Result<Self::Act>;

    /// Resets per-episode state at an episode boundary.
    fn reset(&mut self, action_space: &ActionSpace) -> Result<()>;

    /// Sets the learner to training mode.
    fn train(&mut self);

    /// Sets the learner to evaluation mode.
    fn eval(&mut self);

    /// Returns if the learner is in training mode.
    fn is_train(&self) -> bool;

    /// Saves model parameters in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads model parameters from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}

use bootrl_core::DiscreteActionSpace;
use candle_core::Tensor;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Deep exploration for Bootstrapped DQN.
///
/// One ensemble member is sampled uniformly per episode and its greedy
/// policy is followed until the next reset, giving temporally consistent
/// exploration instead of per-step randomization.
pub struct DeepExploration {
    ensemble_size: usize,
    rng: SmallRng,
}

impl DeepExploration {
    /// Creates the module for an ensemble of `ensemble_size` members.
    pub fn new(ensemble_size: usize, seed: u64) -> Self {
        Self {
            ensemble_size,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Samples the member index driving the next episode.
    pub fn resample(&mut self) -> usize {
        self.rng.gen_range(0..self.ensemble_size)
    }

    /// Returns the final action for this step.
    ///
    /// Deep exploration follows the sampled member's greedy policy, so the
    /// exploit action passes through unchanged. The observation, action
    /// space and value vector are part of the exploration interface and
    /// allow other strategies to be substituted here.
    pub fn act(
        &mut self,
        _obs: &Tensor,
        _action_space: &DiscreteActionSpace,
        exploit_action: usize,
        _values: &Tensor,
    ) -> usize {
        exploit_action
    }
}

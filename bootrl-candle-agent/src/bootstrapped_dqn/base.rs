//! Bootstrapped DQN agent implemented with candle.
use super::{
    config::BootstrappedDqnConfig, exploration::DeepExploration, model::EnsembleQModel,
};
use crate::{
    batch::{ReplayBatch, TransitionBatch},
    model::EnsembleModel,
    repr::ActionRepr,
    util::track,
};
use anyhow::{ensure, Context, Result};
use bootrl_core::{
    record::{Record, RecordValue},
    ActionSpace, DiscreteActionSpace, PolicyLearner,
};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::loss::mse;
use log::trace;
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

/// Contract violations surfaced to the caller.
#[derive(Debug, Error)]
pub enum BootstrappedDqnError {
    /// `learn_batch` received a batch without a bootstrap mask.
    #[error(
        "BootstrappedDqn requires a batch of type `TransitionWithBootstrapMaskBatch`, \
         but got `{got}`"
    )]
    UnexpectedBatchType {
        /// Name of the offending batch type.
        got: &'static str,
    },

    /// A discrete action space is required.
    #[error("BootstrappedDqn requires a discrete action space, but got `{got}`")]
    NonDiscreteActionSpace {
        /// Name of the offending space.
        got: &'static str,
    },
}

/// Bootstrapped DQN, proposed by Osband et al. (<https://arxiv.org/abs/1602.04621>).
///
/// An extension of DQN using the "deep exploration" mechanism: an ensemble
/// of K Q-networks is kept and on each episode one of them is sampled; the
/// greedy policy of that member is followed until the next reset.
///
/// Training consumes batches carrying a bootstrap mask. Each transition is
/// routed to the members whose mask column is set, every participating
/// member contributes a double-Q MSE loss, and the summed loss is optimized
/// in a single backward pass and optimizer step. The lagged target copy is
/// synchronized by a Polyak update every `target_update_freq` steps.
pub struct BootstrappedDqn<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    pub(in crate::bootstrapped_dqn) qnet: EnsembleQModel<Q>,
    pub(in crate::bootstrapped_dqn) qnet_tgt: EnsembleQModel<Q>,
    pub(in crate::bootstrapped_dqn) explorer: DeepExploration,
    pub(in crate::bootstrapped_dqn) action_space: DiscreteActionSpace,
    pub(in crate::bootstrapped_dqn) action_repr: ActionRepr,
    pub(in crate::bootstrapped_dqn) discount_factor: f64,
    pub(in crate::bootstrapped_dqn) tau: f64,
    pub(in crate::bootstrapped_dqn) target_update_freq: usize,
    pub(in crate::bootstrapped_dqn) n_opts: usize,
    pub(in crate::bootstrapped_dqn) train: bool,
    pub(in crate::bootstrapped_dqn) device: Device,
}

impl<Q> BootstrappedDqn<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    /// Constructs the agent.
    ///
    /// Fails on a non-discrete action space and on out-of-range
    /// hyperparameters.
    pub fn build(config: BootstrappedDqnConfig<Q>, action_space: &ActionSpace) -> Result<Self> {
        config.check()?;
        let action_space = match action_space {
            ActionSpace::Discrete(space) => space.clone(),
            other => {
                return Err(BootstrappedDqnError::NonDiscreteActionSpace { got: other.kind() }.into())
            }
        };
        let device: Device = config
            .device
            .context("no device is given for the BootstrappedDqn agent")?
            .into();
        let qnet = EnsembleQModel::build(config.model_config, device.clone())?;
        let qnet_tgt = qnet.snapshot()?;
        let explorer = DeepExploration::new(qnet.ensemble_size(), config.seed);

        Ok(Self {
            qnet,
            qnet_tgt,
            explorer,
            action_space,
            action_repr: config.action_repr,
            discount_factor: config.discount_factor,
            tau: config.tau,
            target_update_freq: config.target_update_freq,
            n_opts: 0,
            train: config.train,
            device,
        })
    }

    /// Number of ensemble members K.
    pub fn ensemble_size(&self) -> usize {
        self.qnet.ensemble_size()
    }

    /// The member whose greedy policy drives the current episode.
    pub fn active_member(&self) -> usize {
        self.qnet.active_member()
    }

    /// Number of completed training steps.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// The action space the agent was built with.
    pub fn action_space(&self) -> &DiscreteActionSpace {
        &self.action_space
    }

    /// Maximal next-state values of member `z` under double-Q learning.
    ///
    /// The online member selects the greedy next action over the available
    /// set; the lagged target member evaluates it. Unavailable action slots
    /// are overwritten with negative infinity before the argmax so padding
    /// can never be selected.
    fn next_state_values(&self, batch: &TransitionBatch, z: usize) -> Result<Tensor> {
        let next_obs = batch
            .next_obs
            .as_ref()
            .context("next_obs is missing on a batch with non-terminal transitions")?;
        let next_actions = batch
            .next_available_actions
            .as_ref()
            .context("next_available_actions is missing on a batch with non-terminal transitions")?;
        let unavailable = batch
            .next_unavailable_actions_mask
            .as_ref()
            .context(
                "next_unavailable_actions_mask is missing on a batch with non-terminal transitions",
            )?;

        let q_next = self.qnet.forward(next_obs, next_actions, z)?;
        let q_next_tgt = self.qnet_tgt.forward(next_obs, next_actions, z)?;

        let neg_inf = Tensor::full(f32::NEG_INFINITY, q_next.dims(), q_next.device())?;
        let q_next = unavailable.where_cond(&neg_inf, &q_next)?;

        let a_star = q_next.argmax_keepdim(D::Minus1)?;
        Ok(q_next_tgt
            .gather(&a_star, D::Minus1)?
            .squeeze(D::Minus1)?
            .detach())
    }

    /// Bellman targets of member `z`: `r + gamma * (1 - terminated) * V(s')`.
    ///
    /// Terminal transitions contribute no next-state term; the factor is
    /// zeroed by multiplication, not by branching.
    fn bellman_targets(&self, batch: &TransitionBatch, z: usize) -> Result<Tensor> {
        let not_terminated = batch.terminated.to_dtype(DType::F32)?.affine(-1.0, 1.0)?;
        let next_values = match &batch.next_obs {
            Some(_) => self.next_state_values(batch, z)?,
            // every transition is terminal (validated by the batch)
            None => Tensor::zeros(batch.len(), DType::F32, &self.device)?,
        };
        let v = (next_values * self.discount_factor)?;
        let v = (v * not_terminated)?;
        Ok((v + &batch.reward)?.detach())
    }

    /// Q-estimates of member `z` for the actually taken actions.
    fn state_action_values(&self, batch: &TransitionBatch, z: usize) -> Result<Tensor> {
        let act = batch.act.unsqueeze(1)?;
        Ok(self.qnet.forward(&batch.obs, &act, z)?.squeeze(D::Minus1)?)
    }

    fn learn_batch_(&mut self, batch: &ReplayBatch) -> Result<Record> {
        let batch = match batch {
            ReplayBatch::BootstrapMasked(batch) => batch,
            other => {
                return Err(BootstrappedDqnError::UnexpectedBatchType {
                    got: other.type_name(),
                }
                .into())
            }
        };
        ensure!(
            batch.ensemble_size() == self.qnet.ensemble_size(),
            "bootstrap mask has {} columns for an ensemble of {} members",
            batch.ensemble_size(),
            self.qnet.ensemble_size()
        );

        let mut loss_ensemble = Tensor::new(0f32, &self.device)?;
        for z in 0..self.qnet.ensemble_size() {
            let sub = match batch.sub_batch(z)? {
                Some(sub) => sub,
                None => {
                    trace!("no transitions for ensemble member {}", z);
                    continue;
                }
            };
            let pred = self.state_action_values(&sub, z)?;
            let tgt = self.bellman_targets(&sub, z)?;
            loss_ensemble = (loss_ensemble + mse(&pred, &tgt)?)?;
        }

        // One combined backward pass and one optimizer step for all members
        // that contributed to the accumulated loss.
        self.qnet.backward_step(&loss_ensemble)?;

        self.n_opts += 1;
        if self.n_opts % self.target_update_freq == 0 {
            track(self.qnet_tgt.get_varmap(), self.qnet.get_varmap(), self.tau)?;
        }

        let loss = loss_ensemble.to_scalar::<f32>()?;
        Ok(Record::from_slice(&[("loss", RecordValue::Scalar(loss))]))
    }

    fn act_(&mut self, obs: &Tensor, action_space: &ActionSpace, exploit: bool) -> Result<usize> {
        let space = match action_space {
            ActionSpace::Discrete(space) => space,
            other => {
                return Err(BootstrappedDqnError::NonDiscreteActionSpace { got: other.kind() }.into())
            }
        };
        let z = self.qnet.active_member();
        let obs = obs.to_device(&self.device)?.unsqueeze(0)?;
        let actions = {
            let raw = Tensor::from_vec(
                space.actions_batch(),
                (space.n(), space.action_dim()),
                &self.device,
            )?;
            self.action_repr.apply(&raw)?.unsqueeze(0)?
        };
        let q_values = self.qnet.forward(&obs, &actions, z)?.squeeze(0)?.detach();
        let exploit_action = q_values.argmax(0)?.to_scalar::<u32>()? as usize;

        if exploit || !self.train {
            return Ok(exploit_action);
        }
        Ok(self.explorer.act(&obs, space, exploit_action, &q_values))
    }
}

impl<Q> PolicyLearner for BootstrappedDqn<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    type Obs = Tensor;
    type Act = usize;
    type Batch = ReplayBatch;

    fn learn_batch(&mut self, batch: &Self::Batch) -> Result<Record> {
        self.learn_batch_(batch)
    }

    fn act(&mut self, obs: &Self::Obs, action_space: &ActionSpace, exploit: bool) -> Result<usize> {
        self.act_(obs, action_space, exploit)
    }

    /// Resamples the active ensemble member for the next episode.
    ///
    /// This learner holds no other per-episode state.
    fn reset(&mut self, _action_space: &ActionSpace) -> Result<()> {
        let z = self.explorer.resample();
        self.qnet.set_active_member(z);
        Ok(())
    }

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.safetensors"))?;
        self.qnet_tgt.save(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.safetensors"))?;
        self.qnet_tgt.load(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }
}

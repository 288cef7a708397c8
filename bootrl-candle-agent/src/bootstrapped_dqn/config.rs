//! Configuration of the Bootstrapped DQN agent.
use super::model::EnsembleQModelConfig;
use crate::{model::EnsembleModel, opt::OptimizerConfig, repr::ActionRepr, Device};
use anyhow::{ensure, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    marker::PhantomData,
    path::Path,
};

/// Constructs [`BootstrappedDqn`](super::BootstrappedDqn).
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct BootstrappedDqnConfig<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    pub(super) model_config: EnsembleQModelConfig<Q::Config>,
    pub(super) discount_factor: f64,
    pub(super) tau: f64,
    pub(super) target_update_freq: usize,
    pub(super) batch_size: usize,
    pub(super) training_rounds: usize,
    pub(super) action_repr: ActionRepr,
    pub(super) train: bool,
    pub(super) seed: u64,
    pub device: Option<Device>,
    phantom: PhantomData<Q>,
}

impl<Q> Clone for BootstrappedDqnConfig<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    fn clone(&self) -> Self {
        Self {
            model_config: self.model_config.clone(),
            discount_factor: self.discount_factor,
            tau: self.tau,
            target_update_freq: self.target_update_freq,
            batch_size: self.batch_size,
            training_rounds: self.training_rounds,
            action_repr: self.action_repr.clone(),
            train: self.train,
            seed: self.seed,
            device: self.device,
            phantom: PhantomData,
        }
    }
}

impl<Q> Default for BootstrappedDqnConfig<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    /// Default parameters: discount factor 0.99, hard target updates
    /// (`tau = 1.0`) every 10 training steps, batch size 128, 100 training
    /// rounds per optimization call.
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            discount_factor: 0.99,
            tau: 1.0,
            target_update_freq: 10,
            batch_size: 128,
            training_rounds: 100,
            action_repr: ActionRepr::default(),
            train: true,
            seed: 42,
            device: None,
            phantom: PhantomData,
        }
    }
}

impl<Q> BootstrappedDqnConfig<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone + std::fmt::Debug + PartialEq,
{
    /// Sets the configuration of the ensemble Q-model.
    pub fn model_config(mut self, v: EnsembleQModelConfig<Q::Config>) -> Self {
        self.model_config = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the soft update coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the target update frequency in training steps.
    pub fn target_update_freq(mut self, v: usize) -> Self {
        self.target_update_freq = v;
        self
    }

    /// Sets the batch size requested from the replay buffer.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of training rounds per optimization call.
    ///
    /// Consumed by the training-loop harness, not by `learn_batch` itself.
    pub fn training_rounds(mut self, v: usize) -> Self {
        self.training_rounds = v;
        self
    }

    /// Sets the learning rate of the optimizer.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.model_config.opt_config = self.model_config.opt_config.learning_rate(v);
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.model_config.opt_config = v;
        self
    }

    /// Sets the action representation module.
    pub fn action_repr(mut self, v: ActionRepr) -> Self {
        self.action_repr = v;
        self
    }

    /// Sets the training mode flag.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }

    /// Sets the seed of the exploration module.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = Some(v);
        self
    }

    /// Validates the hyperparameter ranges.
    pub fn check(&self) -> Result<()> {
        ensure!(
            self.discount_factor > 0.0 && self.discount_factor <= 1.0,
            "discount_factor must be in (0, 1], got {}",
            self.discount_factor
        );
        ensure!(
            self.tau > 0.0 && self.tau <= 1.0,
            "tau must be in (0, 1], got {}",
            self.tau
        );
        ensure!(
            self.target_update_freq >= 1,
            "target_update_freq must be a positive integer"
        );
        ensure!(self.batch_size >= 1, "batch_size must be a positive integer");
        Ok(())
    }

    /// Constructs [`BootstrappedDqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`BootstrappedDqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

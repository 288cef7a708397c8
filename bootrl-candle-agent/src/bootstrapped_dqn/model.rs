use crate::{
    model::EnsembleModel,
    opt::{Optimizer, OptimizerConfig},
    util::track,
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`EnsembleQModel`].
pub struct EnsembleQModelConfig<Q> {
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
}

impl<Q> Default for EnsembleQModelConfig<Q> {
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<Q> EnsembleQModelConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets the configuration of the ensemble network.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`EnsembleQModelConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EnsembleQModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// An ensemble Q-network bundled with its varmap, optimizer and the active
/// member index.
///
/// The varmap covers every member's vars, so the single optimizer step in
/// `learn_batch` updates all members that contributed to the loss. The
/// active member index identifies the member whose greedy policy drives the
/// current episode; it is replaced by the reset protocol.
pub struct EnsembleQModel<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    device: Device,
    varmap: VarMap,
    q: Q,
    q_config: Q::Config,
    opt_config: OptimizerConfig,
    opt: Optimizer,
    active_z: usize,
}

impl<Q> EnsembleQModel<Q>
where
    Q: EnsembleModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    /// Constructs [`EnsembleQModel`].
    pub fn build(config: EnsembleQModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = config.q_config.context("q_config is not set")?;
        let opt_config = config.opt_config;
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, q_config.clone())?
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            q,
            q_config,
            opt_config,
            opt,
            active_z: 0,
        })
    }

    /// Number of ensemble members K.
    pub fn ensemble_size(&self) -> usize {
        self.q.ensemble_size()
    }

    /// Action values of member `z` (see [`EnsembleModel::forward`]).
    pub fn forward(&self, obs: &Tensor, actions: &Tensor, z: usize) -> Result<Tensor> {
        self.q.forward(obs, actions, z)
    }

    /// The member whose greedy policy drives the current episode.
    pub fn active_member(&self) -> usize {
        self.active_z
    }

    /// Installs the member sampled for the next episode.
    pub fn set_active_member(&mut self, z: usize) {
        debug_assert!(z < self.ensemble_size());
        self.active_z = z;
    }

    /// Zeroes gradients, backpropagates `loss` and applies one optimizer
    /// step over the whole ensemble's vars.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// The varmap holding all members' vars.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the vars as a safetensors file.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save ensemble Q-model to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads vars from a safetensors file.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load ensemble Q-model from {:?}", path.as_ref());
        Ok(())
    }

    /// Snapshots the model into an independent parameter set.
    ///
    /// A fresh varmap is populated by a hard copy of the current vars, so
    /// the copy never aliases this model. Used to construct the target
    /// network, which afterwards only receives scheduled [`track`] updates.
    pub fn snapshot(&self) -> Result<Self> {
        let config = EnsembleQModelConfig {
            q_config: Some(self.q_config.clone()),
            opt_config: self.opt_config.clone(),
        };
        let copy = Self::build(config, self.device.clone())?;
        track(copy.get_varmap(), &self.varmap, 1.0)?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{EnsembleMlp, EnsembleMlpConfig};

    fn model() -> Result<EnsembleQModel<EnsembleMlp>> {
        let config = EnsembleQModelConfig::default()
            .q_config(EnsembleMlpConfig::new(2, 2, vec![4], 2));
        EnsembleQModel::build(config, Device::Cpu)
    }

    fn flat_vars(m: &EnsembleQModel<EnsembleMlp>) -> Vec<(String, Vec<f32>)> {
        let data = m.get_varmap().data().lock().unwrap();
        let mut v: Vec<(String, Vec<f32>)> = data
            .iter()
            .map(|(k, var)| {
                (
                    k.clone(),
                    var.as_tensor()
                        .flatten_all()
                        .unwrap()
                        .to_vec1::<f32>()
                        .unwrap(),
                )
            })
            .collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }

    #[test]
    fn snapshot_copies_without_aliasing() -> Result<()> {
        let online = model()?;
        let target = online.snapshot()?;
        assert_eq!(flat_vars(&online), flat_vars(&target));

        // diverge the online vars; the snapshot must not follow
        {
            let data = online.get_varmap().data().lock().unwrap();
            for var in data.values() {
                let t = ((1.0f64 * var.as_tensor())? + 1.0)?;
                var.set(&t)?;
            }
        }
        assert_ne!(flat_vars(&online), flat_vars(&target));
        Ok(())
    }

    #[test]
    fn missing_q_config_rejected() {
        let config: EnsembleQModelConfig<EnsembleMlpConfig> = EnsembleQModelConfig::default();
        assert!(EnsembleQModel::<EnsembleMlp>::build(config, Device::Cpu).is_err());
    }

    #[test]
    fn active_member_is_replaceable() -> Result<()> {
        let mut m = model()?;
        assert_eq!(m.active_member(), 0);
        m.set_active_member(1);
        assert_eq!(m.active_member(), 1);
        Ok(())
    }
}

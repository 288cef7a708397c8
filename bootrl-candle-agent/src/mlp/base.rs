use super::{mlp_forward, EnsembleMlpConfig};
use crate::model::EnsembleModel;
use anyhow::{ensure, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns the linear layers of a single ensemble member.
fn create_member_layers(vs: VarBuilder, config: &EnsembleMlpConfig) -> Result<Vec<Linear>> {
    let in_dim = config.obs_dim + config.act_dim;
    let mut in_out_pairs: Vec<(usize, usize)> = (0..config.units.len() - 1)
        .map(|i| (config.units[i], config.units[i + 1]))
        .collect();
    in_out_pairs.insert(0, (in_dim, config.units[0]));
    in_out_pairs.push((*config.units.last().unwrap(), 1));

    in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| {
            Ok(linear(in_dim, out_dim, vs.pp(format!("ln{}", i)))?)
        })
        .collect()
}

/// K independent MLP heads over concatenated observation-action inputs.
///
/// Member `z`'s vars live under the `member{z}` prefix of the shared varmap,
/// so one optimizer covers the whole ensemble while the members stay
/// independently parameterized. Each head maps an observation concatenated
/// with one action representation to a scalar Q-value.
pub struct EnsembleMlp {
    config: EnsembleMlpConfig,
    device: Device,
    members: Vec<Vec<Linear>>,
}

impl EnsembleModel for EnsembleMlp {
    type Config = EnsembleMlpConfig;

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        ensure!(
            config.ensemble_size >= 1,
            "ensemble size must be at least 1"
        );
        ensure!(
            !config.units.is_empty(),
            "the ensemble MLP needs at least one hidden layer"
        );
        let device = vs.device().clone();
        let members = (0..config.ensemble_size)
            .map(|z| create_member_layers(vs.pp(format!("member{}", z)), &config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            device,
            members,
        })
    }

    fn ensemble_size(&self) -> usize {
        self.config.ensemble_size
    }

    fn forward(&self, obs: &Tensor, actions: &Tensor, z: usize) -> Result<Tensor> {
        ensure!(
            z < self.members.len(),
            "ensemble index {} out of range ({} members)",
            z,
            self.members.len()
        );
        let obs = obs.to_device(&self.device)?;
        let actions = actions.to_device(&self.device)?;
        let (n, m, act_dim) = actions.dims3()?;
        let (_, obs_dim) = obs.dims2()?;

        let obs = obs.unsqueeze(1)?.repeat((1, m, 1))?;
        let xs = Tensor::cat(&[obs, actions], D::Minus1)?.reshape((n * m, obs_dim + act_dim))?;
        let q = mlp_forward(xs, &self.members[z])?;

        Ok(q.reshape((n, m))?)
    }
}

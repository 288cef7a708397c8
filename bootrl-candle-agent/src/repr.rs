//! Action representation modules.
use anyhow::{ensure, Result};
use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Maps raw action vectors to the representation fed to the Q-network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum ActionRepr {
    /// Passes the action space's own vectors through unchanged.
    Identity,

    /// Maps index-valued actions to one-hot rows of length `num_actions`.
    OneHot {
        /// Number of actions in the space.
        num_actions: usize,
    },
}

impl Default for ActionRepr {
    fn default() -> Self {
        Self::Identity
    }
}

impl ActionRepr {
    /// Applies the representation to a `(m, act_dim)` action matrix.
    pub fn apply(&self, actions: &Tensor) -> Result<Tensor> {
        match self {
            Self::Identity => Ok(actions.clone()),
            Self::OneHot { num_actions } => {
                let (m, _) = actions.dims2()?;
                let rows = actions.to_vec2::<f32>()?;
                let mut data = vec![0f32; m * num_actions];
                for (i, row) in rows.iter().enumerate() {
                    let a = row[0] as usize;
                    ensure!(
                        a < *num_actions,
                        "action index {} out of range for {} actions",
                        a,
                        num_actions
                    );
                    data[i * num_actions + a] = 1.0;
                }
                Ok(Tensor::from_vec(data, (m, *num_actions), actions.device())?)
            }
        }
    }

    /// Dimension of represented actions, given the raw action dimension.
    pub fn repr_dim(&self, raw_dim: usize) -> usize {
        match self {
            Self::Identity => raw_dim,
            Self::OneHot { num_actions } => *num_actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn identity_passes_through() -> Result<()> {
        let t = Tensor::from_vec(vec![0.5f32, 1.5], (2, 1), &Device::Cpu)?;
        let r = ActionRepr::Identity.apply(&t)?;
        assert_eq!(r.to_vec2::<f32>()?, t.to_vec2::<f32>()?);
        assert_eq!(ActionRepr::Identity.repr_dim(1), 1);
        Ok(())
    }

    #[test]
    fn one_hot_rows() -> Result<()> {
        let repr = ActionRepr::OneHot { num_actions: 3 };
        let t = Tensor::from_vec(vec![2f32, 0f32], (2, 1), &Device::Cpu)?;
        let r = repr.apply(&t)?;
        assert_eq!(
            r.to_vec2::<f32>()?,
            vec![vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]]
        );
        assert_eq!(repr.repr_dim(1), 3);
        Ok(())
    }

    #[test]
    fn out_of_range_index_rejected() -> Result<()> {
        let repr = ActionRepr::OneHot { num_actions: 2 };
        let t = Tensor::from_vec(vec![5f32], (1, 1), &Device::Cpu)?;
        assert!(repr.apply(&t).is_err());
        Ok(())
    }
}

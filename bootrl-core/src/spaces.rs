//! Action spaces.
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// The set of actions an agent can take.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum ActionSpace {
    /// A finite set of actions, each with a representation vector.
    Discrete(DiscreteActionSpace),

    /// Continuous actions bounded below and above per dimension.
    Box(BoxActionSpace),
}

impl ActionSpace {
    /// Name of the concrete space, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discrete(_) => "DiscreteActionSpace",
            Self::Box(_) => "BoxActionSpace",
        }
    }
}

/// A discrete action space.
///
/// Each action carries a fixed-size representation vector; the agent feeds
/// these vectors to its action-value network. Actions are referred to by
/// their index into the space.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DiscreteActionSpace {
    actions: Vec<Vec<f32>>,
}

impl DiscreteActionSpace {
    /// Creates a space from per-action representation vectors.
    ///
    /// All vectors must have the same length.
    pub fn new(actions: Vec<Vec<f32>>) -> Result<Self> {
        ensure!(!actions.is_empty(), "an action space must not be empty");
        let dim = actions[0].len();
        ensure!(
            actions.iter().all(|a| a.len() == dim),
            "action representations must all have dimension {}",
            dim
        );
        Ok(Self { actions })
    }

    /// Creates a space of `n` actions with one-hot representations.
    pub fn one_hot(n: usize) -> Self {
        let actions = (0..n)
            .map(|i| {
                let mut a = vec![0f32; n];
                a[i] = 1.0;
                a
            })
            .collect();
        Self { actions }
    }

    /// Number of actions.
    pub fn n(&self) -> usize {
        self.actions.len()
    }

    /// Dimension of the action representation vectors.
    pub fn action_dim(&self) -> usize {
        self.actions[0].len()
    }

    /// Representation vectors of all actions.
    pub fn actions(&self) -> &[Vec<f32>] {
        &self.actions
    }

    /// All representations flattened row-major into a single vector.
    ///
    /// The result has length `n() * action_dim()`.
    pub fn actions_batch(&self) -> Vec<f32> {
        self.actions.iter().flatten().copied().collect()
    }
}

/// A continuous action space bounded per dimension.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BoxActionSpace {
    /// Lower bound per dimension.
    pub low: Vec<f32>,

    /// Upper bound per dimension.
    pub high: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_space() {
        let space = DiscreteActionSpace::one_hot(3);
        assert_eq!(space.n(), 3);
        assert_eq!(space.action_dim(), 3);
        assert_eq!(space.actions()[1], vec![0.0, 1.0, 0.0]);
        assert_eq!(space.actions_batch().len(), 9);
    }

    #[test]
    fn ragged_representations_rejected() {
        assert!(DiscreteActionSpace::new(vec![vec![0.0], vec![0.0, 1.0]]).is_err());
        assert!(DiscreteActionSpace::new(vec![]).is_err());
    }

    #[test]
    fn kind_names() {
        let d = ActionSpace::Discrete(DiscreteActionSpace::one_hot(2));
        let b = ActionSpace::Box(BoxActionSpace {
            low: vec![-1.0],
            high: vec![1.0],
        });
        assert_eq!(d.kind(), "DiscreteActionSpace");
        assert_eq!(b.kind(), "BoxActionSpace");
    }
}

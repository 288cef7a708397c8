//! Transition batches with bootstrap masks.
use anyhow::{ensure, Result};
use candle_core::Tensor;

/// A batch of transitions sampled from a replay buffer.
///
/// Actions are stored in their represented form (see
/// [`ActionRepr`](crate::repr::ActionRepr)). The next-state fields may be
/// `None` only when every transition in the batch is terminal; `check`
/// enforces this together with the shared batch length.
///
/// Shapes, with `n` the batch length, `A` the number of actions and `a` the
/// action representation dimension:
///
/// * `obs` - `(n, obs_dim)` f32
/// * `act` - `(n, a)` f32
/// * `reward` - `(n,)` f32
/// * `terminated` - `(n,)` u8
/// * `curr_available_actions` - `(n, A, a)` f32
/// * `next_obs` - `(n, obs_dim)` f32
/// * `next_available_actions` - `(n, A, a)` f32
/// * `next_unavailable_actions_mask` - `(n, A)` u8, 1 marks an action slot
///   that only exists as padding in the next state
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub obs: Tensor,
    pub act: Tensor,
    pub reward: Tensor,
    pub terminated: Tensor,
    pub curr_available_actions: Tensor,
    pub next_obs: Option<Tensor>,
    pub next_available_actions: Option<Tensor>,
    pub next_unavailable_actions_mask: Option<Tensor>,
}

impl TransitionBatch {
    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.obs.dims()[0]
    }

    /// Returns if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates the batch invariants.
    ///
    /// All per-transition tensors must share the same leading dimension, and
    /// the next-state fields must be present whenever at least one
    /// transition is not terminal.
    pub fn check(&self) -> Result<()> {
        let n = self.len();
        ensure!(n > 0, "a transition batch must not be empty");
        for (name, t) in [
            ("act", &self.act),
            ("reward", &self.reward),
            ("terminated", &self.terminated),
            ("curr_available_actions", &self.curr_available_actions),
        ] {
            ensure!(
                t.dims()[0] == n,
                "field {} has batch length {}, expected {}",
                name,
                t.dims()[0],
                n
            );
        }

        let any_non_terminal = self
            .terminated
            .to_vec1::<u8>()?
            .iter()
            .any(|&t| t == 0);
        if any_non_terminal {
            for (name, t) in [
                ("next_obs", &self.next_obs),
                ("next_available_actions", &self.next_available_actions),
                (
                    "next_unavailable_actions_mask",
                    &self.next_unavailable_actions_mask,
                ),
            ] {
                ensure!(
                    t.is_some(),
                    "field {} is missing on a batch with non-terminal transitions",
                    name
                );
            }
        }
        for (name, t) in [
            ("next_obs", &self.next_obs),
            ("next_available_actions", &self.next_available_actions),
            (
                "next_unavailable_actions_mask",
                &self.next_unavailable_actions_mask,
            ),
        ] {
            if let Some(t) = t {
                ensure!(
                    t.dims()[0] == n,
                    "field {} has batch length {}, expected {}",
                    name,
                    t.dims()[0],
                    n
                );
            }
        }

        Ok(())
    }
}

/// A [`TransitionBatch`] extended with a per-member inclusion mask.
///
/// Entry `(i, z)` of the mask is non-zero iff transition `i` belongs to the
/// training sub-batch of ensemble member `z`. The mask is produced by the
/// replay buffer at insertion time and consumed read-only here.
#[derive(Clone, Debug)]
pub struct TransitionWithBootstrapMaskBatch {
    batch: TransitionBatch,
    bootstrap_mask: Tensor,
}

impl TransitionWithBootstrapMaskBatch {
    /// Creates the masked batch, validating both parts.
    ///
    /// `bootstrap_mask` is a `(n, K)` u8 tensor.
    pub fn new(batch: TransitionBatch, bootstrap_mask: Tensor) -> Result<Self> {
        batch.check()?;
        let (n, k) = bootstrap_mask.dims2()?;
        ensure!(
            n == batch.len(),
            "bootstrap mask has {} rows for a batch of length {}",
            n,
            batch.len()
        );
        ensure!(k > 0, "bootstrap mask must have at least one column");
        Ok(Self {
            batch,
            bootstrap_mask,
        })
    }

    /// The underlying transitions.
    pub fn batch(&self) -> &TransitionBatch {
        &self.batch
    }

    /// The `(n, K)` inclusion mask.
    pub fn bootstrap_mask(&self) -> &Tensor {
        &self.bootstrap_mask
    }

    /// Number of mask columns K.
    pub fn ensemble_size(&self) -> usize {
        self.bootstrap_mask.dims()[1]
    }

    /// Compacts the training sub-batch of ensemble member `z`.
    ///
    /// Keeps exactly the transitions whose mask column `z` is set,
    /// preserving every field and the relative order. Returns `None` when
    /// the column is all zero; callers skip the member in that case rather
    /// than running the network on a zero-size batch.
    pub fn sub_batch(&self, z: usize) -> Result<Option<TransitionBatch>> {
        ensure!(
            z < self.ensemble_size(),
            "ensemble index {} out of range ({} mask columns)",
            z,
            self.ensemble_size()
        );
        let rows: Vec<u32> = self
            .bootstrap_mask
            .to_vec2::<u8>()?
            .iter()
            .enumerate()
            .filter(|(_, row)| row[z] != 0)
            .map(|(i, _)| i as u32)
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }

        let ixs = Tensor::from_vec(rows.clone(), (rows.len(),), self.bootstrap_mask.device())?;
        let b = &self.batch;
        Ok(Some(TransitionBatch {
            obs: b.obs.index_select(&ixs, 0)?,
            act: b.act.index_select(&ixs, 0)?,
            reward: b.reward.index_select(&ixs, 0)?,
            terminated: b.terminated.index_select(&ixs, 0)?,
            curr_available_actions: b.curr_available_actions.index_select(&ixs, 0)?,
            next_obs: b
                .next_obs
                .as_ref()
                .map(|t| t.index_select(&ixs, 0))
                .transpose()?,
            next_available_actions: b
                .next_available_actions
                .as_ref()
                .map(|t| t.index_select(&ixs, 0))
                .transpose()?,
            next_unavailable_actions_mask: b
                .next_unavailable_actions_mask
                .as_ref()
                .map(|t| t.index_select(&ixs, 0))
                .transpose()?,
        }))
    }
}

/// The input boundary of `learn_batch`.
///
/// Bootstrapped DQN trains only on masked batches; passing the plain
/// variant is a contract violation reported with the offending type name.
#[derive(Clone, Debug)]
pub enum ReplayBatch {
    /// Plain transitions, no bootstrap mask.
    Plain(TransitionBatch),

    /// Transitions with a bootstrap mask.
    BootstrapMasked(TransitionWithBootstrapMaskBatch),
}

impl ReplayBatch {
    /// Name of the concrete batch type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Plain(_) => "TransitionBatch",
            Self::BootstrapMasked(_) => "TransitionWithBootstrapMaskBatch",
        }
    }
}

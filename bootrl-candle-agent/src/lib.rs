//! Bootstrapped DQN agent implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The agent keeps an ensemble of K action-value networks behind the
//! [`EnsembleModel`](model::EnsembleModel) trait. Each episode one member is
//! sampled and its greedy policy is followed (deep exploration); each
//! training batch carries a bootstrap mask routing every transition to a
//! subset of the members.
pub mod batch;
pub mod bootstrapped_dqn;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod repr;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support
/// serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl From<Device> for candle_core::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => Self::Cpu,
            Device::Cuda(n) => Self::new_cuda(n).unwrap(),
        }
    }
}

//! Bootstrapped DQN agent.
mod base;
mod config;
mod exploration;
mod model;
pub use base::{BootstrappedDqn, BootstrappedDqnError};
pub use config::BootstrappedDqnConfig;
pub use exploration::DeepExploration;
pub use model::{EnsembleQModel, EnsembleQModelConfig};

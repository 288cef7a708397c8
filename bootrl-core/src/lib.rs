#![warn(missing_docs)]
//! Core abstractions for the bootrl reinforcement learning library.
//!
//! This crate is backend agnostic: it defines the [`PolicyLearner`]
//! interface, action spaces and the [`Record`](record::Record) container
//! used for logging training metrics. Concrete agents live in backend
//! crates such as `bootrl-candle-agent`.
pub mod error;
pub mod record;

mod base;
mod spaces;
pub use base::PolicyLearner;
pub use spaces::{ActionSpace, BoxActionSpace, DiscreteActionSpace};

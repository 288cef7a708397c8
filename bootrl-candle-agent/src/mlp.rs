//! Ensemble of multilayer perceptrons.
mod base;
mod config;
pub use base::EnsembleMlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::EnsembleMlpConfig;

fn mlp_forward(xs: Tensor, layers: &[Linear]) -> Result<Tensor, candle_core::Error> {
    let n_layers = layers.len();
    let mut xs = xs;

    for layer in &layers[..n_layers - 1] {
        xs = layer.forward(&xs)?.relu()?;
    }

    layers[n_layers - 1].forward(&xs)
}

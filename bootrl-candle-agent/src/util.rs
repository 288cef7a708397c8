//! Utilities.
use anyhow::{Context, Result};
use candle_nn::VarMap;
use log::trace;

/// Applies a soft (Polyak) update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
///
/// With `tau = 1.0` this is a hard copy of `src` into `dest`.
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    let dest = dest.data().lock().unwrap();
    let src = src.data().lock().unwrap();

    for (name, v_dest) in dest.iter() {
        trace!("track {}", name);
        let v_src = src
            .get(name)
            .with_context(|| format!("var {} is missing in the source varmap", name))?;
        let t = ((tau * v_src.as_tensor())? + ((1.0 - tau) * v_dest.as_tensor())?)?;
        v_dest.set(&t)?;
    }

    Ok(())
}

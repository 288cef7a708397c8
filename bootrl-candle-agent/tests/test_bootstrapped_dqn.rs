//! End-to-end smoke test: learn/act/reset cycles on synthetic transitions.
use anyhow::Result;
use bootrl_candle_agent::{
    batch::{ReplayBatch, TransitionBatch, TransitionWithBootstrapMaskBatch},
    bootstrapped_dqn::{BootstrappedDqn, BootstrappedDqnConfig, EnsembleQModelConfig},
    mlp::{EnsembleMlp, EnsembleMlpConfig},
    Device,
};
use bootrl_core::{ActionSpace, DiscreteActionSpace, PolicyLearner};
use candle_core::{DType, Tensor};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const OBS_DIM: usize = 4;
const N_ACTIONS: usize = 2;
const ENSEMBLE_SIZE: usize = 3;
const BATCH_SIZE: usize = 16;

fn create_agent() -> Result<BootstrappedDqn<EnsembleMlp>> {
    let config = BootstrappedDqnConfig::default()
        .model_config(
            EnsembleQModelConfig::default().q_config(EnsembleMlpConfig::new(
                OBS_DIM,
                N_ACTIONS,
                vec![16, 16],
                ENSEMBLE_SIZE,
            )),
        )
        .batch_size(BATCH_SIZE)
        .target_update_freq(5)
        .tau(1.0)
        .seed(0)
        .device(Device::Cpu);
    BootstrappedDqn::build(config, &action_space())
}

fn action_space() -> ActionSpace {
    ActionSpace::Discrete(DiscreteActionSpace::one_hot(N_ACTIONS))
}

/// A random batch where every transition is included in at least one
/// member's sub-batch and every member gets at least one transition.
fn sample_batch(rng: &mut SmallRng) -> Result<ReplayBatch> {
    let dev = candle_core::Device::Cpu;
    let n = BATCH_SIZE;

    let obs: Vec<f32> = (0..n * OBS_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let next_obs: Vec<f32> = (0..n * OBS_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let act: Vec<f32> = (0..n)
        .flat_map(|_| {
            let a = rng.gen_range(0..N_ACTIONS);
            (0..N_ACTIONS).map(move |i| (i == a) as u8 as f32)
        })
        .collect();
    let reward: Vec<f32> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let terminated: Vec<u8> = (0..n).map(|_| (rng.gen::<f32>() < 0.1) as u8).collect();
    let avail: Vec<f32> = (0..n)
        .flat_map(|_| DiscreteActionSpace::one_hot(N_ACTIONS).actions_batch())
        .collect();

    let batch = TransitionBatch {
        obs: Tensor::from_vec(obs, (n, OBS_DIM), &dev)?,
        act: Tensor::from_vec(act, (n, N_ACTIONS), &dev)?,
        reward: Tensor::from_vec(reward, (n,), &dev)?,
        terminated: Tensor::from_vec(terminated, (n,), &dev)?,
        curr_available_actions: Tensor::from_vec(
            avail.clone(),
            (n, N_ACTIONS, N_ACTIONS),
            &dev,
        )?,
        next_obs: Some(Tensor::from_vec(next_obs, (n, OBS_DIM), &dev)?),
        next_available_actions: Some(Tensor::from_vec(
            avail,
            (n, N_ACTIONS, N_ACTIONS),
            &dev,
        )?),
        next_unavailable_actions_mask: Some(Tensor::zeros((n, N_ACTIONS), DType::U8, &dev)?),
    };

    let mask: Vec<u8> = (0..n)
        .flat_map(|i| {
            (0..ENSEMBLE_SIZE).map(move |z| {
                // the diagonal guarantees non-empty rows and columns
                (i % ENSEMBLE_SIZE == z) as u8
            })
        })
        .zip((0..n * ENSEMBLE_SIZE).map(|_| rng.gen::<bool>() as u8))
        .map(|(diag, coin)| diag | coin)
        .collect();
    let mask = Tensor::from_vec(mask, (n, ENSEMBLE_SIZE), &dev)?;

    Ok(ReplayBatch::BootstrapMasked(
        TransitionWithBootstrapMaskBatch::new(batch, mask)?,
    ))
}

#[test]
fn learn_act_reset_cycles() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = SmallRng::seed_from_u64(42);
    let mut agent = create_agent()?;
    let space = action_space();

    for step in 0..200 {
        let replay = sample_batch(&mut rng)?;
        let loss = agent.learn_batch(&replay)?.get_scalar("loss")?;
        assert!(loss.is_finite(), "loss diverged at step {}", step);
        assert!(loss >= 0.0);

        if step % 10 == 0 {
            agent.reset(&space)?;
            assert!(agent.active_member() < ENSEMBLE_SIZE);

            let obs = Tensor::from_vec(
                (0..OBS_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f32>>(),
                OBS_DIM,
                &candle_core::Device::Cpu,
            )?;
            let greedy = agent.act(&obs, &space, true)?;
            let explored = agent.act(&obs, &space, false)?;
            assert!(greedy < N_ACTIONS);
            assert!(explored < N_ACTIONS);
        }
    }

    assert_eq!(agent.n_opts(), 200);
    Ok(())
}

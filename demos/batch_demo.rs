// Demonstration: simulate a toy two-agent task and feed all three batch builders.
//
// Build/run from this repo root:
//   RUST_LOG=debug cargo run --example batch_demo -- --episodes 8 --seed 42

use std::env;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use neuralese::{
    CommState, Config, Experience, FeedSlots, ReconstructionBatchBuilder, ReplayBatchBuilder,
    RolloutRequestBuilder, Task, Token, WorldState,
};

/// Two agents on a ring of `RING` cells. Each sees its own cell one-hot and
/// describes it with a single token.
const RING: usize = 6;

#[derive(Debug, Clone)]
struct Ring {
    cells: [usize; 2],
    desc: Vec<Vec<Token>>,
}

impl Ring {
    fn new(cells: [usize; 2]) -> Self {
        let desc = cells.iter().map(|&c| vec![c as Token + 1]).collect();
        Self { cells, desc }
    }

    fn step(&self, actions: &[usize]) -> Self {
        // action 0 stays, 1 moves clockwise, 2 counter-clockwise
        let mut cells = self.cells;
        for (cell, &action) in cells.iter_mut().zip(actions) {
            *cell = match action {
                1 => (*cell + 1) % RING,
                2 => (*cell + RING - 1) % RING,
                _ => *cell,
            };
        }
        Self::new(cells)
    }
}

impl WorldState for Ring {
    fn obs(&self) -> Vec<Vec<f32>> {
        self.cells
            .iter()
            .map(|&c| {
                let mut v = vec![0.0; RING];
                v[c] = 1.0;
                v
            })
            .collect()
    }

    fn desc(&self) -> &[Vec<Token>] {
        &self.desc
    }
}

struct RingTask {
    seed: u64,
}

impl Task for RingTask {
    type State = Ring;

    fn n_agents(&self) -> usize {
        2
    }

    fn n_features(&self) -> usize {
        RING
    }

    fn n_actions(&self) -> &[usize] {
        &[3, 3]
    }

    fn max_desc_len(&self) -> usize {
        2
    }

    fn n_vocab(&self) -> usize {
        RING + 1
    }

    fn distractors_for(&self, state: &Ring, agent: usize, k: usize) -> Vec<(Ring, f64)> {
        // keep the observer in place, move the other agent anywhere
        let mut rng = StdRng::seed_from_u64(self.seed ^ state.cells[agent] as u64);
        (0..k)
            .map(|_| {
                let mut cells = state.cells;
                cells[1 - agent] = rng.gen_range(0..RING);
                (Ring::new(cells), 1.0 / RING as f64)
            })
            .collect()
    }
}

fn comm(rng: &mut StdRng, config: &Config) -> CommState {
    let mut vectors = |width: usize| -> Vec<Vec<f32>> {
        (0..2)
            .map(|_| (0..width).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect()
    };
    let hidden = vectors(config.model.n_hidden);
    let message = vectors(config.channel.n_msg);
    let desc_hidden = vectors(config.model.n_hidden);
    CommState::new(hidden, message, desc_hidden)
}

fn simulate(rng: &mut StdRng, config: &Config, len: usize) -> Vec<Experience<Ring>> {
    let mut state = Ring::new([rng.gen_range(0..RING), rng.gen_range(0..RING)]);
    let mut prior = None;
    let mut episode = Vec::with_capacity(len);
    for t in 0..len {
        let actions = vec![rng.gen_range(0..3), rng.gen_range(0..3)];
        let next_state = state.step(&actions);
        let next_comm = comm(rng, config);
        let met = next_state.cells[0] == next_state.cells[1];
        episode.push(Experience {
            state: state.clone(),
            comm: prior.take(),
            actions,
            next_state: next_state.clone(),
            next_comm: next_comm.clone(),
            reward: if met { 1.0 } else { 0.0 },
            terminal: met || t + 1 == len,
        });
        if met {
            break;
        }
        state = next_state;
        prior = Some(next_comm);
    }
    episode
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    let mut config = Config::default();
    config.trainer.n_rollout_episodes = episodes;
    config.trainer.n_batch_episodes = episodes;
    config.trainer.n_batch_history = 10;
    config.model.n_hidden = 8;
    config.channel.n_msg = 4;

    let task = RingTask { seed };
    let mut rng = StdRng::seed_from_u64(seed);
    let traces: Vec<_> = (0..episodes)
        .map(|_| simulate(&mut rng, &config, config.trainer.n_batch_history))
        .collect();

    if let Err(e) = run(&task, &config, &traces) {
        eprintln!("batching failed: {}", e);
        std::process::exit(1);
    }
}

fn run(
    task: &RingTask,
    config: &Config,
    traces: &[Vec<Experience<Ring>>],
) -> Result<(), neuralese::BatchError> {
    let n = config.trainer.n_rollout_episodes;

    let mut rollout = RolloutRequestBuilder::new(task, config)?;
    let worlds: Vec<Ring> = traces.iter().map(|ep| ep[0].state.clone()).collect();
    let zeros = |width: usize| vec![Array2::<f32>::zeros((n, width)); task.n_agents()];
    let batch = rollout.feed(
        &zeros(config.model.n_hidden),
        &zeros(config.channel.n_msg),
        &zeros(config.model.n_hidden),
        &worlds,
    )?;
    print_slots("rollout", batch);

    let mut replay = ReplayBatchBuilder::new(task, config)?;
    let batch = replay.feed(traces)?;
    println!("replay: {} valid steps", batch.valid_steps());
    print_slots("replay", batch);

    // translator rows need an incoming message, so skip each episode's first step
    let experiences: Vec<Experience<Ring>> = traces
        .iter()
        .filter_map(|ep| ep.last().filter(|e| e.comm.is_some()).cloned())
        .collect();
    if experiences.len() < config.trainer.n_batch_episodes {
        println!(
            "reconstruction: only {} of {} episodes lasted past their first step",
            experiences.len(),
            config.trainer.n_batch_episodes
        );
        return Ok(());
    }
    let mut reconstruction = ReconstructionBatchBuilder::new(task, config)?;
    let batch = reconstruction.feed(task, &experiences, 0, 1)?;
    println!("reconstruction: candidates {:?}", batch.candidates().dim());
    print_slots("reconstruction", batch);
    Ok(())
}

fn print_slots<B: FeedSlots>(label: &str, batch: &B) {
    for (key, value) in batch.slots() {
        println!("{:>16} {:<16} {:?}", label, key.to_string(), value.shape());
    }
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

//! Small hand-built fixtures shared by the unit tests.

use crate::experience::{CommState, Experience};
use crate::task::{Task, Token, WorldState};

#[derive(Debug, Clone, PartialEq)]
pub struct StubWorld {
    pub obs: Vec<Vec<f32>>,
    pub desc: Vec<Vec<Token>>,
}

impl StubWorld {
    pub fn new(obs: Vec<Vec<f32>>, desc: Vec<Vec<Token>>) -> Self {
        Self { obs, desc }
    }

    /// A world whose agent `a` observes `[seed + a, seed + a + 0.1, ...]`
    /// and describes itself with `desc_len` tokens starting at `a + 1`.
    pub fn seeded(seed: f32, n_agents: usize, n_features: usize, desc_len: usize) -> Self {
        let obs = (0..n_agents)
            .map(|a| {
                (0..n_features)
                    .map(|f| seed + a as f32 + 0.1 * f as f32)
                    .collect()
            })
            .collect();
        let desc = (0..n_agents)
            .map(|a| (0..desc_len).map(|t| (a + t + 1) as Token).collect())
            .collect();
        Self { obs, desc }
    }
}

impl WorldState for StubWorld {
    fn obs(&self) -> Vec<Vec<f32>> {
        self.obs.clone()
    }

    fn desc(&self) -> &[Vec<Token>] {
        &self.desc
    }
}

/// Task whose distractor `d` is the input state with every observation
/// shifted by `100 * (d + 1)`.
#[derive(Debug, Clone)]
pub struct StubTask {
    pub n_agents: usize,
    pub n_features: usize,
    pub n_actions: Vec<usize>,
    pub max_desc_len: usize,
    pub n_vocab: usize,
}

impl StubTask {
    pub fn new(
        n_agents: usize,
        n_features: usize,
        n_actions: Vec<usize>,
        max_desc_len: usize,
    ) -> Self {
        Self {
            n_agents,
            n_features,
            n_actions,
            max_desc_len,
            n_vocab: 16,
        }
    }
}

impl Task for StubTask {
    type State = StubWorld;

    fn n_agents(&self) -> usize {
        self.n_agents
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_actions(&self) -> &[usize] {
        &self.n_actions
    }

    fn max_desc_len(&self) -> usize {
        self.max_desc_len
    }

    fn n_vocab(&self) -> usize {
        self.n_vocab
    }

    fn distractors_for(
        &self,
        state: &StubWorld,
        _agent: usize,
        k: usize,
    ) -> Vec<(StubWorld, f64)> {
        (0..k)
            .map(|d| {
                let shift = 100.0 * (d + 1) as f32;
                let obs = state
                    .obs
                    .iter()
                    .map(|o| o.iter().map(|v| v + shift).collect())
                    .collect();
                (StubWorld::new(obs, state.desc.clone()), 1.0 / k as f64)
            })
            .collect()
    }
}

/// A communication state whose every entry encodes `(tag, agent)`.
pub fn comm(tag: f32, n_agents: usize, n_hidden: usize, n_msg: usize) -> CommState {
    CommState::new(
        (0..n_agents).map(|a| vec![tag + a as f32; n_hidden]).collect(),
        (0..n_agents).map(|a| vec![tag + 10.0 + a as f32; n_msg]).collect(),
        (0..n_agents).map(|a| vec![tag + 20.0 + a as f32; n_hidden]).collect(),
    )
}

/// Step `j` of a synthetic episode; only step 0 lacks a prior comm state.
pub fn experience(
    j: usize,
    n_agents: usize,
    n_features: usize,
    n_hidden: usize,
    n_msg: usize,
) -> Experience<StubWorld> {
    let seed = 10.0 * j as f32;
    Experience {
        state: StubWorld::seeded(seed, n_agents, n_features, 2),
        comm: (j > 0).then(|| comm(seed, n_agents, n_hidden, n_msg)),
        actions: (0..n_agents).map(|a| (j + a) % 2).collect(),
        next_state: StubWorld::seeded(seed + 10.0, n_agents, n_features, 3),
        next_comm: comm(seed + 10.0, n_agents, n_hidden, n_msg),
        reward: j as f32 + 0.5,
        terminal: false,
    }
}

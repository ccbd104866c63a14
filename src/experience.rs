//! Experience records and episode validation.

use crate::batch::BatchError;

/// Joint communication state of all agents at one point of an episode.
///
/// Each component holds one vector per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct CommState {
    /// Recurrent policy state, width `n_hidden`.
    pub hidden: Vec<Vec<f32>>,
    /// Channel output, width `n_msg`.
    pub message: Vec<Vec<f32>>,
    /// Recurrent description-encoder state, width `n_hidden`.
    pub desc_hidden: Vec<Vec<f32>>,
}

impl CommState {
    pub fn new(hidden: Vec<Vec<f32>>, message: Vec<Vec<f32>>, desc_hidden: Vec<Vec<f32>>) -> Self {
        Self {
            hidden,
            message,
            desc_hidden,
        }
    }

    /// An all-zero state for `n_agents` agents.
    pub fn zeros(n_agents: usize, n_hidden: usize, n_msg: usize) -> Self {
        Self {
            hidden: vec![vec![0.0; n_hidden]; n_agents],
            message: vec![vec![0.0; n_msg]; n_agents],
            desc_hidden: vec![vec![0.0; n_hidden]; n_agents],
        }
    }

    pub fn n_agents(&self) -> usize {
        self.hidden.len()
    }
}

/// One transition of the joint system.
#[derive(Debug, Clone)]
pub struct Experience<S> {
    /// World state before acting.
    pub state: S,
    /// Communication state before acting; absent only on an episode's first step.
    pub comm: Option<CommState>,
    /// Per-agent action indices, `actions[a] < n_actions[a]`.
    pub actions: Vec<usize>,
    /// World state after acting.
    pub next_state: S,
    /// Communication state produced by acting.
    pub next_comm: CommState,
    /// Reward shared by all agents.
    pub reward: f32,
    pub terminal: bool,
}

impl<S> Experience<S> {
    /// True if this transition opens an episode, i.e. carries no prior
    /// communication state.
    pub fn is_episode_start(&self) -> bool {
        self.comm.is_none()
    }
}

/// Checks that `episode` can be written into a window of `max_len` steps.
///
/// `index` is the episode's row in the batch and is only used in errors.
pub fn validate_episode<S>(
    index: usize,
    episode: &[Experience<S>],
    max_len: usize,
) -> Result<(), BatchError> {
    if episode.is_empty() {
        return Err(BatchError::InvalidEpisode {
            episode: index,
            reason: "episode has no transitions".into(),
        });
    }
    if episode.len() > max_len {
        return Err(BatchError::out_of_range("episode length", episode.len(), max_len));
    }
    if let Some(step) = episode.iter().skip(1).position(|e| e.comm.is_none()) {
        return Err(BatchError::InvalidEpisode {
            episode: index,
            reason: format!("step {} has no communication state", step + 1),
        });
    }
    Ok(())
}

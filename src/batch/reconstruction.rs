//! Belief-translator batches.
//!
//! For an (observer, hidden agent) pair, each row holds what the observer
//! saw, the message the hidden agent sent, the observer's description, the
//! hidden agent's true observation, and the hidden agent's observation in
//! `n_distractors` alternative states the observer could not rule out.

use ndarray::{s, Array2, Array3};
use tracing::{debug, warn};

use super::error::BatchError;
use super::pad::DescriptionPadder;
use super::slot::{Feed, FeedSlots, Placeholder, SlotKey, SlotName};
use super::{check_agent, per_agent, write_row};
use crate::config::Config;
use crate::experience::Experience;
use crate::task::{Task, TaskShape, WorldState};

/// Index of the true observation within [`ReconstructionBatch::candidates`].
pub const TRUE_CANDIDATE: usize = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionBatch {
    /// Observer's own observation, `(n_batch_episodes, n_features)`.
    pub xb: Array2<f32>,
    /// Message received from the hidden agent, `(n_batch_episodes, n_msg)`.
    pub z: Array2<f32>,
    /// Hidden agent's true observation, `(n_batch_episodes, n_features)`.
    pub xa_true: Array2<f32>,
    /// Hidden agent's observation in each distractor state,
    /// `(n_batch_episodes, n_distractors, n_features)`.
    pub xa_noise: Array3<f32>,
    /// Observer's padded description, `(n_batch_episodes, max_desc_len)`.
    pub desc: Array2<i32>,
    pub obs_agent: usize,
    pub hidden_agent: usize,
}

impl ReconstructionBatch {
    fn zeros(shape: &TaskShape, n_batch: usize, n_distractors: usize, n_msg: usize) -> Self {
        Self {
            xb: Array2::zeros((n_batch, shape.n_features)),
            z: Array2::zeros((n_batch, n_msg)),
            xa_true: Array2::zeros((n_batch, shape.n_features)),
            xa_noise: Array3::zeros((n_batch, n_distractors, shape.n_features)),
            desc: Array2::zeros((n_batch, shape.max_desc_len)),
            obs_agent: 0,
            hidden_agent: 0,
        }
    }

    /// All candidate observations per row, the true one first:
    /// `(n_batch_episodes, n_distractors + 1, n_features)`.
    pub fn candidates(&self) -> Array3<f32> {
        let (n_batch, n_distractors, n_features) = self.xa_noise.dim();
        let mut all = Array3::zeros((n_batch, n_distractors + 1, n_features));
        all.slice_mut(s![.., TRUE_CANDIDATE, ..]).assign(&self.xa_true);
        all.slice_mut(s![.., TRUE_CANDIDATE + 1.., ..])
            .assign(&self.xa_noise);
        all
    }
}

impl FeedSlots for ReconstructionBatch {
    fn slots(&self) -> Feed<'_> {
        let mut feed = Feed::new();
        feed.insert(SlotKey::shared(SlotName::ObserverFeatures), (&self.xb).into());
        feed.insert(SlotKey::shared(SlotName::Message), (&self.z).into());
        feed.insert(SlotKey::shared(SlotName::TrueFeatures), (&self.xa_true).into());
        feed.insert(
            SlotKey::shared(SlotName::DistractorFeatures),
            (&self.xa_noise).into(),
        );
        feed.insert(SlotKey::shared(SlotName::Desc), (&self.desc).into());
        feed
    }
}

/// Builds translator training batches of `n_batch_episodes` independent rows.
#[derive(Debug)]
pub struct ReconstructionBatchBuilder {
    shape: TaskShape,
    n_batch: usize,
    n_distractors: usize,
    n_msg: usize,
    padder: DescriptionPadder,
    placeholders: Vec<Placeholder>,
    batch: ReconstructionBatch,
}

impl ReconstructionBatchBuilder {
    pub fn new<T: Task + ?Sized>(task: &T, config: &Config) -> Result<Self, BatchError> {
        config.validate()?;
        let shape = TaskShape::of(task)?;
        let n_batch = config.trainer.n_batch_episodes;
        let n_distractors = config.trainer.n_distractors;
        let n_msg = config.channel.n_msg;

        let batch = ReconstructionBatch::zeros(&shape, n_batch, n_distractors, n_msg);
        let placeholders = Placeholder::declare(&batch);
        debug!(n_batch, n_distractors, "allocated reconstruction slots");

        Ok(Self {
            padder: DescriptionPadder::new(&shape),
            shape,
            n_batch,
            n_distractors,
            n_msg,
            placeholders,
            batch,
        })
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn batch(&self) -> &ReconstructionBatch {
        &self.batch
    }

    /// Fills one row per experience, reading each experience's pre-transition
    /// state from the viewpoint of `obs_agent` about `hidden_agent`.
    ///
    /// Distractors come from `task.distractors_for(state, obs_agent, n)`.
    /// Their sampling probabilities are not used here, and distractors equal
    /// to the true observation are kept as given.
    pub fn feed<T: Task + ?Sized>(
        &mut self,
        task: &T,
        experiences: &[Experience<T::State>],
        obs_agent: usize,
        hidden_agent: usize,
    ) -> Result<&ReconstructionBatch, BatchError> {
        let n_agents = self.shape.n_agents;
        BatchError::check_len("experiences", self.n_batch, experiences.len())?;
        check_agent(obs_agent, n_agents, "obs_agent")?;
        check_agent(hidden_agent, n_agents, "hidden_agent")?;

        let mut staged =
            ReconstructionBatch::zeros(&self.shape, self.n_batch, self.n_distractors, self.n_msg);
        staged.obs_agent = obs_agent;
        staged.hidden_agent = hidden_agent;
        let mut duplicates = 0;

        for (i, experience) in experiences.iter().enumerate() {
            let state = &experience.state;
            let comm = experience
                .comm
                .as_ref()
                .ok_or_else(|| BatchError::InvalidEpisode {
                    episode: i,
                    reason: "experience has no incoming message".into(),
                })?;
            let obs = state.obs();
            let obs = per_agent(&obs, n_agents, "observation agents")?;
            let messages = per_agent(&comm.message, n_agents, "message agents")?;
            let desc = per_agent(state.desc(), n_agents, "description agents")?;

            write_row(staged.xb.row_mut(i), &obs[obs_agent], "observation")?;
            write_row(staged.z.row_mut(i), &messages[hidden_agent], "message")?;
            self.padder.pad_into(staged.desc.row_mut(i), &desc[obs_agent])?;
            write_row(staged.xa_true.row_mut(i), &obs[hidden_agent], "observation")?;

            let distractors = task.distractors_for(state, obs_agent, self.n_distractors);
            BatchError::check_len("distractors", self.n_distractors, distractors.len())?;
            for (d, (distractor, _prob)) in distractors.iter().enumerate() {
                let distractor_obs = distractor.obs();
                let distractor_obs = per_agent(&distractor_obs, n_agents, "observation agents")?;
                let hidden_obs = &distractor_obs[hidden_agent];
                write_row(
                    staged.xa_noise.slice_mut(s![i, d, ..]),
                    hidden_obs,
                    "observation",
                )?;
                if hidden_obs == &obs[hidden_agent] {
                    duplicates += 1;
                }
            }
        }

        if duplicates > 0 {
            warn!(
                duplicates,
                obs_agent, hidden_agent, "distractors identical to the true observation"
            );
        }
        self.batch = staged;
        debug!(n_batch = self.n_batch, obs_agent, hidden_agent, "fed reconstruction batch");
        Ok(&self.batch)
    }
}

//! Training batches of fixed-length history windows.
//!
//! Each batch row is one episode window of up to `n_batch_history` steps.
//! Steps past the end of a window stay zero and are marked invalid in `mask`;
//! `mask` is the only authoritative signal of which steps are real data.
//!
//! Communication state is per window, not per step: it is the state entering
//! (`comm`) and leaving (`next_comm`) the window's first transition. A window
//! that opens its episode carries no prior state, and its communication slots
//! stay at zero, the canonical start-of-episode initializer.

use ndarray::{s, Array2, Array3};
use tracing::debug;

use super::error::BatchError;
use super::pad::DescriptionPadder;
use super::slot::{Feed, FeedSlots, Placeholder, SlotKey, SlotName};
use super::{per_agent, write_row};
use crate::config::Config;
use crate::experience::{validate_episode, CommState, Experience};
use crate::task::{Task, TaskShape, WorldState};

/// Replay slots of one agent.
///
/// Per-step arrays are `(n_batch_episodes, n_batch_history, ..)`; per-window
/// communication arrays are `(n_batch_episodes, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReplay {
    /// Observation before each step, `(n_batch_episodes, n_batch_history, n_features)`.
    pub features: Array3<f32>,
    /// Observation after each step, same shape as `features`.
    pub next_features: Array3<f32>,
    /// Padded description before each step, `(n_batch_episodes, n_batch_history, max_desc_len)`.
    pub desc: Array3<i32>,
    /// Padded description after each step, same shape as `desc`.
    pub next_desc: Array3<i32>,
    /// Message received entering the window, `(n_batch_episodes, n_msg)`.
    pub message: Array2<f32>,
    /// Message received after the window's first transition.
    pub next_message: Array2<f32>,
    /// Recurrent state entering the window, `(n_batch_episodes, n_hidden)`.
    pub hidden: Array2<f32>,
    /// Recurrent state after the window's first transition.
    pub next_hidden: Array2<f32>,
    /// Description encoder state entering the window, `(n_batch_episodes, n_hidden)`.
    pub desc_hidden: Array2<f32>,
    /// Description encoder state after the window's first transition.
    pub next_desc_hidden: Array2<f32>,
    /// Always zero, `(n_batch_episodes, n_actions[agent])`.
    pub action_values: Array2<f32>,
    /// Always zero, `(n_batch_episodes, n_actions[agent])`.
    pub next_action_values: Array2<f32>,
    /// One-hot actions, `(n_batch_episodes, n_batch_history, n_actions[agent])`.
    pub action: Array3<f32>,
    /// Index of the action taken, `(n_batch_episodes, n_batch_history)`.
    pub action_index: Array2<i32>,
}

/// A replay batch: shared per-step fields plus one slot set per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayBatch {
    /// Reward of each step, `(n_batch_episodes, n_batch_history)`.
    pub reward: Array2<f32>,
    /// 1.0 where the step ended its episode.
    pub terminal: Array2<f32>,
    /// 1.0 for real steps, 0.0 for padding.
    pub mask: Array2<f32>,
    /// One slot set per agent, in agent order.
    pub agents: Vec<AgentReplay>,
}

impl ReplayBatch {
    fn zeros(
        shape: &TaskShape,
        n_batch: usize,
        n_history: usize,
        n_hidden: usize,
        n_msg: usize,
    ) -> Self {
        let steps = |width: usize| Array3::zeros((n_batch, n_history, width));
        let window = |width: usize| Array2::zeros((n_batch, width));
        let agents = shape
            .n_actions
            .iter()
            .map(|&n_actions| AgentReplay {
                features: steps(shape.n_features),
                next_features: steps(shape.n_features),
                desc: Array3::zeros((n_batch, n_history, shape.max_desc_len)),
                next_desc: Array3::zeros((n_batch, n_history, shape.max_desc_len)),
                message: window(n_msg),
                next_message: window(n_msg),
                hidden: window(n_hidden),
                next_hidden: window(n_hidden),
                desc_hidden: window(n_hidden),
                next_desc_hidden: window(n_hidden),
                action_values: window(n_actions),
                next_action_values: window(n_actions),
                action: steps(n_actions),
                action_index: Array2::zeros((n_batch, n_history)),
            })
            .collect();

        Self {
            reward: Array2::zeros((n_batch, n_history)),
            terminal: Array2::zeros((n_batch, n_history)),
            mask: Array2::zeros((n_batch, n_history)),
            agents,
        }
    }

    /// Number of real (unmasked) steps in the batch.
    pub fn valid_steps(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0.0).count()
    }

    /// Seeds row `i`'s communication slots from a window's first transition.
    fn seed_comm(
        &mut self,
        i: usize,
        comm: &CommState,
        next_comm: &CommState,
    ) -> Result<(), BatchError> {
        let n_agents = self.agents.len();
        let hidden = per_agent(&comm.hidden, n_agents, "hidden agents")?;
        let message = per_agent(&comm.message, n_agents, "message agents")?;
        let desc_hidden = per_agent(&comm.desc_hidden, n_agents, "desc_hidden agents")?;
        let next_hidden = per_agent(&next_comm.hidden, n_agents, "hidden agents")?;
        let next_message = per_agent(&next_comm.message, n_agents, "message agents")?;
        let next_desc_hidden = per_agent(&next_comm.desc_hidden, n_agents, "desc_hidden agents")?;

        for (a, slots) in self.agents.iter_mut().enumerate() {
            write_row(slots.hidden.row_mut(i), &hidden[a], "hidden")?;
            write_row(slots.message.row_mut(i), &message[a], "message")?;
            write_row(slots.desc_hidden.row_mut(i), &desc_hidden[a], "desc_hidden")?;
            write_row(slots.next_hidden.row_mut(i), &next_hidden[a], "hidden")?;
            write_row(slots.next_message.row_mut(i), &next_message[a], "message")?;
            write_row(
                slots.next_desc_hidden.row_mut(i),
                &next_desc_hidden[a],
                "desc_hidden",
            )?;
        }
        Ok(())
    }
}

impl FeedSlots for ReplayBatch {
    fn slots(&self) -> Feed<'_> {
        let mut feed = Feed::new();
        feed.insert(SlotKey::shared(SlotName::Reward), (&self.reward).into());
        feed.insert(SlotKey::shared(SlotName::Terminal), (&self.terminal).into());
        feed.insert(SlotKey::shared(SlotName::Mask), (&self.mask).into());
        for (a, agent) in self.agents.iter().enumerate() {
            let key = |name| SlotKey::agent(name, a);
            feed.insert(key(SlotName::Features), (&agent.features).into());
            feed.insert(key(SlotName::NextFeatures), (&agent.next_features).into());
            feed.insert(key(SlotName::Desc), (&agent.desc).into());
            feed.insert(key(SlotName::NextDesc), (&agent.next_desc).into());
            feed.insert(key(SlotName::Message), (&agent.message).into());
            feed.insert(key(SlotName::NextMessage), (&agent.next_message).into());
            feed.insert(key(SlotName::Hidden), (&agent.hidden).into());
            feed.insert(key(SlotName::NextHidden), (&agent.next_hidden).into());
            feed.insert(key(SlotName::DescHidden), (&agent.desc_hidden).into());
            feed.insert(key(SlotName::NextDescHidden), (&agent.next_desc_hidden).into());
            feed.insert(key(SlotName::ActionValues), (&agent.action_values).into());
            feed.insert(
                key(SlotName::NextActionValues),
                (&agent.next_action_values).into(),
            );
            feed.insert(key(SlotName::Action), (&agent.action).into());
            feed.insert(key(SlotName::ActionIndex), (&agent.action_index).into());
        }
        feed
    }
}

/// Builds replay batches of `n_batch_episodes` windows of `n_batch_history` steps.
#[derive(Debug)]
pub struct ReplayBatchBuilder {
    shape: TaskShape,
    n_batch: usize,
    n_history: usize,
    n_hidden: usize,
    n_msg: usize,
    padder: DescriptionPadder,
    placeholders: Vec<Placeholder>,
    batch: ReplayBatch,
}

impl ReplayBatchBuilder {
    pub fn new<T: Task + ?Sized>(task: &T, config: &Config) -> Result<Self, BatchError> {
        config.validate()?;
        let shape = TaskShape::of(task)?;
        let n_batch = config.trainer.n_batch_episodes;
        let n_history = config.trainer.n_batch_history;
        let n_hidden = config.model.n_hidden;
        let n_msg = config.channel.n_msg;

        let batch = ReplayBatch::zeros(&shape, n_batch, n_history, n_hidden, n_msg);
        let placeholders = Placeholder::declare(&batch);
        debug!(
            n_agents = shape.n_agents,
            n_batch,
            n_history,
            n_slots = placeholders.len(),
            "allocated replay slots"
        );

        Ok(Self {
            padder: DescriptionPadder::new(&shape),
            shape,
            n_batch,
            n_history,
            n_hidden,
            n_msg,
            placeholders,
            batch,
        })
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn batch(&self) -> &ReplayBatch {
        &self.batch
    }

    pub fn n_history(&self) -> usize {
        self.n_history
    }

    /// Fills a replay batch, one episode window per row.
    ///
    /// Exactly `n_batch_episodes` episodes are required, each with between 1
    /// and `n_batch_history` transitions. Only the first transition of an
    /// episode may lack a communication state.
    pub fn feed<S, E>(&mut self, episodes: &[E]) -> Result<&ReplayBatch, BatchError>
    where
        S: WorldState,
        E: AsRef<[Experience<S>]>,
    {
        BatchError::check_len("episodes", self.n_batch, episodes.len())?;
        let mut staged = ReplayBatch::zeros(
            &self.shape,
            self.n_batch,
            self.n_history,
            self.n_hidden,
            self.n_msg,
        );

        for (i, episode) in episodes.iter().enumerate() {
            let episode = episode.as_ref();
            validate_episode(i, episode, self.n_history)?;

            let first = &episode[0];
            if let Some(comm) = &first.comm {
                staged.seed_comm(i, comm, &first.next_comm)?;
            }

            for (j, experience) in episode.iter().enumerate() {
                self.write_step(&mut staged, i, j, experience)?;
            }
        }

        self.batch = staged;
        debug!(
            n_batch = self.n_batch,
            valid_steps = self.batch.valid_steps(),
            "fed replay batch"
        );
        Ok(&self.batch)
    }

    fn write_step<S: WorldState>(
        &self,
        staged: &mut ReplayBatch,
        i: usize,
        j: usize,
        experience: &Experience<S>,
    ) -> Result<(), BatchError> {
        let n_agents = self.shape.n_agents;
        staged.reward[[i, j]] = experience.reward;
        staged.terminal[[i, j]] = if experience.terminal { 1.0 } else { 0.0 };
        staged.mask[[i, j]] = 1.0;

        let obs = experience.state.obs();
        let next_obs = experience.next_state.obs();
        let obs = per_agent(&obs, n_agents, "observation agents")?;
        let next_obs = per_agent(&next_obs, n_agents, "observation agents")?;
        let desc = per_agent(experience.state.desc(), n_agents, "description agents")?;
        let next_desc = per_agent(experience.next_state.desc(), n_agents, "description agents")?;
        let actions = per_agent(&experience.actions, n_agents, "action agents")?;

        for (a, slots) in staged.agents.iter_mut().enumerate() {
            write_row(slots.features.slice_mut(s![i, j, ..]), &obs[a], "observation")?;
            write_row(
                slots.next_features.slice_mut(s![i, j, ..]),
                &next_obs[a],
                "observation",
            )?;

            let action = actions[a];
            let n_actions = self.shape.n_actions[a];
            if action >= n_actions {
                return Err(BatchError::out_of_range("action", action, n_actions));
            }
            slots.action[[i, j, action]] = 1.0;
            slots.action_index[[i, j]] = i32::try_from(action)
                .map_err(|_| BatchError::out_of_range("action", action, i32::MAX as usize))?;

            self.padder.pad_into(slots.desc.slice_mut(s![i, j, ..]), &desc[a])?;
            self.padder
                .pad_into(slots.next_desc.slice_mut(s![i, j, ..]), &next_desc[a])?;
        }
        Ok(())
    }
}

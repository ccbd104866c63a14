//! Forward-pass inputs for one timestep of parallel rollouts.

use ndarray::Array2;
use tracing::debug;

use super::error::BatchError;
use super::pad::DescriptionPadder;
use super::slot::{Feed, FeedSlots, Placeholder, SlotKey, SlotName};
use super::{per_agent, write_row};
use crate::config::Config;
use crate::task::{Task, TaskShape, WorldState};

/// Rollout slots of one agent. Every array has `n_rollout_episodes` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRollout {
    /// Observation, `(episodes, n_features)`.
    pub features: Array2<f32>,
    /// Recurrent policy state, `(episodes, n_hidden)`.
    pub hidden: Array2<f32>,
    /// Incoming message, `(episodes, n_msg)`.
    pub message: Array2<f32>,
    /// Action-value accumulator, `(episodes, n_actions[agent])`. Always zero.
    pub action_values: Array2<f32>,
    /// Padded description tokens, `(episodes, max_desc_len)`.
    pub desc: Array2<i32>,
    /// Description-encoder state, `(episodes, n_hidden)`.
    pub desc_hidden: Array2<f32>,
}

/// One rollout request: a slot set per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutBatch {
    pub agents: Vec<AgentRollout>,
}

impl RolloutBatch {
    fn zeros(shape: &TaskShape, n_episodes: usize, n_hidden: usize, n_msg: usize) -> Self {
        let agents = shape
            .n_actions
            .iter()
            .map(|&n_actions| AgentRollout {
                features: Array2::zeros((n_episodes, shape.n_features)),
                hidden: Array2::zeros((n_episodes, n_hidden)),
                message: Array2::zeros((n_episodes, n_msg)),
                action_values: Array2::zeros((n_episodes, n_actions)),
                desc: Array2::zeros((n_episodes, shape.max_desc_len)),
                desc_hidden: Array2::zeros((n_episodes, n_hidden)),
            })
            .collect();
        Self { agents }
    }
}

impl FeedSlots for RolloutBatch {
    fn slots(&self) -> Feed<'_> {
        let mut feed = Feed::new();
        for (a, agent) in self.agents.iter().enumerate() {
            feed.insert(SlotKey::agent(SlotName::Features, a), (&agent.features).into());
            feed.insert(SlotKey::agent(SlotName::Hidden, a), (&agent.hidden).into());
            feed.insert(SlotKey::agent(SlotName::Message, a), (&agent.message).into());
            feed.insert(
                SlotKey::agent(SlotName::ActionValues, a),
                (&agent.action_values).into(),
            );
            feed.insert(SlotKey::agent(SlotName::Desc, a), (&agent.desc).into());
            feed.insert(
                SlotKey::agent(SlotName::DescHidden, a),
                (&agent.desc_hidden).into(),
            );
        }
        feed
    }
}

/// Builds the per-agent inputs that advance `n_rollout_episodes` live episodes
/// by one step.
#[derive(Debug)]
pub struct RolloutRequestBuilder {
    shape: TaskShape,
    n_episodes: usize,
    n_hidden: usize,
    n_msg: usize,
    padder: DescriptionPadder,
    placeholders: Vec<Placeholder>,
    batch: RolloutBatch,
}

impl RolloutRequestBuilder {
    /// Fixes every slot shape from the task and config.
    pub fn new<T: Task + ?Sized>(task: &T, config: &Config) -> Result<Self, BatchError> {
        config.validate()?;
        let shape = TaskShape::of(task)?;
        let n_episodes = config.trainer.n_rollout_episodes;
        let n_hidden = config.model.n_hidden;
        let n_msg = config.channel.n_msg;

        let batch = RolloutBatch::zeros(&shape, n_episodes, n_hidden, n_msg);
        let placeholders = Placeholder::declare(&batch);
        debug!(
            n_agents = shape.n_agents,
            n_episodes,
            n_slots = placeholders.len(),
            "allocated rollout slots"
        );

        Ok(Self {
            padder: DescriptionPadder::new(&shape),
            shape,
            n_episodes,
            n_hidden,
            n_msg,
            placeholders,
            batch,
        })
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// The most recently fed batch (all zeros before the first feed).
    pub fn batch(&self) -> &RolloutBatch {
        &self.batch
    }

    pub fn n_episodes(&self) -> usize {
        self.n_episodes
    }

    /// Fills the rollout slots from one live world per episode.
    ///
    /// `hidden`, `messages` and `desc_hidden` hold one already batched
    /// `(n_rollout_episodes, width)` array per agent and are copied through
    /// unchanged. Observations and padded descriptions are read from
    /// `worlds[i]` into row `i` of each agent's slots.
    pub fn feed<W: WorldState>(
        &mut self,
        hidden: &[Array2<f32>],
        messages: &[Array2<f32>],
        desc_hidden: &[Array2<f32>],
        worlds: &[W],
    ) -> Result<&RolloutBatch, BatchError> {
        let n_agents = self.shape.n_agents;
        BatchError::check_len("worlds", self.n_episodes, worlds.len())?;
        let hidden = per_agent(hidden, n_agents, "hidden agents")?;
        let messages = per_agent(messages, n_agents, "message agents")?;
        let desc_hidden = per_agent(desc_hidden, n_agents, "desc_hidden agents")?;

        let mut staged =
            RolloutBatch::zeros(&self.shape, self.n_episodes, self.n_hidden, self.n_msg);

        for (i, world) in worlds.iter().enumerate() {
            let obs = world.obs();
            let obs = per_agent(&obs, n_agents, "observation agents")?;
            let desc = per_agent(world.desc(), n_agents, "description agents")?;
            for (a, slots) in staged.agents.iter_mut().enumerate() {
                write_row(slots.features.row_mut(i), &obs[a], "observation")?;
                self.padder.pad_into(slots.desc.row_mut(i), &desc[a])?;
            }
        }

        for (a, slots) in staged.agents.iter_mut().enumerate() {
            copy_through(&mut slots.hidden, &hidden[a], "hidden")?;
            copy_through(&mut slots.message, &messages[a], "message")?;
            copy_through(&mut slots.desc_hidden, &desc_hidden[a], "desc_hidden")?;
        }

        self.batch = staged;
        debug!(n_episodes = self.n_episodes, "fed rollout batch");
        Ok(&self.batch)
    }
}

fn copy_through(
    slot: &mut Array2<f32>,
    value: &Array2<f32>,
    field: &'static str,
) -> Result<(), BatchError> {
    let (rows, cols) = slot.dim();
    BatchError::check_len(field, rows, value.nrows())?;
    BatchError::check_len(field, cols, value.ncols())?;
    slot.assign(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::slot::feed_matches;
    use crate::config::{ChannelConfig, ModelConfig, TrainerConfig};
    use crate::testutil::{StubTask, StubWorld};

    fn config() -> Config {
        Config {
            trainer: TrainerConfig {
                n_rollout_episodes: 3,
                ..TrainerConfig::default()
            },
            model: ModelConfig { n_hidden: 2 },
            channel: ChannelConfig { n_msg: 5 },
            ..Config::default()
        }
    }

    fn task() -> StubTask {
        StubTask::new(2, 3, vec![4, 2], 4)
    }

    fn states(rows: usize, cols: usize, fill: f32) -> Vec<Array2<f32>> {
        (0..2)
            .map(|a| Array2::from_elem((rows, cols), fill + a as f32))
            .collect()
    }

    fn worlds() -> Vec<StubWorld> {
        (0..3)
            .map(|i| StubWorld::seeded(10.0 * i as f32, 2, 3, i + 1))
            .collect()
    }

    #[test]
    fn slots_have_declared_shapes() {
        let builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let placeholders = builder.placeholders();
        assert_eq!(placeholders.len(), 12);
        let q1 = placeholders
            .iter()
            .find(|p| p.key == SlotKey::agent(SlotName::ActionValues, 1))
            .unwrap();
        assert_eq!(q1.shape, vec![3, 2]);
        let desc0 = placeholders
            .iter()
            .find(|p| p.key == SlotKey::agent(SlotName::Desc, 0))
            .unwrap();
        assert_eq!(desc0.shape, vec![3, 4]);
    }

    #[test]
    fn feed_copies_observations_by_row() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let worlds = worlds();
        let batch = builder
            .feed(&states(3, 2, 1.0), &states(3, 5, 2.0), &states(3, 2, 3.0), &worlds)
            .unwrap();

        for (i, world) in worlds.iter().enumerate() {
            for a in 0..2 {
                assert_eq!(batch.agents[a].features.row(i).to_vec(), world.obs()[a]);
            }
        }
        let placeholders = builder.placeholders().to_vec();
        assert!(feed_matches(&placeholders, &builder.batch().slots()));
    }

    #[test]
    fn feed_pads_descriptions() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let batch = builder
            .feed(&states(3, 2, 0.0), &states(3, 5, 0.0), &states(3, 2, 0.0), &worlds())
            .unwrap();
        // world 0 describes agent 1 with a single token `2`
        assert_eq!(batch.agents[1].desc.row(0).to_vec(), vec![2, 0, 0, 0]);
        assert_eq!(batch.agents[0].desc.row(2).to_vec(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn states_pass_through_and_q_stays_zero() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let hidden = states(3, 2, 1.0);
        let messages = states(3, 5, 2.0);
        let batch = builder
            .feed(&hidden, &messages, &states(3, 2, 3.0), &worlds())
            .unwrap();
        assert_eq!(batch.agents[1].hidden, hidden[1]);
        assert_eq!(batch.agents[0].message, messages[0]);
        assert!(batch.agents[0].action_values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn wrong_world_count_rejected() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let mut worlds = worlds();
        worlds.pop();
        let err = builder
            .feed(&states(3, 2, 0.0), &states(3, 5, 0.0), &states(3, 2, 0.0), &worlds)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::ShapeMismatch {
                field: "worlds",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn wrong_message_width_rejected() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let err = builder
            .feed(&states(3, 2, 0.0), &states(3, 4, 0.0), &states(3, 2, 0.0), &worlds())
            .unwrap_err();
        assert!(matches!(err, BatchError::ShapeMismatch { field: "message", .. }));
    }

    #[test]
    fn long_description_rejected_and_batch_kept() {
        let mut builder = RolloutRequestBuilder::new(&task(), &config()).unwrap();
        let good = worlds();
        builder
            .feed(&states(3, 2, 0.0), &states(3, 5, 0.0), &states(3, 2, 0.0), &good)
            .unwrap();
        let before = builder.batch().clone();

        let mut bad = worlds();
        bad[1].desc[0] = vec![1, 2, 3, 4, 5];
        let err = builder
            .feed(&states(3, 2, 9.0), &states(3, 5, 9.0), &states(3, 2, 9.0), &bad)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::OutOfRange {
                field: "description length",
                value: 5,
                capacity: 4
            }
        );
        assert_eq!(builder.batch(), &before);
    }
}

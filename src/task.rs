//! Interfaces to the simulation the batches are built from.
//!
//! The simulation itself lives outside this crate. Builders only need a world
//! snapshot that exposes per-agent observations and descriptions, and a task
//! that declares the shapes and can sample distractor states.

use crate::config::ConfigError;

/// A description token id, in `[0, n_vocab)`.
///
/// Zero doubles as the padding value in every description buffer.
pub type Token = u32;

/// A snapshot of the world at one timestep.
pub trait WorldState {
    /// Per-agent observation vectors, each of length `n_features`.
    fn obs(&self) -> Vec<Vec<f32>>;

    /// Per-agent descriptions, each at most `max_desc_len` tokens long.
    fn desc(&self) -> &[Vec<Token>];
}

/// The task an experiment runs on.
pub trait Task {
    type State: WorldState;

    fn n_agents(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Action-space size of each agent, indexed by agent.
    fn n_actions(&self) -> &[usize];

    fn max_desc_len(&self) -> usize;

    fn n_vocab(&self) -> usize;

    /// Samples `k` states that `agent` could not tell apart from `state`,
    /// paired with the probability of sampling each one.
    fn distractors_for(
        &self,
        state: &Self::State,
        agent: usize,
        k: usize,
    ) -> Vec<(Self::State, f64)>;
}

/// Shape fields of a [`Task`], captured once when a builder is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskShape {
    pub n_agents: usize,
    pub n_features: usize,
    pub n_actions: Vec<usize>,
    pub max_desc_len: usize,
    pub n_vocab: usize,
}

impl TaskShape {
    /// Reads the shape of `task` and validates it.
    pub fn of<T: Task + ?Sized>(task: &T) -> Result<Self, ConfigError> {
        let shape = Self {
            n_agents: task.n_agents(),
            n_features: task.n_features(),
            n_actions: task.n_actions().to_vec(),
            max_desc_len: task.max_desc_len(),
            n_vocab: task.n_vocab(),
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("task.n_agents", self.n_agents),
            ("task.n_features", self.n_features),
            ("task.max_desc_len", self.max_desc_len),
            ("task.n_vocab", self.n_vocab),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroSize(*name));
        }
        if self.n_actions.len() != self.n_agents {
            return Err(ConfigError::ActionSpaces {
                n_agents: self.n_agents,
                n_action_spaces: self.n_actions.len(),
            });
        }
        if self.n_actions.contains(&0) {
            return Err(ConfigError::ZeroSize("task.n_actions"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{StubTask, StubWorld};

    #[test]
    fn shape_of_stub_task() {
        let task = StubTask::new(2, 3, vec![4, 2], 4);
        let shape = TaskShape::of(&task).unwrap();
        assert_eq!(shape.n_agents, 2);
        assert_eq!(shape.n_features, 3);
        assert_eq!(shape.n_actions, vec![4, 2]);
        assert_eq!(shape.max_desc_len, 4);
    }

    #[test]
    fn mismatched_action_spaces_rejected() {
        let task = StubTask::new(3, 3, vec![4, 2], 4);
        assert_eq!(
            TaskShape::of(&task),
            Err(ConfigError::ActionSpaces {
                n_agents: 3,
                n_action_spaces: 2
            })
        );
    }

    #[test]
    fn empty_action_space_rejected() {
        let task = StubTask::new(2, 3, vec![4, 0], 4);
        assert_eq!(
            TaskShape::of(&task),
            Err(ConfigError::ZeroSize("task.n_actions"))
        );
    }

    #[test]
    fn zero_description_length_rejected() {
        let task = StubTask::new(2, 3, vec![4, 2], 0);
        assert_eq!(
            TaskShape::of(&task),
            Err(ConfigError::ZeroSize("task.max_desc_len"))
        );
    }

    #[test]
    fn stub_distractors_are_shifted() {
        let task = StubTask::new(2, 3, vec![4, 2], 4);
        let world = StubWorld::new(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            vec![vec![], vec![]],
        );
        let distractors = task.distractors_for(&world, 0, 3);
        assert_eq!(distractors.len(), 3);
        assert_ne!(distractors[0].0.obs()[1], world.obs()[1]);
    }
}

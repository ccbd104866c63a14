//! Run configuration consumed by the batch builders.
//!
//! Grouped the same way the training code reads it: `trainer` holds batch
//! geometry, `model` the recurrent width, `channel` the message width, and
//! `translator` the settings of the belief translator trained on
//! reconstruction batches.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors found while validating a [`Config`] or a task shape.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),

    #[error("translator.step_size must be finite and positive, got {0}")]
    InvalidStepSize(f64),

    #[error("task declares {n_agents} agents but {n_action_spaces} action spaces")]
    ActionSpaces {
        n_agents: usize,
        n_action_spaces: usize,
    },
}

/// Batch geometry shared by every builder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainerConfig {
    /// Number of episodes simulated in parallel during rollouts.
    pub n_rollout_episodes: usize,
    /// Number of episodes (or experiences) per training batch.
    pub n_batch_episodes: usize,
    /// Number of timesteps in each replay window.
    pub n_batch_history: usize,
    /// Number of distractor states per reconstruction row.
    pub n_distractors: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_rollout_episodes: 100,
            n_batch_episodes: 256,
            n_batch_history: 20,
            n_distractors: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelConfig {
    /// Width of the recurrent policy and description-encoder states.
    pub n_hidden: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { n_hidden: 64 }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelConfig {
    /// Width of one message vector.
    pub n_msg: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { n_msg: 64 }
    }
}

/// Settings for the belief translator.
///
/// Not read by the builders; validated here so a run fails before the first
/// batch rather than at the first translator step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TranslatorConfig {
    pub n_hidden: usize,
    pub step_size: f64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            n_hidden: 256,
            step_size: 1e-3,
        }
    }
}

/// Complete run configuration.
///
/// Read-only once a builder has been constructed from it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub trainer: TrainerConfig,
    pub model: ModelConfig,
    pub channel: ChannelConfig,
    pub translator: TranslatorConfig,
}

impl Config {
    /// Checks that every size used to shape a buffer is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("trainer.n_rollout_episodes", self.trainer.n_rollout_episodes),
            ("trainer.n_batch_episodes", self.trainer.n_batch_episodes),
            ("trainer.n_batch_history", self.trainer.n_batch_history),
            ("trainer.n_distractors", self.trainer.n_distractors),
            ("model.n_hidden", self.model.n_hidden),
            ("channel.n_msg", self.channel.n_msg),
            ("translator.n_hidden", self.translator.n_hidden),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroSize(*name));
        }

        let step = self.translator.step_size;
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::InvalidStepSize(step));
        }
        Ok(())
    }
}

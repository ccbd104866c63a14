//! neuralese - experience batching for agents that learn to communicate
//!
//! Multi-agent policies exchange learned messages over a narrow channel, and
//! translators are trained to decode those messages (and natural-language
//! descriptions) into beliefs about what another agent observes. This crate
//! turns simulated experience into the fixed-shape arrays those training
//! steps consume:
//!
//! - [`RolloutRequestBuilder`] for one step of parallel rollouts,
//! - [`ReconstructionBatchBuilder`] for translator training with distractors,
//! - [`ReplayBatchBuilder`] for history windows with bootstrapping targets.
//!
//! The `serde` feature makes [`Config`] deserializable; the `torch` feature
//! converts filled slots into `tch` tensors.

pub mod batch;
pub mod config;
pub mod experience;
pub mod task;

#[cfg(test)]
mod testutil;

pub use batch::{
    BatchError, Feed, FeedSlots, Placeholder, ReconstructionBatch, ReconstructionBatchBuilder,
    ReplayBatch, ReplayBatchBuilder, RolloutBatch, RolloutRequestBuilder, SlotKey, SlotName,
    SlotRef,
};
pub use config::{Config, ConfigError};
pub use experience::{CommState, Experience};
pub use task::{Task, TaskShape, Token, WorldState};

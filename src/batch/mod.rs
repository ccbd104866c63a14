//! Batch builders for the three training regimes.
//!
//! - [`RolloutRequestBuilder`]: one timestep for every in-flight rollout episode.
//! - [`ReconstructionBatchBuilder`]: translator training rows with distractors.
//! - [`ReplayBatchBuilder`]: fixed-length history windows with next-state targets.
//!
//! Each builder fixes its slot shapes at construction and refills them on
//! every `feed`. A `feed` either succeeds and replaces the whole batch, or
//! fails and leaves the previous batch as it was.

pub mod error;
pub mod pad;
pub mod reconstruction;
pub mod replay;
pub mod rollout;
pub mod slot;
#[cfg(feature = "torch")]
pub mod tensor;

pub use error::BatchError;
pub use pad::{pad_description, pad_description_into, DescriptionPadder};
pub use reconstruction::{ReconstructionBatch, ReconstructionBatchBuilder, TRUE_CANDIDATE};
pub use replay::{AgentReplay, ReplayBatch, ReplayBatchBuilder};
pub use rollout::{AgentRollout, RolloutBatch, RolloutRequestBuilder};
pub use slot::{
    feed_matches, ElementKind, Feed, FeedSlots, Placeholder, SlotKey, SlotName, SlotRef,
};
#[cfg(feature = "torch")]
pub use tensor::feed_to_tensors;

use ndarray::{ArrayView1, ArrayViewMut1};

/// Copies `values` into `row`, which must have the same length.
pub(crate) fn write_row(
    mut row: ArrayViewMut1<'_, f32>,
    values: &[f32],
    field: &'static str,
) -> Result<(), BatchError> {
    BatchError::check_len(field, row.len(), values.len())?;
    row.assign(&ArrayView1::from(values));
    Ok(())
}

/// Checks that a per-agent sequence has one entry per agent.
pub(crate) fn per_agent<'v, V>(
    values: &'v [V],
    n_agents: usize,
    field: &'static str,
) -> Result<&'v [V], BatchError> {
    BatchError::check_len(field, n_agents, values.len())?;
    Ok(values)
}

/// Checks that `agent` indexes one of `n_agents` agents.
pub(crate) fn check_agent(
    agent: usize,
    n_agents: usize,
    field: &'static str,
) -> Result<(), BatchError> {
    if agent < n_agents {
        Ok(())
    } else {
        Err(BatchError::out_of_range(field, agent, n_agents))
    }
}

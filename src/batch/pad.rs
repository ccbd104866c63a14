//! Zero-padding of variable-length descriptions into fixed-width rows.

use ndarray::{s, Array1, ArrayViewMut1};

use super::error::BatchError;
use crate::task::{TaskShape, Token};

/// Copies `tokens` into a zeroed row of `max_len` entries.
///
/// Descriptions are zero-extended, never truncated: a description longer than
/// `max_len` is [`BatchError::OutOfRange`].
pub fn pad_description(tokens: &[Token], max_len: usize) -> Result<Array1<i32>, BatchError> {
    let mut row = Array1::zeros(max_len);
    pad_description_into(row.view_mut(), tokens)?;
    Ok(row)
}

/// Writes `tokens` into `row` and zeroes the rest of it.
pub fn pad_description_into(
    mut row: ArrayViewMut1<'_, i32>,
    tokens: &[Token],
) -> Result<(), BatchError> {
    if tokens.len() > row.len() {
        return Err(BatchError::out_of_range(
            "description length",
            tokens.len(),
            row.len(),
        ));
    }
    for (slot, &token) in row.iter_mut().zip(tokens) {
        *slot = i32::try_from(token)
            .map_err(|_| BatchError::out_of_range("token", token as usize, i32::MAX as usize))?;
    }
    row.slice_mut(s![tokens.len()..]).fill(0);
    Ok(())
}

/// Pads descriptions of one task, also rejecting tokens outside its vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionPadder {
    pub max_len: usize,
    pub n_vocab: usize,
}

impl DescriptionPadder {
    pub fn new(shape: &TaskShape) -> Self {
        Self {
            max_len: shape.max_desc_len,
            n_vocab: shape.n_vocab,
        }
    }

    pub fn pad(&self, tokens: &[Token]) -> Result<Array1<i32>, BatchError> {
        let mut row = Array1::zeros(self.max_len);
        self.pad_into(row.view_mut(), tokens)?;
        Ok(row)
    }

    pub fn pad_into(
        &self,
        row: ArrayViewMut1<'_, i32>,
        tokens: &[Token],
    ) -> Result<(), BatchError> {
        if let Some(&token) = tokens.iter().find(|&&t| t as usize >= self.n_vocab) {
            return Err(BatchError::out_of_range("token", token as usize, self.n_vocab));
        }
        pad_description_into(row, tokens)
    }
}

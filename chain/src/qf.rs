//! Read-only view over the quadratic-funding strategy contract.
//!
//! The strategy contract packs recipient review statuses into 256-bit
//! words, 4 bits per recipient. Allocation math lives entirely on-chain
//! and is not modeled here; this module only decodes the bitmap.

use {
  patron_primitives::U256,
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("nibble value {0} is not a recipient status")]
  InvalidStatus(u8),

  #[error("recipient index {0} is outside a single status word")]
  IndexOutOfRange(usize),
}

/// Review status of a round recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientStatus {
  None,
  Pending,
  Accepted,
  Rejected,
  Appealed,
  InReview,
  Canceled,
}

impl TryFrom<u8> for RecipientStatus {
  type Error = Error;

  fn try_from(nibble: u8) -> Result<Self, Self::Error> {
    Ok(match nibble {
      0 => RecipientStatus::None,
      1 => RecipientStatus::Pending,
      2 => RecipientStatus::Accepted,
      3 => RecipientStatus::Rejected,
      4 => RecipientStatus::Appealed,
      5 => RecipientStatus::InReview,
      6 => RecipientStatus::Canceled,
      other => return Err(Error::InvalidStatus(other)),
    })
  }
}

/// Status of the recipient at `index` within one packed word. A word
/// holds 64 recipients, lowest nibble first.
pub fn recipient_status(
  word: U256,
  index: usize,
) -> Result<RecipientStatus, Error> {
  if index >= 64 {
    return Err(Error::IndexOutOfRange(index));
  }
  let nibble = (word >> (index * 4)).low_u64() as u8 & 0x0f;
  RecipientStatus::try_from(nibble)
}

/// Unpacks the first `count` recipient statuses from one word.
pub fn unpack_statuses(
  word: U256,
  count: usize,
) -> Result<Vec<RecipientStatus>, Error> {
  (0..count).map(|index| recipient_status(word, index)).collect()
}

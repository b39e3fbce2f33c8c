use {
  ethers::{
    types::{Address, H256, U256},
    utils::keccak256,
  },
  serde::{Deserialize, Serialize},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
  thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("pledge id must be 0x followed by 64 hex characters")]
  InvalidFormat,

  #[error("invalid hex: {0}")]
  InvalidHex(#[from] hex::FromHexError),
}

/// Identifies one donation attempt against a treasury.
///
/// Derived from the donor address, the campaign id, the pledged amount and
/// the attempt timestamp, so every attempt gets a fresh id while retries of
/// the same attempt reuse it. The id is the idempotency key shared by
/// pledge registration, the ERC-20 approval and the pledge submission.
#[derive(
  Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PledgeId(H256);

impl PledgeId {
  pub fn derive(
    donor: Address,
    campaign_id: u64,
    amount: U256,
    timestamp: u64,
  ) -> Self {
    let mut preimage = Vec::with_capacity(20 + 8 + 32 + 8);
    preimage.extend_from_slice(donor.as_bytes());
    preimage.extend_from_slice(&campaign_id.to_be_bytes());
    let mut amount_bytes = [0u8; 32];
    amount.to_big_endian(&mut amount_bytes);
    preimage.extend_from_slice(&amount_bytes);
    preimage.extend_from_slice(&timestamp.to_be_bytes());
    Self(H256::from(keccak256(preimage)))
  }
}

impl From<H256> for PledgeId {
  fn from(hash: H256) -> Self {
    Self(hash)
  }
}

impl From<PledgeId> for H256 {
  fn from(id: PledgeId) -> Self {
    id.0
  }
}

impl AsRef<[u8]> for PledgeId {
  fn as_ref(&self) -> &[u8] {
    self.0.as_bytes()
  }
}

impl Display for PledgeId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "0x{}", hex::encode(self.0.as_bytes()))
  }
}

impl Debug for PledgeId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "pledge({self})")
  }
}

impl FromStr for PledgeId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let digits = s.strip_prefix("0x").ok_or(Error::InvalidFormat)?;
    if digits.len() != 64 {
      return Err(Error::InvalidFormat);
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(digits, &mut bytes)?;
    Ok(Self(H256::from(bytes)))
  }
}

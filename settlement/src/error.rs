use {
  crate::{commit, registration, wallet},
  patron_chain::ChainError,
  patron_store::StoreError,
  thiserror::Error,
};

#[derive(Debug, Error)]
pub enum SettlementError {
  #[error("wallet has no connected account")]
  NotConnected,

  #[error("campaign has no treasury contract yet")]
  MissingTreasury,

  #[error("donation amount must be positive")]
  InvalidAmount,

  #[error(transparent)]
  Wallet(#[from] wallet::Error),

  #[error(transparent)]
  Registration(#[from] registration::Error),

  #[error(transparent)]
  Commit(#[from] commit::Error),

  #[error(transparent)]
  Chain(#[from] ChainError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl SettlementError {
  /// Whether the flow may be retried from the failed step with the same
  /// pledge id. A duplicate pledge id raised outside of our own retry
  /// path is fatal for that id and needs a fresh attempt; everything
  /// else (user rejection, transient preconditions, transport errors)
  /// is retryable.
  pub fn retryable(&self) -> bool {
    !matches!(
      self,
      SettlementError::Registration(registration::Error::Duplicate(_))
        | SettlementError::InvalidAmount
        | SettlementError::MissingTreasury
    )
  }
}

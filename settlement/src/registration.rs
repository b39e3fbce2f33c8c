use {
  dashmap::{mapref::entry::Entry, DashMap},
  ethers::signers::LocalWallet,
  patron_chain::{Call, ChainError, Provider},
  patron_primitives::{Address, PledgeId, H256, U256},
  std::time::{Duration, Instant},
  thiserror::Error,
  tracing::{debug, info, warn},
};

/// In-flight registrations held longer than this are considered stale
/// and swept on the next attempt by the same donor.
const LOCK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum Error {
  #[error("a pledge registration for this donor is already in flight")]
  Busy,

  #[error("pledge id {0} is already registered")]
  Duplicate(PledgeId),

  #[error("treasury is not ready for registrations: {0}")]
  TreasuryNotReady(String),

  #[error("registration transaction reverted on-chain")]
  Reverted,

  #[error(transparent)]
  Chain(#[from] ChainError),
}

struct LockEntry {
  pledge_id: PledgeId,
  acquired_at: Instant,
}

/// Reserves pledge ids on treasuries with the platform operator key.
///
/// This is the privileged backend write that must land before a donor is
/// allowed to sign anything against the same pledge id. One registration
/// may be in flight per donor; concurrent attempts fail fast with
/// [`Error::Busy`] instead of racing the operator nonce.
pub struct Registrar<'a, P> {
  provider: &'a P,
  operator: LocalWallet,
  locks: DashMap<Address, LockEntry>,
}

impl<'a, P: Provider> Registrar<'a, P> {
  pub fn new(provider: &'a P, operator: LocalWallet) -> Self {
    Self {
      provider,
      operator,
      locks: DashMap::new(),
    }
  }

  /// Registers a pledge id against a treasury and waits for the
  /// registration to confirm. Duplicate ids surface as
  /// [`Error::Duplicate`]; re-registering never double-counts on-chain.
  pub async fn register(
    &self,
    treasury: Address,
    pledge_id: PledgeId,
    donor: Address,
    amount: U256,
    tip: U256,
  ) -> Result<H256, Error> {
    if !self.acquire(donor, pledge_id) {
      return Err(Error::Busy);
    }
    let result = self
      .register_inner(treasury, pledge_id, donor, amount, tip)
      .await;
    self.locks.remove(&donor);
    result
  }

  fn acquire(&self, donor: Address, pledge_id: PledgeId) -> bool {
    match self.locks.entry(donor) {
      Entry::Occupied(mut occupied) => {
        if occupied.get().acquired_at.elapsed() < LOCK_TIMEOUT {
          debug!(
            "registration already in flight for {donor:?} ({})",
            occupied.get().pledge_id
          );
          return false;
        }
        warn!("sweeping stale registration lock for {donor:?}");
        occupied.insert(LockEntry {
          pledge_id,
          acquired_at: Instant::now(),
        });
        true
      }
      Entry::Vacant(vacant) => {
        vacant.insert(LockEntry {
          pledge_id,
          acquired_at: Instant::now(),
        });
        true
      }
    }
  }

  async fn register_inner(
    &self,
    treasury: Address,
    pledge_id: PledgeId,
    donor: Address,
    amount: U256,
    tip: U256,
  ) -> Result<H256, Error> {
    let hash = self
      .provider
      .submit(&self.operator, Call::RegisterPledge {
        treasury,
        pledge_id,
        donor,
        amount,
        tip,
      })
      .await
      .map_err(|e| match &e {
        ChainError::Rejected(reason)
          if reason.contains("already registered") =>
        {
          Error::Duplicate(pledge_id)
        }
        ChainError::Rejected(reason)
          if reason.contains("not configured")
            || reason.contains("unknown treasury") =>
        {
          Error::TreasuryNotReady(reason.clone())
        }
        _ => Error::Chain(e),
      })?;

    let receipt = self.provider.confirm(hash).await?;
    if !receipt.status {
      return Err(Error::Reverted);
    }
    info!("registered pledge {pledge_id} on {treasury:?} in {hash:?}");
    Ok(hash)
  }
}

use {
  ethers::signers::LocalWallet,
  patron_chain::{Call, ChainError, Provider, Receipt},
  patron_primitives::{Address, PledgeId, H256, U256},
  std::time::Duration,
  thiserror::Error,
  tracing::{debug, info, warn},
};

/// Pledge attempts rejected for insufficient allowance before giving up.
pub const MAX_ALLOWANCE_RETRIES: u32 = 3;

const ALLOWANCE_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} transaction reverted on-chain")]
  Reverted(&'static str),

  #[error(
    "treasury allowance still insufficient after {0} pledge attempts"
  )]
  AllowanceNotVisible(u32),

  #[error(transparent)]
  Chain(#[from] ChainError),
}

/// Submits the donor-signed ERC-20 approval covering amount plus tip.
pub async fn approve<P: Provider>(
  provider: &P,
  signer: &LocalWallet,
  token: Address,
  treasury: Address,
  amount: U256,
) -> Result<H256, Error> {
  let hash = provider
    .submit(signer, Call::Approve {
      token,
      spender: treasury,
      amount,
    })
    .await?;
  debug!("approval submitted: {hash:?}");
  Ok(hash)
}

/// Waits for a transaction to mine and requires a successful status.
pub async fn await_success<P: Provider>(
  provider: &P,
  hash: H256,
  what: &'static str,
) -> Result<Receipt, Error> {
  let receipt = provider.confirm(hash).await?;
  if !receipt.status {
    return Err(Error::Reverted(what));
  }
  Ok(receipt)
}

/// Submits the donor-signed pledge against a registered pledge id.
///
/// An insufficient-allowance rejection is a transient precondition (the
/// approval may not be visible to the node serving this request yet):
/// the allowance is re-read and the submission retried a bounded number
/// of times before the attempt is surfaced as an error. Callers retry
/// the whole step with the same pledge id.
pub async fn pledge<P: Provider>(
  provider: &P,
  signer: &LocalWallet,
  token: Address,
  treasury: Address,
  donor: Address,
  pledge_id: PledgeId,
  amount: U256,
  tip: U256,
) -> Result<H256, Error> {
  let required = amount + tip;
  let mut attempts = 0;
  loop {
    attempts += 1;
    let result = provider
      .submit(signer, Call::Pledge {
        treasury,
        pledge_id,
        amount,
        tip,
      })
      .await;

    match result {
      Ok(hash) => {
        info!("pledge {pledge_id} submitted in {hash:?}");
        return Ok(hash);
      }
      Err(ChainError::Rejected(reason))
        if reason.contains("insufficient allowance") =>
      {
        if attempts >= MAX_ALLOWANCE_RETRIES {
          return Err(Error::AllowanceNotVisible(attempts));
        }
        let visible = provider.allowance(token, donor, treasury).await?;
        warn!(
          "pledge rejected for allowance ({visible} of {required} \
           visible), retrying"
        );
        if visible < required {
          tokio::time::sleep(ALLOWANCE_RETRY_DELAY).await;
        }
      }
      Err(e) => return Err(e.into()),
    }
  }
}

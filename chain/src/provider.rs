use {
  crate::{Call, ChainError, Receipt},
  ethers::signers::LocalWallet,
  patron_primitives::{Address, PledgeId, H256, U256},
};

/// Submission and query seam over a chain.
///
/// Implemented by the JSON-RPC provider for real networks, by
/// [`crate::DevChain`] for dev/CI scenarios and by
/// [`crate::DummyProvider`] for dry runs. Every submission suspends the
/// caller until the node has accepted the transaction; confirmation is a
/// separate await so callers can interleave bookkeeping between the two.
#[allow(async_fn_in_trait)]
pub trait Provider {
  /// Timestamp of the latest block, in unix seconds. The chain clock is
  /// the source of truth for enforced campaign timing.
  async fn chain_time(&self) -> Result<u64, ChainError>;

  /// Signs and broadcasts one call, returning its transaction hash.
  async fn submit(
    &self,
    signer: &LocalWallet,
    call: Call,
  ) -> Result<H256, ChainError>;

  /// Suspends until the transaction is mined and returns its receipt.
  async fn confirm(&self, hash: H256) -> Result<Receipt, ChainError>;

  /// Current ERC-20 allowance granted by `owner` to `spender`.
  async fn allowance(
    &self,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> Result<U256, ChainError>;

  /// Whether a pledge id has already been claimed on the treasury. Used
  /// to reconcile failures signaled after a pledge may have mined.
  async fn pledge_claimed(
    &self,
    treasury: Address,
    pledge_id: PledgeId,
  ) -> Result<bool, ChainError>;
}

use {
  crate::{
    address_topic,
    event::{CampaignCreated, TreasuryDeployed},
    Call,
    ChainError,
    LogEntry,
    Provider,
    Receipt,
  },
  ethers::{signers::LocalWallet, utils::keccak256},
  parking_lot::Mutex,
  patron_primitives::{Address, PledgeId, H256, U256},
  std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
  },
};

/// Provider stand-in that never touches a chain.
///
/// Every submission succeeds and yields synthetic but structurally valid
/// transaction hashes and receipts, with creation events shaped exactly
/// like the real factories emit them, so the typed decode path downstream
/// is exercised. Addresses and hashes are salted with a per-instance
/// random seed and a counter, so they never collide within a run.
/// Callers must branch only on result success, never on dummy-ness.
pub struct DummyProvider {
  seed: [u8; 32],
  nonce: AtomicU64,
  genesis: u64,
  receipts: Mutex<HashMap<H256, Receipt>>,
}

impl Default for DummyProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl DummyProvider {
  pub fn new() -> Self {
    Self {
      seed: rand::random(),
      nonce: AtomicU64::new(0),
      genesis: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0),
      receipts: Mutex::new(HashMap::new()),
    }
  }

  fn digest(&self, tag: &[u8]) -> [u8; 32] {
    let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
    let mut preimage = self.seed.to_vec();
    preimage.extend_from_slice(tag);
    preimage.extend_from_slice(&nonce.to_be_bytes());
    keccak256(preimage)
  }

  fn synthetic_address(&self, tag: &[u8]) -> Address {
    Address::from_slice(&self.digest(tag)[12..])
  }

  fn synthetic_hash(&self) -> H256 {
    H256::from(self.digest(b"tx"))
  }
}

impl Provider for DummyProvider {
  async fn chain_time(&self) -> Result<u64, ChainError> {
    Ok(self.genesis)
  }

  async fn submit(
    &self,
    _signer: &LocalWallet,
    call: Call,
  ) -> Result<H256, ChainError> {
    let logs = match call {
      Call::CreateCampaign {
        factory,
        identifier_hash,
        ..
      } => vec![LogEntry {
        address: factory,
        topics: vec![
          CampaignCreated::signature(),
          identifier_hash,
          address_topic(self.synthetic_address(b"campaign")),
        ],
        data: vec![],
      }],
      Call::DeployTreasury {
        factory,
        platform_hash,
        ..
      } => vec![LogEntry {
        address: factory,
        topics: vec![TreasuryDeployed::signature(), platform_hash],
        data: address_topic(self.synthetic_address(b"treasury"))
          .as_bytes()
          .to_vec(),
      }],
      _ => vec![],
    };

    let hash = self.synthetic_hash();
    self.receipts.lock().insert(hash, Receipt {
      transaction_hash: hash,
      status: true,
      logs,
    });
    Ok(hash)
  }

  async fn confirm(&self, hash: H256) -> Result<Receipt, ChainError> {
    self
      .receipts
      .lock()
      .get(&hash)
      .cloned()
      .ok_or(ChainError::UnknownTransaction(hash))
  }

  async fn allowance(
    &self,
    _token: Address,
    _owner: Address,
    _spender: Address,
  ) -> Result<U256, ChainError> {
    Ok(U256::max_value())
  }

  async fn pledge_claimed(
    &self,
    _treasury: Address,
    _pledge_id: PledgeId,
  ) -> Result<bool, ChainError> {
    Ok(false)
  }
}

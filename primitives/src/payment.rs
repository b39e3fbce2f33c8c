use {
  ethers::types::{H256, U256},
  serde::{Deserialize, Serialize},
  std::collections::BTreeMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
  Confirming,
  Confirmed,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
  Buy,
  Sell,
}

/// A settled (or settling) donation as recorded off-chain.
///
/// `transaction_hash` is `None` for payment rails that never touch the
/// chain. Exactly one record exists per completed donation; the store
/// enforces uniqueness on the pledge id carried in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
  pub id: u64,
  pub amount: U256,
  pub token: String,
  pub status: PaymentStatus,
  pub kind: PaymentKind,
  pub transaction_hash: Option<H256>,
  pub is_anonymous: bool,
  pub metadata: BTreeMap<String, String>,
  pub campaign_id: u64,
  pub user_id: u64,
}

/// Payment row as submitted for insertion, before an id is allocated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
  pub amount: U256,
  pub token: String,
  pub status: PaymentStatus,
  pub kind: PaymentKind,
  pub transaction_hash: Option<H256>,
  pub is_anonymous: bool,
  pub metadata: BTreeMap<String, String>,
  pub campaign_id: u64,
  pub user_id: u64,
}

impl NewPayment {
  pub fn into_payment(self, id: u64) -> Payment {
    Payment {
      id,
      amount: self.amount,
      token: self.token,
      status: self.status,
      kind: self.kind,
      transaction_hash: self.transaction_hash,
      is_anonymous: self.is_anonymous,
      metadata: self.metadata,
      campaign_id: self.campaign_id,
      user_id: self.user_id,
    }
  }
}

mod disk;
mod job;
mod memory;

use {
  patron_primitives::{
    Campaign,
    CampaignUpdate,
    NewPayment,
    Payment,
    PledgeId,
  },
  thiserror::Error,
};

pub use {
  disk::DiskStore,
  job::{DeploymentJob, JobStep},
  memory::InMemoryStore,
};

/// Metadata key under which a payment row carries its pledge id. Rows
/// that carry one are unique per pledge id.
pub const PLEDGE_ID_KEY: &str = "pledge_id";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("campaign {0} not found")]
  CampaignNotFound(u64),

  #[error("payment for pledge {0} already recorded")]
  DuplicatePayment(String),

  #[error("storage error: {0}")]
  Io(String),

  #[error("corrupt record: {0}")]
  Corrupt(String),
}

/// The persistence surface consumed by settlement and deployment.
///
/// Campaign mutation goes through partial [`CampaignUpdate`]s so the
/// orchestrator can write back clamped timing and contract addresses
/// without touching the rest of the record. Payment creation is
/// at-most-once per pledge id. Deployment jobs are durable step pointers
/// that let a crashed batch resume where it stopped.
pub trait Store {
  fn campaign(&self, id: u64) -> Result<Option<Campaign>, StoreError>;

  fn campaigns(&self) -> Result<Vec<Campaign>, StoreError>;

  fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError>;

  fn update_campaign(
    &self,
    id: u64,
    update: CampaignUpdate,
  ) -> Result<Campaign, StoreError>;

  /// Inserts one payment row and returns its id. Fails with
  /// [`StoreError::DuplicatePayment`] when a row for the same pledge id
  /// already exists.
  fn create_payment(&self, payment: NewPayment) -> Result<u64, StoreError>;

  fn payment_by_pledge(
    &self,
    pledge_id: &PledgeId,
  ) -> Result<Option<Payment>, StoreError>;

  fn deployment_job(
    &self,
    campaign_id: u64,
  ) -> Result<Option<DeploymentJob>, StoreError>;

  fn put_deployment_job(&self, job: DeploymentJob) -> Result<(), StoreError>;
}

use {
  patron_primitives::Address,
  serde::{Deserialize, Serialize},
};

/// Where a campaign's contract provisioning currently stands.
///
/// The pointer only ever moves forward. `TreasuryPending` and
/// `TreasuryConfiguring` are the two resumable partial states: the first
/// after a treasury deployment failed, the second after the treasury
/// deployed but its fee configuration did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStep {
  CampaignPending,
  CampaignDeployed,
  TreasuryPending,
  TreasuryConfiguring,
  Done,
}

/// Durable per-campaign deployment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentJob {
  pub campaign_id: u64,
  pub step: JobStep,
  pub campaign_address: Option<Address>,
  pub treasury_address: Option<Address>,
  pub attempts: u32,
}

impl DeploymentJob {
  pub fn new(campaign_id: u64) -> Self {
    Self {
      campaign_id,
      step: JobStep::CampaignPending,
      campaign_address: None,
      treasury_address: None,
      attempts: 0,
    }
  }
}

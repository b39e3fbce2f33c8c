use {
  ethers::types::{Address, H256, U256},
  serde::{Deserialize, Serialize},
};

/// Lifecycle of a campaign as tracked off-chain.
///
/// Only `PendingApproval` campaigns are eligible for contract deployment;
/// transitions between the other states are driven by moderation and
/// funding logic outside of this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
  Draft,
  PendingApproval,
  Active,
  Disabled,
  Completed,
  Failed,
}

/// The timing and goal triple enforced by the campaign contract.
///
/// `launch_time` and `deadline` are unix timestamps in seconds. The chain
/// rejects triples below its minimum launch offset and duration, so these
/// values must be clamped before submission and written back afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTiming {
  pub launch_time: u64,
  pub deadline: u64,
  pub goal_amount: U256,
}

/// An off-chain campaign record.
///
/// `campaign_address`, `treasury_address` and `transaction_hash` start out
/// empty and are filled in by the deployment orchestrator once the
/// corresponding contracts are live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
  pub id: u64,
  pub title: String,
  pub creator: Address,
  pub funding_goal: U256,
  pub start_time: u64,
  pub end_time: u64,
  pub status: CampaignStatus,
  pub campaign_address: Option<Address>,
  pub treasury_address: Option<Address>,
  pub transaction_hash: Option<H256>,
}

/// Partial update applied to a stored campaign. Fields left as `None`
/// keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignUpdate {
  pub start_time: Option<u64>,
  pub end_time: Option<u64>,
  pub campaign_address: Option<Address>,
  pub treasury_address: Option<Address>,
  pub transaction_hash: Option<H256>,
}

impl CampaignUpdate {
  pub fn apply(self, campaign: &mut Campaign) {
    if let Some(start) = self.start_time {
      campaign.start_time = start;
    }
    if let Some(end) = self.end_time {
      campaign.end_time = end;
    }
    if let Some(address) = self.campaign_address {
      campaign.campaign_address = Some(address);
    }
    if let Some(address) = self.treasury_address {
      campaign.treasury_address = Some(address);
    }
    if let Some(hash) = self.transaction_hash {
      campaign.transaction_hash = Some(hash);
    }
  }
}

#[cfg(test)]
mod tests {
  use {super::*, ethers::types::Address};

  #[test]
  fn update_is_partial() {
    let mut campaign = Campaign {
      id: 1,
      title: "clean water".into(),
      creator: Address::repeat_byte(0xaa),
      funding_goal: U256::from(1000u64),
      start_time: 100,
      end_time: 200,
      status: CampaignStatus::PendingApproval,
      campaign_address: None,
      treasury_address: None,
      transaction_hash: None,
    };

    CampaignUpdate {
      start_time: Some(150),
      campaign_address: Some(Address::repeat_byte(0xbb)),
      ..Default::default()
    }
    .apply(&mut campaign);

    assert_eq!(campaign.start_time, 150);
    assert_eq!(campaign.end_time, 200);
    assert_eq!(campaign.campaign_address, Some(Address::repeat_byte(0xbb)));
    assert!(campaign.treasury_address.is_none());
  }
}

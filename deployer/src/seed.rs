use {
  ethers::utils::keccak256,
  patron_primitives::{Address, Campaign, CampaignStatus, U256},
  patron_store::{Store, StoreError},
  std::time::{SystemTime, UNIX_EPOCH},
  tracing::info,
};

const DAY: u64 = 86_400;

const TITLES: &[&str] = &[
  "clean water for kivu",
  "open source weather stations",
  "community seed library",
  "rural clinic solar power",
  "youth coding workshops",
  "urban beekeeping coop",
  "river cleanup flotilla",
  "mobile vaccination unit",
];

/// Writes demo campaigns into the store so the deployment pipeline can
/// be exercised without the rest of the platform running.
pub fn seed_campaigns<S: Store>(
  store: &S,
  count: u64,
  token_decimals: u32,
) -> Result<Vec<u64>, StoreError> {
  let now = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_secs())
    .unwrap_or(0);
  let unit = U256::exp10(token_decimals as usize);

  let mut ids = Vec::with_capacity(count as usize);
  for index in 0..count {
    let id = index + 1;
    let title = TITLES[(index as usize) % TITLES.len()];
    let creator =
      Address::from_slice(&keccak256(format!("demo-creator-{id}"))[12..]);
    store.insert_campaign(Campaign {
      id,
      title: title.into(),
      creator,
      funding_goal: U256::from(500 + index * 250) * unit,
      start_time: now + DAY,
      end_time: now + (8 + index) * DAY,
      status: CampaignStatus::PendingApproval,
      campaign_address: None,
      treasury_address: None,
      transaction_hash: None,
    })?;
    ids.push(id);
  }
  info!("seeded {count} demo campaigns");
  Ok(ids)
}

#[cfg(test)]
mod tests {
  use {super::*, patron_store::InMemoryStore};

  #[test]
  fn seeds_pending_campaigns_with_distinct_creators() -> anyhow::Result<()> {
    let store = InMemoryStore::new();
    let ids = seed_campaigns(&store, 4, 6)?;
    assert_eq!(ids.len(), 4);

    let campaigns = store.campaigns()?;
    assert_eq!(campaigns.len(), 4);
    for campaign in &campaigns {
      assert_eq!(campaign.status, CampaignStatus::PendingApproval);
      assert!(campaign.campaign_address.is_none());
      assert!(campaign.end_time > campaign.start_time);
    }
    let creators: std::collections::HashSet<_> =
      campaigns.iter().map(|c| c.creator).collect();
    assert_eq!(creators.len(), 4);
    Ok(())
  }
}

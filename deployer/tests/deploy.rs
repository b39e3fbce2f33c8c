use {
  ethers::signers::{LocalWallet, Signer},
  patron_chain::{
    DevChain,
    DevChainConfig,
    DummyProvider,
    ErrorKind,
    TreasuryFees,
  },
  patron_deployer::{Deployer, DeployerConfig},
  patron_primitives::{
    Address,
    Campaign,
    CampaignStatus,
    H256,
    U256,
  },
  patron_store::{InMemoryStore, JobStep, Store},
  std::{collections::HashSet, time::Duration},
};

const DAY: u64 = 86_400;
const GENESIS: u64 = 1_700_000_000;

fn operator() -> LocalWallet {
  LocalWallet::from_bytes(&[1u8; 32]).expect("valid test key")
}

fn devchain(operator: &LocalWallet) -> DevChain {
  DevChain::new(
    DevChainConfig {
      min_launch_offset: 300,
      min_duration: DAY,
      platform_operator: operator.address(),
      token: Address::repeat_byte(0x05),
    },
    GENESIS,
  )
}

fn config() -> DeployerConfig {
  DeployerConfig {
    factory: Address::repeat_byte(0xfa),
    treasury_factory: Address::repeat_byte(0xfb),
    platform_hash: H256::repeat_byte(0xaa),
    fees: TreasuryFees {
      flat_fee: U256::zero(),
      cumulative_flat_fee: U256::zero(),
      platform_fee_bps: 400,
      commission_bps: 100,
    },
    min_launch_offset: 300,
    min_duration: DAY,
    settle_delay: Duration::from_millis(1),
    deploy_interval: Duration::from_millis(1),
  }
}

fn campaign(id: u64) -> Campaign {
  Campaign {
    id,
    title: format!("campaign {id}"),
    creator: Address::repeat_byte(0xcc),
    funding_goal: U256::from(1_000u64),
    start_time: GENESIS,
    end_time: GENESIS + 5 * DAY,
    status: CampaignStatus::PendingApproval,
    campaign_address: None,
    treasury_address: None,
    transaction_hash: None,
  }
}

fn seeded_store(count: u64) -> InMemoryStore {
  let store = InMemoryStore::new();
  for id in 1..=count {
    store.insert_campaign(campaign(id)).expect("insert");
  }
  store
}

#[tokio::test]
async fn persists_clamped_timing_and_address() -> anyhow::Result<()> {
  let operator = operator();
  let chain = devchain(&operator);
  let store = seeded_store(1);
  let deployer = Deployer::new(&chain, &store, operator, config());

  let stats = deployer
    .run_batch(&store.campaigns()?, false)
    .await;
  assert_eq!(stats.campaigns_succeeded, 1);

  let stored = store.campaign(1)?.expect("present");
  // requested launch was "now", so the chain minimum raised it; the
  // deadline was generous and passes through untouched
  assert_eq!(stored.start_time, GENESIS + 300);
  assert_eq!(stored.end_time, GENESIS + 5 * DAY);
  assert!(stored.campaign_address.is_some());
  assert!(stored.transaction_hash.is_some());
  assert!(stored.treasury_address.is_none());
  Ok(())
}

#[tokio::test]
async fn batch_continues_past_failures_and_aggregates(
) -> anyhow::Result<()> {
  let operator = operator();
  let chain = devchain(&operator);
  let store = seeded_store(10);
  let deployer = Deployer::new(&chain, &store, operator, config());

  // campaign-only runs submit once per campaign; fail three of them
  for index in [2u64, 5, 8] {
    chain.fail_submit_after(index, "insufficient funds to pay for gas");
  }

  let stats = deployer.run_batch(&store.campaigns()?, false).await;

  assert_eq!(stats.attempted, 10);
  assert_eq!(stats.campaigns_succeeded, 7);
  assert_eq!(stats.campaigns_failed, 3);
  assert_eq!(
    stats.errors_by_kind[&ErrorKind::InsufficientFunds].count,
    3
  );
  assert_eq!(stats.campaign_success_rate(), 70.0);

  // campaign_address is set exactly for the successful deployments
  let with_address = store
    .campaigns()?
    .iter()
    .filter(|c| c.campaign_address.is_some())
    .count();
  assert_eq!(with_address, 7);
  Ok(())
}

#[tokio::test]
async fn treasury_failure_leaves_resumable_partial_state(
) -> anyhow::Result<()> {
  let operator = operator();
  let operator_address = operator.address();
  let chain = devchain(&operator);
  let store = seeded_store(1);
  let deployer = Deployer::new(&chain, &store, operator, config());

  // submits: campaign creation, then treasury deployment
  chain.fail_submit_after(1, "insufficient funds to pay for gas");

  let stats = deployer.run_batch(&store.campaigns()?, true).await;
  assert_eq!(stats.campaigns_succeeded, 1);
  assert_eq!(stats.treasuries_failed, 1);

  let stored = store.campaign(1)?.expect("present");
  assert!(stored.campaign_address.is_some());
  assert!(stored.treasury_address.is_none());
  let job = store.deployment_job(1)?.expect("journaled");
  assert_eq!(job.step, JobStep::TreasuryPending);

  // the re-run resumes at the treasury: no second campaign creation
  let submissions_before = chain.submissions_by(operator_address);
  let stats = deployer
    .run_batch(&pending(&store, true)?, true)
    .await;
  assert_eq!(stats.campaigns_succeeded, 0);
  assert_eq!(stats.campaigns_failed, 0);
  assert_eq!(stats.treasuries_succeeded, 1);
  // treasury deployment plus configuration
  assert_eq!(
    chain.submissions_by(operator_address),
    submissions_before + 2
  );

  let stored = store.campaign(1)?.expect("present");
  assert!(stored.treasury_address.is_some());
  assert_eq!(
    store.deployment_job(1)?.expect("journaled").step,
    JobStep::Done
  );
  Ok(())
}

#[tokio::test]
async fn config_failure_reports_deployed_but_unconfigured(
) -> anyhow::Result<()> {
  let operator = operator();
  let chain = devchain(&operator);
  let store = seeded_store(1);
  let deployer = Deployer::new(&chain, &store, operator, config());

  // submits: creation, treasury deployment, then configuration
  chain.fail_submit_after(2, "execution reverted: config lock active");

  let stats = deployer.run_batch(&store.campaigns()?, true).await;
  assert_eq!(stats.treasuries_unconfigured, 1);
  assert_eq!(stats.treasuries_succeeded, 0);
  assert_eq!(stats.treasuries_failed, 0);

  // the treasury address is persisted: deployed-but-unconfigured is a
  // valid partial state, distinct from deployment failure
  let stored = store.campaign(1)?.expect("present");
  assert!(stored.treasury_address.is_some());
  assert_eq!(
    store.deployment_job(1)?.expect("journaled").step,
    JobStep::TreasuryConfiguring
  );

  // resuming configures the already-deployed treasury
  let stats = deployer.run_batch(&pending(&store, true)?, true).await;
  assert_eq!(stats.treasuries_succeeded, 1);
  assert_eq!(
    store.deployment_job(1)?.expect("journaled").step,
    JobStep::Done
  );
  Ok(())
}

#[tokio::test]
async fn dummy_mode_yields_distinct_synthetic_results() -> anyhow::Result<()>
{
  let provider = DummyProvider::new();
  let store = seeded_store(5);
  let deployer = Deployer::new(&provider, &store, operator(), config());

  let stats = deployer.run_batch(&store.campaigns()?, true).await;
  assert_eq!(stats.campaigns_succeeded, 5);
  assert_eq!(stats.treasuries_succeeded, 5);
  assert!(stats.errors_by_kind.is_empty());

  let campaigns = store.campaigns()?;
  let addresses: HashSet<_> = campaigns
    .iter()
    .filter_map(|c| c.campaign_address)
    .chain(campaigns.iter().filter_map(|c| c.treasury_address))
    .collect();
  // all synthetic addresses are mutually distinct
  assert_eq!(addresses.len(), 10);
  let hashes: HashSet<_> = campaigns
    .iter()
    .filter_map(|c| c.transaction_hash)
    .collect();
  assert_eq!(hashes.len(), 5);
  Ok(())
}

fn pending(
  store: &InMemoryStore,
  with_treasuries: bool,
) -> anyhow::Result<Vec<Campaign>> {
  Ok(
    store
      .campaigns()?
      .into_iter()
      .filter(|campaign| {
        campaign.campaign_address.is_none()
          || (with_treasuries && campaign.treasury_address.is_none())
      })
      .collect(),
  )
}

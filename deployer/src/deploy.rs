use {
  crate::stats::DeploymentStats,
  ethers::{signers::LocalWallet, utils::keccak256},
  patron_chain::{
    classify,
    Call,
    CampaignCreated,
    ChainError,
    ErrorKind,
    EventError,
    Provider,
    TreasuryDeployed,
    TreasuryFees,
  },
  patron_primitives::{
    Address,
    Campaign,
    CampaignTiming,
    CampaignUpdate,
    H256,
    U256,
  },
  patron_store::{DeploymentJob, JobStep, Store, StoreError},
  std::{fmt::Display, time::Duration},
  thiserror::Error,
  tracing::{error, info, warn},
};

/// Platform parameters for contract provisioning.
#[derive(Debug, Clone)]
pub struct DeployerConfig {
  pub factory: Address,
  pub treasury_factory: Address,
  pub platform_hash: H256,
  pub fees: TreasuryFees,

  /// Chain-enforced minimum distance between now and a launch.
  pub min_launch_offset: u64,

  /// Chain-enforced minimum campaign duration.
  pub min_duration: u64,

  /// Pause between the campaign confirming and the treasury submission,
  /// so the shared operator account does not race its own nonce.
  pub settle_delay: Duration,

  /// Pause between campaigns in a batch run.
  pub deploy_interval: Duration,
}

/// Raises requested timing to the chain-enforced minimums.
///
/// Pure and idempotent: reapplying the clamp to already-clamped values
/// returns them unchanged. The clamped values, not the requested ones,
/// are what gets persisted after deployment.
pub fn clamp_timing(
  requested_launch: u64,
  requested_deadline: u64,
  chain_now: u64,
  min_launch_offset: u64,
  min_duration: u64,
) -> (u64, u64) {
  let launch = requested_launch.max(chain_now + min_launch_offset);
  let deadline = requested_deadline.max(launch + min_duration);
  (launch, deadline)
}

/// Outcome of one contract deployment. Only the success, address and
/// hash fields ever get persisted; the error fields feed the batch
/// statistics.
#[derive(Debug, Clone)]
pub struct DeploymentResult {
  pub address: Option<Address>,
  pub transaction_hash: Option<H256>,
  pub success: bool,
  pub error: Option<String>,
  pub error_kind: Option<ErrorKind>,
}

impl DeploymentResult {
  fn succeeded(address: Address, transaction_hash: Option<H256>) -> Self {
    Self {
      address: Some(address),
      transaction_hash,
      success: true,
      error: None,
      error_kind: None,
    }
  }

  fn failed(error: impl Display) -> Self {
    let message = error.to_string();
    Self {
      address: None,
      transaction_hash: None,
      success: false,
      error_kind: Some(classify(&message)),
      error: Some(message),
    }
  }
}

/// Treasury provisioning outcome. A deployed treasury whose fee
/// configuration failed is a valid partial state, distinct from both
/// full success and deployment failure.
#[derive(Debug, Clone)]
pub struct TreasuryOutcome {
  pub result: DeploymentResult,
  pub configured: bool,
  pub config_error: Option<String>,
}

/// Per-campaign provisioning summary. `campaign` is `None` when the
/// campaign contract was already live and the run resumed at the
/// treasury phase.
#[derive(Debug, Clone)]
pub struct CampaignProvisioning {
  pub campaign_id: u64,
  pub campaign: Option<DeploymentResult>,
  pub treasury: Option<TreasuryOutcome>,
}

#[derive(Debug, Error)]
enum DeployError {
  #[error("{0} transaction reverted on-chain")]
  Reverted(&'static str),

  #[error(transparent)]
  Chain(#[from] ChainError),

  #[error(transparent)]
  Event(#[from] EventError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Provisions campaign and treasury contracts, one campaign at a time.
///
/// Every step returns a structured result instead of throwing, so a
/// batch continues past one campaign's failure. Progress is journaled
/// into durable job records; a re-run resumes each campaign at the step
/// it stopped at.
pub struct Deployer<'a, P, S> {
  provider: &'a P,
  store: &'a S,
  operator: LocalWallet,
  config: DeployerConfig,
}

impl<'a, P, S> Deployer<'a, P, S>
where
  P: Provider,
  S: Store,
{
  pub fn new(
    provider: &'a P,
    store: &'a S,
    operator: LocalWallet,
    config: DeployerConfig,
  ) -> Self {
    Self {
      provider,
      store,
      operator,
      config,
    }
  }

  /// Runs the whole batch sequentially and returns the accumulated
  /// statistics. The aggregator is the only state shared across
  /// iterations.
  pub async fn run_batch(
    &self,
    campaigns: &[Campaign],
    with_treasuries: bool,
  ) -> DeploymentStats {
    let mut stats = DeploymentStats::default();
    for (index, campaign) in campaigns.iter().enumerate() {
      if index > 0 {
        tokio::time::sleep(self.config.deploy_interval).await;
      }
      info!(
        "provisioning campaign {} ({}/{})",
        campaign.id,
        index + 1,
        campaigns.len()
      );
      let outcome = self.provision(campaign, with_treasuries).await;
      metrics::increment_counter!("deployer_campaigns_processed");
      stats.record(&outcome);
    }
    stats
  }

  /// Provisions one campaign, resuming from its job record.
  pub async fn provision(
    &self,
    campaign: &Campaign,
    with_treasury: bool,
  ) -> CampaignProvisioning {
    match self.provision_inner(campaign, with_treasury).await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!("provisioning campaign {} failed: {e}", campaign.id);
        CampaignProvisioning {
          campaign_id: campaign.id,
          campaign: Some(DeploymentResult::failed(e)),
          treasury: None,
        }
      }
    }
  }

  async fn provision_inner(
    &self,
    campaign: &Campaign,
    with_treasury: bool,
  ) -> Result<CampaignProvisioning, StoreError> {
    let mut job = self
      .store
      .deployment_job(campaign.id)?
      .unwrap_or_else(|| DeploymentJob::new(campaign.id));
    job.attempts += 1;

    let mut outcome = CampaignProvisioning {
      campaign_id: campaign.id,
      campaign: None,
      treasury: None,
    };

    if job.step == JobStep::Done
      || (job.step == JobStep::CampaignDeployed && !with_treasury)
    {
      info!("campaign {} is already provisioned", campaign.id);
      return Ok(outcome);
    }

    if job.campaign_address.is_none() {
      let result = self.deploy_campaign(campaign, job.attempts).await;
      if result.success {
        job.campaign_address = result.address;
        job.step = JobStep::CampaignDeployed;
      }
      let failed = !result.success;
      outcome.campaign = Some(result);
      self.store.put_deployment_job(job.clone())?;
      if failed {
        // a failed campaign skips treasury deployment entirely
        return Ok(outcome);
      }
    }

    if with_treasury {
      outcome.treasury = Some(self.treasury_phase(&mut job).await?);
    }

    Ok(outcome)
  }

  /// Deploys the campaign contract and persists the chain-enforced
  /// timing together with the deployed address.
  pub async fn deploy_campaign(
    &self,
    campaign: &Campaign,
    attempt: u32,
  ) -> DeploymentResult {
    match self.deploy_campaign_inner(campaign, attempt).await {
      Ok(result) => result,
      Err(e) => {
        warn!("campaign {} deployment failed: {e}", campaign.id);
        DeploymentResult::failed(e)
      }
    }
  }

  async fn deploy_campaign_inner(
    &self,
    campaign: &Campaign,
    attempt: u32,
  ) -> Result<DeploymentResult, DeployError> {
    let now = self.provider.chain_time().await?;
    let (launch_time, deadline) = clamp_timing(
      campaign.start_time,
      campaign.end_time,
      now,
      self.config.min_launch_offset,
      self.config.min_duration,
    );
    if launch_time != campaign.start_time {
      info!(
        "campaign {}: launch raised to {launch_time} by chain minimums",
        campaign.id
      );
    }

    let timing = CampaignTiming {
      launch_time,
      deadline,
      goal_amount: campaign.funding_goal,
    };
    let (data_keys, data_values) = self.platform_data();

    let hash = self
      .provider
      .submit(&self.operator, Call::CreateCampaign {
        factory: self.config.factory,
        creator: campaign.creator,
        identifier_hash: self.identifier_hash(campaign, attempt, now),
        platform_hashes: vec![self.config.platform_hash],
        data_keys,
        data_values,
        timing,
      })
      .await?;

    let receipt = self.provider.confirm(hash).await?;
    if !receipt.status {
      return Err(DeployError::Reverted("campaign creation"));
    }
    let created = CampaignCreated::decode(&receipt, self.config.factory)?;

    // the chain clock is the source of truth for enforced timing; write
    // the clamped values back, never the requested ones
    self.store.update_campaign(campaign.id, CampaignUpdate {
      start_time: Some(launch_time),
      end_time: Some(deadline),
      campaign_address: Some(created.campaign),
      transaction_hash: Some(hash),
      ..Default::default()
    })?;

    info!(
      "campaign {} deployed at {:?} in {hash:?}",
      campaign.id, created.campaign
    );
    Ok(DeploymentResult::succeeded(created.campaign, Some(hash)))
  }

  async fn treasury_phase(
    &self,
    job: &mut DeploymentJob,
  ) -> Result<TreasuryOutcome, StoreError> {
    let campaign_address = job
      .campaign_address
      .expect("treasury phase runs only after the campaign deployed");

    let stored = self
      .store
      .campaign(job.campaign_id)?
      .ok_or(StoreError::CampaignNotFound(job.campaign_id))?;
    let timing = CampaignTiming {
      launch_time: stored.start_time,
      deadline: stored.end_time,
      goal_amount: stored.funding_goal,
    };

    let result = if let Some(treasury) = job.treasury_address {
      // deployed on an earlier run, only the configuration is pending
      DeploymentResult::succeeded(treasury, None)
    } else {
      job.step = JobStep::TreasuryPending;
      self.store.put_deployment_job(job.clone())?;

      // let the previous confirmation settle before reusing the shared
      // operator key
      tokio::time::sleep(self.config.settle_delay).await;

      match self.deploy_treasury(campaign_address).await {
        Ok(result) => {
          let treasury =
            result.address.expect("successful deployments carry one");
          job.treasury_address = Some(treasury);
          job.step = JobStep::TreasuryConfiguring;
          self.store.put_deployment_job(job.clone())?;
          self.store.update_campaign(job.campaign_id, CampaignUpdate {
            treasury_address: Some(treasury),
            ..Default::default()
          })?;
          result
        }
        Err(e) => {
          warn!(
            "treasury deployment for campaign {} failed: {e}",
            job.campaign_id
          );
          return Ok(TreasuryOutcome {
            result: DeploymentResult::failed(e),
            configured: false,
            config_error: None,
          });
        }
      }
    };

    let treasury = result.address.expect("deployed above or resumed");
    match self.configure_treasury(treasury, timing).await {
      Ok(()) => {
        job.step = JobStep::Done;
        self.store.put_deployment_job(job.clone())?;
        info!("treasury {treasury:?} configured");
        Ok(TreasuryOutcome {
          result,
          configured: true,
          config_error: None,
        })
      }
      Err(e) => {
        warn!("treasury {treasury:?} deployed but not configured: {e}");
        self.store.put_deployment_job(job.clone())?;
        Ok(TreasuryOutcome {
          result,
          configured: false,
          config_error: Some(e.to_string()),
        })
      }
    }
  }

  async fn deploy_treasury(
    &self,
    campaign_address: Address,
  ) -> Result<DeploymentResult, DeployError> {
    let hash = self
      .provider
      .submit(&self.operator, Call::DeployTreasury {
        factory: self.config.treasury_factory,
        platform_hash: self.config.platform_hash,
        campaign: campaign_address,
      })
      .await?;
    let receipt = self.provider.confirm(hash).await?;
    if !receipt.status {
      return Err(DeployError::Reverted("treasury deployment"));
    }
    let deployed =
      TreasuryDeployed::decode(&receipt, self.config.treasury_factory)?;
    Ok(DeploymentResult::succeeded(deployed.treasury, Some(hash)))
  }

  async fn configure_treasury(
    &self,
    treasury: Address,
    timing: CampaignTiming,
  ) -> Result<(), DeployError> {
    let submitted = self
      .provider
      .submit(&self.operator, Call::ConfigureTreasury {
        treasury,
        timing,
        fees: self.config.fees,
      })
      .await;

    let hash = match submitted {
      Ok(hash) => hash,
      // a configuration that landed on a previous run is not an error
      Err(ChainError::Rejected(reason))
        if reason.contains("already configured") =>
      {
        info!("treasury {treasury:?} was already configured");
        return Ok(());
      }
      Err(e) => return Err(e.into()),
    };

    let receipt = self.provider.confirm(hash).await?;
    if !receipt.status {
      return Err(DeployError::Reverted("treasury configuration"));
    }
    Ok(())
  }

  /// Unique per attempt, so a retried deployment never collides with an
  /// earlier half-finished one on the factory.
  fn identifier_hash(
    &self,
    campaign: &Campaign,
    attempt: u32,
    now: u64,
  ) -> H256 {
    let mut preimage = self.config.platform_hash.as_bytes().to_vec();
    preimage.extend_from_slice(campaign.creator.as_bytes());
    preimage.extend_from_slice(&campaign.id.to_be_bytes());
    preimage.extend_from_slice(&attempt.to_be_bytes());
    preimage.extend_from_slice(&now.to_be_bytes());
    H256::from(keccak256(preimage))
  }

  fn platform_data(&self) -> (Vec<H256>, Vec<H256>) {
    let keys = ["flatFee", "cumulativeFlatFee", "platformFee", "commission"]
      .map(|name| H256::from(keccak256(name.as_bytes())))
      .to_vec();
    let fees = &self.config.fees;
    let values = [
      fees.flat_fee,
      fees.cumulative_flat_fee,
      fees.platform_fee_bps.into(),
      fees.commission_bps.into(),
    ]
    .map(u256_word)
    .to_vec();
    (keys, values)
  }
}

fn u256_word(value: U256) -> H256 {
  let mut bytes = [0u8; 32];
  value.to_big_endian(&mut bytes);
  H256::from(bytes)
}

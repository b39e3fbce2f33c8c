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
  ethers::{
    signers::{LocalWallet, Signer},
    utils::keccak256,
  },
  parking_lot::Mutex,
  patron_primitives::{Address, CampaignTiming, PledgeId, H256, U256},
  std::collections::HashMap,
  tracing::debug,
};

/// Chain-enforced platform parameters.
#[derive(Debug, Clone)]
pub struct DevChainConfig {
  /// Minimum distance between chain time and a campaign launch.
  pub min_launch_offset: u64,

  /// Minimum distance between launch and deadline.
  pub min_duration: u64,

  /// The only account allowed to register pledge ids.
  pub platform_operator: Address,

  /// The ERC-20 token treasuries draw pledges from.
  pub token: Address,
}

#[derive(Debug, Clone)]
struct CampaignRecord {
  #[allow(dead_code)]
  creator: Address,
  #[allow(dead_code)]
  timing: CampaignTiming,
}

#[derive(Debug, Clone)]
struct TreasuryRecord {
  #[allow(dead_code)]
  campaign: Address,
  configured: bool,
}

#[derive(Debug, Clone)]
struct PledgeRecord {
  donor: Address,
  amount: U256,
  tip: U256,
  claimed: bool,
}

#[derive(Default)]
struct Inner {
  now: u64,
  counter: u64,
  campaigns: HashMap<Address, CampaignRecord>,
  treasuries: HashMap<Address, TreasuryRecord>,
  allowances: HashMap<(Address, Address, Address), U256>,
  pledges: HashMap<(Address, PledgeId), PledgeRecord>,
  receipts: HashMap<H256, Receipt>,
  submissions: HashMap<Address, u64>,
  submit_calls: u64,
  confirm_calls: u64,
  submit_faults: HashMap<u64, String>,
  confirm_faults: HashMap<u64, String>,
}

/// Deterministic in-process chain for dev, CI and test scenarios.
///
/// Enforces the same preconditions the deployed platform contracts do:
/// minimum launch offset and duration on campaign creation, operator-only
/// pledge registration against configured treasuries, duplicate pledge-id
/// rejection, and allowance-gated pledges. The clock only moves through
/// [`DevChain::advance`], and faults can be injected ahead of the next
/// submission or confirmation to exercise failure paths.
pub struct DevChain {
  config: DevChainConfig,
  inner: Mutex<Inner>,
}

impl DevChain {
  pub fn new(config: DevChainConfig, genesis_time: u64) -> Self {
    Self {
      config,
      inner: Mutex::new(Inner {
        now: genesis_time,
        ..Default::default()
      }),
    }
  }

  /// Moves the chain clock forward.
  pub fn advance(&self, seconds: u64) {
    self.inner.lock().now += seconds;
  }

  /// Makes the next `submit` fail with the given message.
  pub fn fail_next_submit(&self, message: impl Into<String>) {
    self.fail_submit_after(0, message);
  }

  /// Makes the `submit` after `skip` further successful ones fail.
  pub fn fail_submit_after(&self, skip: u64, message: impl Into<String>) {
    let mut inner = self.inner.lock();
    let at = inner.submit_calls + skip;
    inner.submit_faults.insert(at, message.into());
  }

  /// Makes the next `confirm` fail. The transaction itself still
  /// executed at submission time, which is exactly the "failure signaled
  /// after the transaction may already be mined" scenario.
  pub fn fail_next_confirm(&self, message: impl Into<String>) {
    self.fail_confirm_after(0, message);
  }

  /// Makes the `confirm` after `skip` further successful ones fail.
  pub fn fail_confirm_after(&self, skip: u64, message: impl Into<String>) {
    let mut inner = self.inner.lock();
    let at = inner.confirm_calls + skip;
    inner.confirm_faults.insert(at, message.into());
  }

  /// Number of transactions a given account has signed and submitted,
  /// including ones that were rejected.
  pub fn submissions_by(&self, sender: Address) -> u64 {
    self.inner.lock().submissions.get(&sender).copied().unwrap_or(0)
  }

  fn fresh_address(inner: &mut Inner, tag: &[u8]) -> Address {
    inner.counter += 1;
    let mut preimage = tag.to_vec();
    preimage.extend_from_slice(&inner.counter.to_be_bytes());
    Address::from_slice(&keccak256(&preimage)[12..])
  }

  fn fresh_hash(inner: &mut Inner) -> H256 {
    inner.counter += 1;
    let mut preimage = b"devchain-tx".to_vec();
    preimage.extend_from_slice(&inner.counter.to_be_bytes());
    H256::from(keccak256(&preimage))
  }

  fn execute(
    &self,
    inner: &mut Inner,
    sender: Address,
    call: Call,
  ) -> Result<Vec<LogEntry>, String> {
    match call {
      Call::CreateCampaign {
        factory,
        creator,
        identifier_hash,
        timing,
        ..
      } => {
        if timing.launch_time < inner.now + self.config.min_launch_offset {
          return Err(
            "execution reverted: launch time below minimum offset".into(),
          );
        }
        if timing.deadline < timing.launch_time + self.config.min_duration {
          return Err(
            "execution reverted: campaign duration below minimum".into(),
          );
        }
        let campaign = Self::fresh_address(inner, b"devchain-campaign");
        inner
          .campaigns
          .insert(campaign, CampaignRecord { creator, timing });
        debug!("created campaign {campaign:?}");
        Ok(vec![LogEntry {
          address: factory,
          topics: vec![
            CampaignCreated::signature(),
            identifier_hash,
            address_topic(campaign),
          ],
          data: vec![],
        }])
      }

      Call::DeployTreasury {
        factory,
        platform_hash,
        campaign,
      } => {
        if !inner.campaigns.contains_key(&campaign) {
          return Err("execution reverted: unknown campaign contract".into());
        }
        let treasury = Self::fresh_address(inner, b"devchain-treasury");
        inner.treasuries.insert(treasury, TreasuryRecord {
          campaign,
          configured: false,
        });
        debug!("deployed treasury {treasury:?} for campaign {campaign:?}");
        Ok(vec![LogEntry {
          address: factory,
          topics: vec![TreasuryDeployed::signature(), platform_hash],
          data: address_topic(treasury).as_bytes().to_vec(),
        }])
      }

      Call::ConfigureTreasury { treasury, .. } => {
        let record = inner
          .treasuries
          .get_mut(&treasury)
          .ok_or("execution reverted: unknown treasury")?;
        if record.configured {
          return Err("execution reverted: treasury already configured".into());
        }
        record.configured = true;
        Ok(vec![])
      }

      Call::Approve {
        token,
        spender,
        amount,
      } => {
        inner.allowances.insert((token, sender, spender), amount);
        Ok(vec![])
      }

      Call::RegisterPledge {
        treasury,
        pledge_id,
        donor,
        amount,
        tip,
      } => {
        if sender != self.config.platform_operator {
          return Err(
            "execution reverted: caller is not the platform operator".into(),
          );
        }
        match inner.treasuries.get(&treasury) {
          None => return Err("execution reverted: unknown treasury".into()),
          Some(record) if !record.configured => {
            return Err("execution reverted: treasury not configured".into());
          }
          Some(_) => {}
        }
        if inner.pledges.contains_key(&(treasury, pledge_id)) {
          return Err(
            "execution reverted: pledge id already registered".into(),
          );
        }
        inner.pledges.insert((treasury, pledge_id), PledgeRecord {
          donor,
          amount,
          tip,
          claimed: false,
        });
        Ok(vec![])
      }

      Call::Pledge {
        treasury,
        pledge_id,
        amount,
        tip,
      } => {
        let record = inner
          .pledges
          .get(&(treasury, pledge_id))
          .cloned()
          .ok_or("execution reverted: pledge id not registered")?;
        if record.donor != sender {
          return Err("execution reverted: pledge donor mismatch".into());
        }
        if record.claimed {
          return Err("execution reverted: pledge already claimed".into());
        }
        if record.amount != amount || record.tip != tip {
          return Err(
            "execution reverted: pledge does not match registration".into(),
          );
        }
        let key = (self.config.token, sender, treasury);
        let allowance =
          inner.allowances.get(&key).copied().unwrap_or_default();
        let required = amount + tip;
        if allowance < required {
          return Err("execution reverted: insufficient allowance".into());
        }
        inner.allowances.insert(key, allowance - required);
        let entry = inner
          .pledges
          .get_mut(&(treasury, pledge_id))
          .expect("present, looked up above");
        entry.claimed = true;
        Ok(vec![LogEntry {
          address: treasury,
          topics: vec![
            H256::from(keccak256(
              b"Receipt(address,bytes32,uint256,uint256)",
            )),
            address_topic(sender),
            pledge_id.into(),
          ],
          data: vec![],
        }])
      }
    }
  }
}

impl Provider for DevChain {
  async fn chain_time(&self) -> Result<u64, ChainError> {
    Ok(self.inner.lock().now)
  }

  async fn submit(
    &self,
    signer: &LocalWallet,
    call: Call,
  ) -> Result<H256, ChainError> {
    let sender = signer.address();
    let mut inner = self.inner.lock();
    *inner.submissions.entry(sender).or_default() += 1;

    let index = inner.submit_calls;
    inner.submit_calls += 1;
    if let Some(message) = inner.submit_faults.remove(&index) {
      return Err(ChainError::Rpc(message));
    }

    let logs = self
      .execute(&mut inner, sender, call)
      .map_err(ChainError::Rejected)?;
    let hash = Self::fresh_hash(&mut inner);
    inner.receipts.insert(hash, Receipt {
      transaction_hash: hash,
      status: true,
      logs,
    });
    Ok(hash)
  }

  async fn confirm(&self, hash: H256) -> Result<Receipt, ChainError> {
    let mut inner = self.inner.lock();
    let index = inner.confirm_calls;
    inner.confirm_calls += 1;
    if let Some(message) = inner.confirm_faults.remove(&index) {
      return Err(ChainError::Rpc(message));
    }
    inner
      .receipts
      .get(&hash)
      .cloned()
      .ok_or(ChainError::UnknownTransaction(hash))
  }

  async fn allowance(
    &self,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> Result<U256, ChainError> {
    Ok(
      self
        .inner
        .lock()
        .allowances
        .get(&(token, owner, spender))
        .copied()
        .unwrap_or_default(),
    )
  }

  async fn pledge_claimed(
    &self,
    treasury: Address,
    pledge_id: PledgeId,
  ) -> Result<bool, ChainError> {
    Ok(
      self
        .inner
        .lock()
        .pledges
        .get(&(treasury, pledge_id))
        .map(|record| record.claimed)
        .unwrap_or(false),
    )
  }
}

#[cfg(test)]
mod tests {
  use {super::*, crate::classify, crate::ErrorKind};

  fn wallet(seed: u8) -> LocalWallet {
    LocalWallet::from_bytes(&[seed; 32]).expect("valid test key")
  }

  fn chain(operator: &LocalWallet) -> DevChain {
    DevChain::new(
      DevChainConfig {
        min_launch_offset: 300,
        min_duration: 86_400,
        platform_operator: operator.address(),
        token: Address::repeat_byte(0x05),
      },
      1_700_000_000,
    )
  }

  fn valid_timing(now: u64) -> CampaignTiming {
    CampaignTiming {
      launch_time: now + 300,
      deadline: now + 300 + 86_400,
      goal_amount: U256::from(1000u64),
    }
  }

  async fn create_campaign(
    chain: &DevChain,
    operator: &LocalWallet,
  ) -> anyhow::Result<Address> {
    let now = chain.chain_time().await?;
    let hash = chain
      .submit(operator, Call::CreateCampaign {
        factory: Address::repeat_byte(0xfa),
        creator: Address::repeat_byte(0xcc),
        identifier_hash: H256::repeat_byte(0x1d),
        platform_hashes: vec![],
        data_keys: vec![],
        data_values: vec![],
        timing: valid_timing(now),
      })
      .await?;
    let receipt = chain.confirm(hash).await?;
    Ok(
      CampaignCreated::decode(&receipt, Address::repeat_byte(0xfa))?
        .campaign,
    )
  }

  #[tokio::test]
  async fn rejects_timing_below_chain_minimums() -> anyhow::Result<()> {
    let operator = wallet(1);
    let chain = chain(&operator);
    let now = chain.chain_time().await?;

    let err = chain
      .submit(&operator, Call::CreateCampaign {
        factory: Address::repeat_byte(0xfa),
        creator: Address::repeat_byte(0xcc),
        identifier_hash: H256::repeat_byte(0x1d),
        platform_hashes: vec![],
        data_keys: vec![],
        data_values: vec![],
        timing: CampaignTiming {
          launch_time: now + 10,
          deadline: now + 10 + 86_400,
          goal_amount: U256::from(1000u64),
        },
      })
      .await
      .unwrap_err();

    assert_eq!(classify(&err.to_string()), ErrorKind::ContractError);

    // timing that was valid at genesis stops being valid once the
    // clock moves past it
    chain.advance(600);
    let err = chain
      .submit(&operator, Call::CreateCampaign {
        factory: Address::repeat_byte(0xfa),
        creator: Address::repeat_byte(0xcc),
        identifier_hash: H256::repeat_byte(0x1d),
        platform_hashes: vec![],
        data_keys: vec![],
        data_values: vec![],
        timing: valid_timing(now),
      })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("launch time below minimum"));
    Ok(())
  }

  #[tokio::test]
  async fn registration_is_operator_only_and_single_shot(
  ) -> anyhow::Result<()> {
    let operator = wallet(1);
    let donor = wallet(2);
    let chain = chain(&operator);

    let campaign = create_campaign(&chain, &operator).await?;
    let hash = chain
      .submit(&operator, Call::DeployTreasury {
        factory: Address::repeat_byte(0xfb),
        platform_hash: H256::repeat_byte(0xaa),
        campaign,
      })
      .await?;
    let receipt = chain.confirm(hash).await?;
    let treasury =
      TreasuryDeployed::decode(&receipt, Address::repeat_byte(0xfb))?
        .treasury;

    let register = Call::RegisterPledge {
      treasury,
      pledge_id: PledgeId::derive(
        donor.address(),
        1,
        U256::from(100u64),
        1,
      ),
      donor: donor.address(),
      amount: U256::from(100u64),
      tip: U256::zero(),
    };

    // unconfigured treasury refuses registrations
    let err = chain
      .submit(&operator, register.clone())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("not configured"));

    chain
      .submit(&operator, Call::ConfigureTreasury {
        treasury,
        timing: valid_timing(chain.chain_time().await?),
        fees: crate::TreasuryFees {
          flat_fee: U256::zero(),
          cumulative_flat_fee: U256::zero(),
          platform_fee_bps: 400,
          commission_bps: 100,
        },
      })
      .await?;

    // donors cannot register
    let err = chain.submit(&donor, register.clone()).await.unwrap_err();
    assert!(err.to_string().contains("not the platform operator"));

    chain.submit(&operator, register.clone()).await?;

    // re-registration of the same id is an explicit duplicate error
    let err = chain.submit(&operator, register).await.unwrap_err();
    assert!(err.to_string().contains("already registered"));
    Ok(())
  }

  #[tokio::test]
  async fn pledge_is_allowance_gated() -> anyhow::Result<()> {
    let operator = wallet(1);
    let donor = wallet(2);
    let chain = chain(&operator);

    let campaign = create_campaign(&chain, &operator).await?;
    let hash = chain
      .submit(&operator, Call::DeployTreasury {
        factory: Address::repeat_byte(0xfb),
        platform_hash: H256::repeat_byte(0xaa),
        campaign,
      })
      .await?;
    let receipt = chain.confirm(hash).await?;
    let treasury =
      TreasuryDeployed::decode(&receipt, Address::repeat_byte(0xfb))?
        .treasury;
    chain
      .submit(&operator, Call::ConfigureTreasury {
        treasury,
        timing: valid_timing(chain.chain_time().await?),
        fees: crate::TreasuryFees {
          flat_fee: U256::zero(),
          cumulative_flat_fee: U256::zero(),
          platform_fee_bps: 400,
          commission_bps: 100,
        },
      })
      .await?;

    let pledge_id =
      PledgeId::derive(donor.address(), 1, U256::from(100u64), 1);
    chain
      .submit(&operator, Call::RegisterPledge {
        treasury,
        pledge_id,
        donor: donor.address(),
        amount: U256::from(100u64),
        tip: U256::from(5u64),
      })
      .await?;

    let pledge = Call::Pledge {
      treasury,
      pledge_id,
      amount: U256::from(100u64),
      tip: U256::from(5u64),
    };

    // pledge before approval confirms fails on allowance
    let err = chain.submit(&donor, pledge.clone()).await.unwrap_err();
    assert!(err.to_string().contains("insufficient allowance"));

    chain
      .submit(&donor, Call::Approve {
        token: Address::repeat_byte(0x05),
        spender: treasury,
        amount: U256::from(105u64),
      })
      .await?;

    chain.submit(&donor, pledge.clone()).await?;
    assert!(chain.pledge_claimed(treasury, pledge_id).await?);

    // a claimed pledge cannot be claimed twice
    let err = chain.submit(&donor, pledge).await.unwrap_err();
    assert!(err.to_string().contains("already claimed"));
    Ok(())
  }
}

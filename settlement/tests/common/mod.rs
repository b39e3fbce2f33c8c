use {
  ethers::signers::{LocalWallet, Signer},
  patron_chain::{
    Call,
    CampaignCreated,
    DevChain,
    DevChainConfig,
    Provider,
    TreasuryDeployed,
    TreasuryFees,
  },
  patron_primitives::{Address, CampaignTiming, H256, U256},
  patron_settlement::DonationRequest,
};

pub const CHAIN_ID: u64 = 44787;
pub const GENESIS: u64 = 1_700_000_000;

pub fn token() -> Address {
  Address::repeat_byte(0x05)
}

pub fn wallet(seed: u8) -> LocalWallet {
  LocalWallet::from_bytes(&[seed; 32]).expect("valid test key")
}

pub fn devchain(operator: &LocalWallet) -> DevChain {
  DevChain::new(
    DevChainConfig {
      min_launch_offset: 300,
      min_duration: 86_400,
      platform_operator: operator.address(),
      token: token(),
    },
    GENESIS,
  )
}

/// Provisions a campaign with a configured treasury, the way the
/// deployment pipeline would, and returns the treasury address.
pub async fn configured_treasury(
  chain: &DevChain,
  operator: &LocalWallet,
) -> anyhow::Result<Address> {
  let treasury = deployed_treasury(chain, operator).await?;
  let now = chain.chain_time().await?;
  chain
    .submit(operator, Call::ConfigureTreasury {
      treasury,
      timing: CampaignTiming {
        launch_time: now + 300,
        deadline: now + 300 + 86_400,
        goal_amount: U256::from(1_000u64),
      },
      fees: TreasuryFees {
        flat_fee: U256::zero(),
        cumulative_flat_fee: U256::zero(),
        platform_fee_bps: 400,
        commission_bps: 100,
      },
    })
    .await?;
  Ok(treasury)
}

/// Provisions a campaign and a treasury but leaves the treasury
/// unconfigured.
pub async fn deployed_treasury(
  chain: &DevChain,
  operator: &LocalWallet,
) -> anyhow::Result<Address> {
  let factory = Address::repeat_byte(0xfa);
  let now = chain.chain_time().await?;
  let hash = chain
    .submit(operator, Call::CreateCampaign {
      factory,
      creator: Address::repeat_byte(0xcc),
      identifier_hash: H256::repeat_byte(0x1d),
      platform_hashes: vec![H256::repeat_byte(0xaa)],
      data_keys: vec![],
      data_values: vec![],
      timing: CampaignTiming {
        launch_time: now + 300,
        deadline: now + 300 + 86_400,
        goal_amount: U256::from(1_000u64),
      },
    })
    .await?;
  let receipt = chain.confirm(hash).await?;
  let campaign = CampaignCreated::decode(&receipt, factory)?.campaign;

  let treasury_factory = Address::repeat_byte(0xfb);
  let hash = chain
    .submit(operator, Call::DeployTreasury {
      factory: treasury_factory,
      platform_hash: H256::repeat_byte(0xaa),
      campaign,
    })
    .await?;
  let receipt = chain.confirm(hash).await?;
  Ok(TreasuryDeployed::decode(&receipt, treasury_factory)?.treasury)
}

pub fn request(treasury: Address, amount: u64, tip: u64) -> DonationRequest {
  DonationRequest {
    campaign_id: 1,
    treasury: Some(treasury),
    token: token(),
    token_symbol: "USDC".into(),
    chain_id: CHAIN_ID,
    amount: U256::from(amount),
    tip: U256::from(tip),
    user_id: 7,
    is_anonymous: false,
  }
}

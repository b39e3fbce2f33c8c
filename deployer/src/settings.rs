use {
  crate::DeployerConfig,
  clap::{Parser, Subcommand},
  ethers::signers::LocalWallet,
  humantime::Duration,
  patron_chain::TreasuryFees,
  patron_primitives::{Address, H256, U256},
  std::path::PathBuf,
};

/// Patron contract deployer
///
/// Provisions campaign and treasury contracts for approved campaigns
/// and reconciles chain-enforced timing back into the campaign store.
#[derive(Debug, Parser)]
pub struct SystemSettings {
  #[clap(subcommand)]
  pub command: Command,

  /// JSON-RPC endpoint of the target network
  #[clap(long,
    default_value = "http://127.0.0.1:8545",
    value_name = "URL")]
  rpc_url: String,

  /// Chain id transactions are signed for
  #[clap(long,
    default_value = "44787",
    value_name = "ID")]
  chain_id: u64,

  /// Campaign factory contract address
  #[clap(long, value_name = "ADDRESS")]
  factory: Option<String>,

  /// Treasury factory contract address
  #[clap(long, value_name = "ADDRESS")]
  treasury_factory: Option<String>,

  /// Platform identifier hash registered with the factories
  #[clap(long, value_name = "HASH")]
  platform_hash: Option<String>,

  /// Hex-encoded platform operator signing key
  #[clap(long, value_name = "KEY")]
  operator_key: Option<String>,

  /// Platform fee written into treasuries, in basis points
  #[clap(long,
    default_value = "400",
    value_name = "BPS")]
  platform_fee_bps: u32,

  /// Platform commission written into treasuries, in basis points
  #[clap(long,
    default_value = "100",
    value_name = "BPS")]
  commission_bps: u32,

  /// Flat fee in token base units
  #[clap(long,
    default_value = "0",
    value_name = "AMOUNT")]
  flat_fee: u64,

  /// Cumulative flat fee in token base units
  #[clap(long,
    default_value = "0",
    value_name = "AMOUNT")]
  cumulative_flat_fee: u64,

  /// Decimals of the pledge token, used when seeding demo goals
  #[clap(long,
    default_value = "6",
    value_name = "DECIMALS")]
  pub token_decimals: u32,

  /// Chain-enforced minimum delay before a campaign launch
  #[clap(long,
    default_value = "1h",
    value_name = "DURATION")]
  min_launch_offset: Duration,

  /// Chain-enforced minimum campaign duration
  #[clap(long,
    default_value = "1d",
    value_name = "DURATION")]
  min_duration: Duration,

  /// Pause between campaign and treasury submissions
  #[clap(long,
    default_value = "5s",
    value_name = "DURATION")]
  settle_delay: Duration,

  /// Pause between campaigns in a batch
  #[clap(long,
    default_value = "2s",
    value_name = "DURATION")]
  deploy_interval: Duration,

  /// Receipt polling interval while waiting for confirmations
  #[clap(long,
    default_value = "3s",
    value_name = "DURATION")]
  poll_interval: Duration,

  /// Directory holding the campaign store
  #[clap(long,
    default_value = "patron-data",
    value_name = "PATH")]
  pub data_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Write demo campaigns into the store
  Seed {
    /// Number of campaigns to create
    #[clap(long, default_value = "5")]
    count: u64,
  },

  /// Provision contracts for pending campaigns
  Deploy {
    /// Also deploy and configure a treasury per campaign
    #[clap(long)]
    with_treasuries: bool,

    /// Produce synthetic deployments without touching a chain
    #[clap(long)]
    dummy: bool,
  },
}

impl SystemSettings {
  pub fn rpc_url(&self) -> &str {
    &self.rpc_url
  }

  pub fn chain_id(&self) -> u64 {
    self.chain_id
  }

  pub fn poll_interval(&self) -> std::time::Duration {
    self.poll_interval.into()
  }

  pub fn operator(&self) -> anyhow::Result<LocalWallet> {
    let key = self
      .operator_key
      .as_deref()
      .ok_or_else(|| anyhow::anyhow!("--operator-key is required"))?;
    Ok(key.parse::<LocalWallet>()?)
  }

  pub fn deployer_config(&self) -> anyhow::Result<DeployerConfig> {
    Ok(DeployerConfig {
      factory: parse_address("--factory", self.factory.as_deref())?,
      treasury_factory: parse_address(
        "--treasury-factory",
        self.treasury_factory.as_deref(),
      )?,
      platform_hash: self
        .platform_hash
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--platform-hash is required"))?
        .parse::<H256>()?,
      fees: TreasuryFees {
        flat_fee: U256::from(self.flat_fee),
        cumulative_flat_fee: U256::from(self.cumulative_flat_fee),
        platform_fee_bps: self.platform_fee_bps,
        commission_bps: self.commission_bps,
      },
      min_launch_offset: self.min_launch_offset.as_secs(),
      min_duration: self.min_duration.as_secs(),
      settle_delay: self.settle_delay.into(),
      deploy_interval: self.deploy_interval.into(),
    })
  }

  /// Config for dummy runs, where no real contract addresses exist.
  pub fn dummy_config(&self) -> DeployerConfig {
    DeployerConfig {
      factory: Address::repeat_byte(0xfa),
      treasury_factory: Address::repeat_byte(0xfb),
      platform_hash: H256::repeat_byte(0xaa),
      fees: TreasuryFees {
        flat_fee: U256::from(self.flat_fee),
        cumulative_flat_fee: U256::from(self.cumulative_flat_fee),
        platform_fee_bps: self.platform_fee_bps,
        commission_bps: self.commission_bps,
      },
      min_launch_offset: self.min_launch_offset.as_secs(),
      min_duration: self.min_duration.as_secs(),
      settle_delay: std::time::Duration::from_millis(10),
      deploy_interval: std::time::Duration::from_millis(10),
    }
  }
}

fn parse_address(
  flag: &str,
  value: Option<&str>,
) -> anyhow::Result<Address> {
  value
    .ok_or_else(|| anyhow::anyhow!("{flag} is required"))?
    .parse::<Address>()
    .map_err(|e| anyhow::anyhow!("{flag}: {e}"))
}

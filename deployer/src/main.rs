use {
  clap::Parser,
  ethers::signers::LocalWallet,
  metrics_exporter_prometheus::PrometheusBuilder,
  patron_chain::{DummyProvider, Provider, RpcProvider},
  patron_deployer::{
    seed_campaigns,
    Command,
    Deployer,
    DeployerConfig,
    SystemSettings,
  },
  patron_primitives::{Campaign, CampaignStatus},
  patron_store::{DiskStore, Store},
  tracing::info,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt::init();
  PrometheusBuilder::new()
    .install()
    .expect("failed to install metrics exporter");

  let settings = SystemSettings::parse();
  info!("deployer command: {:?}", settings.command);

  let store = DiskStore::open(&settings.data_dir)?;

  match &settings.command {
    Command::Seed { count } => {
      let ids = seed_campaigns(&store, *count, settings.token_decimals)?;
      info!("campaigns ready for deployment: {ids:?}");
      Ok(())
    }
    &Command::Deploy {
      with_treasuries,
      dummy,
    } => {
      let campaigns = pending_campaigns(&store, with_treasuries)?;
      if campaigns.is_empty() {
        info!("nothing to deploy");
        return Ok(());
      }
      info!("{} campaigns pending deployment", campaigns.len());

      if dummy {
        // synthetic runs sign nothing real; a fixed dev key will do
        let operator =
          LocalWallet::from_bytes(&[0x42u8; 32]).expect("static dev key");
        let provider = DummyProvider::new();
        let config = settings.dummy_config();
        run(&provider, &store, operator, config, campaigns, with_treasuries)
          .await
      } else {
        let operator = settings.operator()?;
        let provider = RpcProvider::connect(
          settings.rpc_url(),
          settings.chain_id(),
          settings.poll_interval(),
        )?;
        let config = settings.deployer_config()?;
        run(&provider, &store, operator, config, campaigns, with_treasuries)
          .await
      }
    }
  }
}

fn pending_campaigns(
  store: &DiskStore,
  with_treasuries: bool,
) -> anyhow::Result<Vec<Campaign>> {
  Ok(
    store
      .campaigns()?
      .into_iter()
      .filter(|campaign| {
        campaign.status == CampaignStatus::PendingApproval
          && (campaign.campaign_address.is_none()
            || (with_treasuries && campaign.treasury_address.is_none()))
      })
      .collect(),
  )
}

async fn run<P: Provider>(
  provider: &P,
  store: &DiskStore,
  operator: LocalWallet,
  config: DeployerConfig,
  campaigns: Vec<Campaign>,
  with_treasuries: bool,
) -> anyhow::Result<()> {
  let deployer = Deployer::new(provider, store, operator, config);
  let stats = deployer.run_batch(&campaigns, with_treasuries).await;
  info!("\n{}", stats.report());
  Ok(())
}

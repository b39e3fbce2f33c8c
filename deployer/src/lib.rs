mod deploy;
mod seed;
mod settings;
mod stats;

pub use {
  deploy::{
    clamp_timing,
    CampaignProvisioning,
    Deployer,
    DeployerConfig,
    DeploymentResult,
    TreasuryOutcome,
  },
  seed::seed_campaigns,
  settings::{Command, SystemSettings},
  stats::{DeploymentStats, ErrorBucket},
};

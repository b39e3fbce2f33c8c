mod call;
mod devchain;
mod dummy;
mod error;
mod event;
mod provider;
mod rpc;

pub mod qf;

pub use {
  call::{Call, TreasuryFees},
  devchain::{DevChain, DevChainConfig},
  dummy::DummyProvider,
  error::{classify, ChainError, ErrorKind},
  event::{
    address_topic,
    CampaignCreated,
    EventError,
    LogEntry,
    Receipt,
    TreasuryDeployed,
  },
  provider::Provider,
  rpc::RpcProvider,
};

mod campaign;
mod payment;
mod pledge;

pub use {
  campaign::{Campaign, CampaignStatus, CampaignTiming, CampaignUpdate},
  ethers::types::{Address, H256, U256},
  payment::{NewPayment, Payment, PaymentKind, PaymentStatus},
  pledge::{Error as PledgeIdError, PledgeId},
};

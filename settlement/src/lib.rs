pub mod commit;

mod error;
mod machine;
mod registration;
mod wallet;

pub use {
  commit::{Error as CommitError, MAX_ALLOWANCE_RETRIES},
  error::SettlementError,
  machine::{
    DonationRequest,
    Settlement,
    SettlementEvent,
    SettlementReceipt,
    Step,
  },
  registration::{Error as RegistrationError, Registrar},
  wallet::{Error as WalletError, StaticWallet, Wallet},
};

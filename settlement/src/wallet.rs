use {
  ethers::signers::{LocalWallet, Signer},
  patron_primitives::Address,
  thiserror::Error,
};

#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error("request rejected by user")]
  Rejected,

  #[error("wallet has no connected account")]
  NotConnected,

  #[error("wallet provider error: {0}")]
  Provider(String),
}

/// Donor wallet seam.
///
/// Real adapters put an interactive prompt behind `connect`,
/// `switch_network` and any use of the signing key, so every call can
/// fail with a user rejection, which is always recoverable.
#[allow(async_fn_in_trait)]
pub trait Wallet {
  /// Currently connected account, if any.
  fn address(&self) -> Option<Address>;

  /// Network the wallet is currently on, if connected.
  fn chain_id(&self) -> Option<u64>;

  async fn connect(&mut self) -> Result<Address, Error>;

  async fn switch_network(&mut self, chain_id: u64) -> Result<(), Error>;

  /// Signing key for transaction submission. Fails when no account is
  /// connected.
  fn signer(&self) -> Result<&LocalWallet, Error>;
}

/// Key-in-memory wallet for tests, dev tooling and headless flows.
pub struct StaticWallet {
  keypair: LocalWallet,
  connected: bool,
  chain_id: Option<u64>,
}

impl StaticWallet {
  /// Starts disconnected; the settlement flow will drive `connect` and
  /// `switch_network`.
  pub fn new(keypair: LocalWallet) -> Self {
    Self {
      keypair,
      connected: false,
      chain_id: None,
    }
  }

  /// Starts already connected on the given network, which makes the
  /// settlement flow skip its connect and switch steps.
  pub fn connected(keypair: LocalWallet, chain_id: u64) -> Self {
    Self {
      keypair,
      connected: true,
      chain_id: Some(chain_id),
    }
  }
}

impl Wallet for StaticWallet {
  fn address(&self) -> Option<Address> {
    self.connected.then(|| self.keypair.address())
  }

  fn chain_id(&self) -> Option<u64> {
    self.connected.then_some(self.chain_id).flatten()
  }

  async fn connect(&mut self) -> Result<Address, Error> {
    self.connected = true;
    Ok(self.keypair.address())
  }

  async fn switch_network(&mut self, chain_id: u64) -> Result<(), Error> {
    if !self.connected {
      return Err(Error::NotConnected);
    }
    self.chain_id = Some(chain_id);
    Ok(())
  }

  fn signer(&self) -> Result<&LocalWallet, Error> {
    if !self.connected {
      return Err(Error::NotConnected);
    }
    Ok(&self.keypair)
  }
}

use {
  patron_primitives::H256,
  serde::{Deserialize, Serialize},
  std::fmt::Display,
  thiserror::Error,
};

#[derive(Debug, Clone, Error)]
pub enum ChainError {
  /// The chain accepted the submission but the contract rejected it.
  #[error("transaction rejected: {0}")]
  Rejected(String),

  /// Transport, node or signer-middleware failure.
  #[error("rpc error: {0}")]
  Rpc(String),

  #[error("unknown transaction {0:?}")]
  UnknownTransaction(H256),

  #[error("invalid endpoint or signer configuration: {0}")]
  Config(String),
}

/// Failure taxonomy for chain and RPC errors.
///
/// Raw provider errors are never shown to end users; they are mapped onto
/// this taxonomy and rendered through [`ErrorKind::remediation`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
pub enum ErrorKind {
  InsufficientFunds,
  GasLimit,
  NetworkError,
  ContractError,
  Unknown,
}

impl ErrorKind {
  pub fn remediation(&self) -> &'static str {
    match self {
      ErrorKind::InsufficientFunds => {
        "top up the signing account with native tokens for gas"
      }
      ErrorKind::GasLimit => {
        "raise the transaction gas limit or simplify the call"
      }
      ErrorKind::NetworkError => {
        "check RPC endpoint connectivity and retry"
      }
      ErrorKind::ContractError => {
        "inspect the revert reason; contract preconditions were not met"
      }
      ErrorKind::Unknown => {
        "inspect the raw error message; no known category matched"
      }
    }
  }
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
      ErrorKind::GasLimit => "GAS_LIMIT",
      ErrorKind::NetworkError => "NETWORK_ERROR",
      ErrorKind::ContractError => "CONTRACT_ERROR",
      ErrorKind::Unknown => "UNKNOWN",
    })
  }
}

/// Maps a raw error message onto the failure taxonomy.
///
/// Total and pure. The checks are order-sensitive: an underfunded signer
/// often surfaces as "insufficient funds to pay for gas", so the funds
/// check must run before the generic gas and network checks. Anything
/// unmatched is [`ErrorKind::Unknown`].
pub fn classify(message: &str) -> ErrorKind {
  let message = message.to_lowercase();
  if message.contains("insufficient funds") {
    ErrorKind::InsufficientFunds
  } else if message.contains("gas limit") || message.contains("out of gas") {
    ErrorKind::GasLimit
  } else if message.contains("timeout")
    || message.contains("network")
    || message.contains("connection")
  {
    ErrorKind::NetworkError
  } else if message.contains("revert") || message.contains("execution") {
    ErrorKind::ContractError
  } else {
    ErrorKind::Unknown
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_known_categories() {
    assert_eq!(
      classify("insufficient funds to pay for gas"),
      ErrorKind::InsufficientFunds
    );
    assert_eq!(classify("gas limit exceeded"), ErrorKind::GasLimit);
    assert_eq!(classify("timeout while connecting"), ErrorKind::NetworkError);
    assert_eq!(classify("execution reverted: X"), ErrorKind::ContractError);
    assert_eq!(classify("banana"), ErrorKind::Unknown);
  }

  #[test]
  fn funds_check_precedes_gas_and_network() {
    // mentions gas, but the signer balance is the actual problem
    assert_eq!(
      classify("insufficient funds for gas * price + value"),
      ErrorKind::InsufficientFunds
    );
  }

  #[test]
  fn case_insensitive() {
    assert_eq!(classify("Gas Limit too low"), ErrorKind::GasLimit);
  }

  #[test]
  fn every_kind_has_remediation() {
    for kind in [
      ErrorKind::InsufficientFunds,
      ErrorKind::GasLimit,
      ErrorKind::NetworkError,
      ErrorKind::ContractError,
      ErrorKind::Unknown,
    ] {
      assert!(!kind.remediation().is_empty());
    }
  }
}

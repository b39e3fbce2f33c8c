use {
  ethers::utils::keccak256,
  patron_primitives::{Address, H256},
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

#[derive(Debug, Clone, Error)]
pub enum EventError {
  #[error("no {event} event emitted by {emitter:?} found in receipt")]
  NotFound {
    event: &'static str,
    emitter: Address,
  },

  #[error("{event} event is missing indexed topic {index}")]
  MissingTopic {
    event: &'static str,
    index: usize,
  },

  #[error("{event} event carries a malformed payload")]
  MalformedPayload { event: &'static str },
}

/// One emitted log entry, as found in a transaction receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
  pub address: Address,
  pub topics: Vec<H256>,
  pub data: Vec<u8>,
}

/// Mined-transaction receipt as consumed by this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
  pub transaction_hash: H256,
  pub status: bool,
  pub logs: Vec<LogEntry>,
}

/// Left-pads a 20-byte address into the 32-byte topic encoding used for
/// indexed address parameters.
pub fn address_topic(address: Address) -> H256 {
  let mut bytes = [0u8; 32];
  bytes[12..].copy_from_slice(address.as_bytes());
  H256::from(bytes)
}

fn address_from_word(
  word: &[u8],
  event: &'static str,
) -> Result<Address, EventError> {
  if word.len() != 32 || !word[..12].iter().all(|b| *b == 0) {
    return Err(EventError::MalformedPayload { event });
  }
  Ok(Address::from_slice(&word[12..]))
}

/// Campaign-factory creation event. The deployed campaign address rides
/// in the second indexed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignCreated {
  pub identifier_hash: H256,
  pub campaign: Address,
}

impl CampaignCreated {
  pub const NAME: &'static str = "CampaignCreated";

  pub fn signature() -> H256 {
    H256::from(keccak256(b"CampaignCreated(bytes32,address)"))
  }

  /// Scans receipt logs for the creation event, matching on both the
  /// event signature topic and the emitting factory address.
  pub fn decode(
    receipt: &Receipt,
    factory: Address,
  ) -> Result<Self, EventError> {
    let signature = Self::signature();
    for log in &receipt.logs {
      if log.address != factory || log.topics.first() != Some(&signature) {
        continue;
      }
      let identifier_hash = *log.topics.get(1).ok_or(
        EventError::MissingTopic {
          event: Self::NAME,
          index: 1,
        },
      )?;
      let campaign = log.topics.get(2).ok_or(EventError::MissingTopic {
        event: Self::NAME,
        index: 2,
      })?;
      return Ok(Self {
        identifier_hash,
        campaign: address_from_word(campaign.as_bytes(), Self::NAME)?,
      });
    }
    Err(EventError::NotFound {
      event: Self::NAME,
      emitter: factory,
    })
  }
}

/// Treasury-factory deployment event. Unlike the campaign factory, this
/// one carries the deployed address zero-padded in the log data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryDeployed {
  pub platform_hash: H256,
  pub treasury: Address,
}

impl TreasuryDeployed {
  pub const NAME: &'static str = "TreasuryDeployed";

  pub fn signature() -> H256 {
    H256::from(keccak256(b"TreasuryDeployed(bytes32,address)"))
  }

  pub fn decode(
    receipt: &Receipt,
    factory: Address,
  ) -> Result<Self, EventError> {
    let signature = Self::signature();
    for log in &receipt.logs {
      if log.address != factory || log.topics.first() != Some(&signature) {
        continue;
      }
      let platform_hash = *log.topics.get(1).ok_or(
        EventError::MissingTopic {
          event: Self::NAME,
          index: 1,
        },
      )?;
      return Ok(Self {
        platform_hash,
        treasury: address_from_word(&log.data, Self::NAME)?,
      });
    }
    Err(EventError::NotFound {
      event: Self::NAME,
      emitter: factory,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn receipt_with(logs: Vec<LogEntry>) -> Receipt {
    Receipt {
      transaction_hash: H256::repeat_byte(0x01),
      status: true,
      logs,
    }
  }

  #[test]
  fn decodes_campaign_created_from_indexed_topic() -> anyhow::Result<()> {
    let factory = Address::repeat_byte(0xfa);
    let campaign = Address::repeat_byte(0xca);
    let identifier = H256::repeat_byte(0x1d);

    let receipt = receipt_with(vec![
      // unrelated log from another contract
      LogEntry {
        address: Address::repeat_byte(0x99),
        topics: vec![CampaignCreated::signature()],
        data: vec![],
      },
      LogEntry {
        address: factory,
        topics: vec![
          CampaignCreated::signature(),
          identifier,
          address_topic(campaign),
        ],
        data: vec![],
      },
    ]);

    let decoded = CampaignCreated::decode(&receipt, factory)?;
    assert_eq!(decoded.campaign, campaign);
    assert_eq!(decoded.identifier_hash, identifier);
    Ok(())
  }

  #[test]
  fn missing_event_is_a_typed_error() {
    let receipt = receipt_with(vec![]);
    let err =
      CampaignCreated::decode(&receipt, Address::repeat_byte(0xfa));
    assert!(matches!(err, Err(EventError::NotFound { .. })));
  }

  #[test]
  fn wrong_emitter_is_not_matched() {
    let factory = Address::repeat_byte(0xfa);
    let receipt = receipt_with(vec![LogEntry {
      address: Address::repeat_byte(0x99),
      topics: vec![
        CampaignCreated::signature(),
        H256::zero(),
        address_topic(Address::repeat_byte(0xca)),
      ],
      data: vec![],
    }]);
    assert!(CampaignCreated::decode(&receipt, factory).is_err());
  }

  #[test]
  fn decodes_treasury_address_from_padded_data() -> anyhow::Result<()> {
    let factory = Address::repeat_byte(0xfb);
    let treasury = Address::repeat_byte(0x77);
    let receipt = receipt_with(vec![LogEntry {
      address: factory,
      topics: vec![TreasuryDeployed::signature(), H256::repeat_byte(0xb1)],
      data: address_topic(treasury).as_bytes().to_vec(),
    }]);

    let decoded = TreasuryDeployed::decode(&receipt, factory)?;
    assert_eq!(decoded.treasury, treasury);
    Ok(())
  }

  #[test]
  fn garbage_payload_is_a_typed_error() {
    let factory = Address::repeat_byte(0xfb);
    let receipt = receipt_with(vec![LogEntry {
      address: factory,
      topics: vec![TreasuryDeployed::signature(), H256::zero()],
      data: vec![0xff; 31],
    }]);
    assert!(matches!(
      TreasuryDeployed::decode(&receipt, factory),
      Err(EventError::MalformedPayload { .. })
    ));
  }
}

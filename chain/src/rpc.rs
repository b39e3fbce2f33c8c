use {
  crate::{Call, ChainError, LogEntry, Provider, Receipt},
  ethers::{
    abi::{self, ParamType, Token},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider as HttpProvider},
    signers::{LocalWallet, Signer},
    types::{
      transaction::eip2718::TypedTransaction,
      BlockNumber,
      TransactionRequest,
    },
    utils::keccak256,
  },
  patron_primitives::{Address, PledgeId, H256, U256},
  std::time::Duration,
  tracing::debug,
};

/// JSON-RPC provider for real networks.
///
/// Calldata for the closed [`Call`] surface is encoded by hand against
/// the platform contract signatures; each submission is signed with the
/// wallet passed by the caller. Receipt confirmation polls the node at a
/// fixed interval with no upper bound; cancelling the surrounding task is
/// the caller's concern.
pub struct RpcProvider {
  inner: HttpProvider<Http>,
  chain_id: u64,
  poll_interval: Duration,
}

impl RpcProvider {
  pub fn connect(
    endpoint: &str,
    chain_id: u64,
    poll_interval: Duration,
  ) -> Result<Self, ChainError> {
    Ok(Self {
      inner: HttpProvider::<Http>::try_from(endpoint)
        .map_err(|e| ChainError::Config(e.to_string()))?,
      chain_id,
      poll_interval,
    })
  }
}

fn rpc_err(e: impl std::fmt::Display) -> ChainError {
  ChainError::Rpc(e.to_string())
}

fn calldata(signature: &str, tokens: &[Token]) -> Vec<u8> {
  let selector = &keccak256(signature.as_bytes())[..4];
  let mut data = selector.to_vec();
  data.extend_from_slice(&abi::encode(tokens));
  data
}

fn word(hash: H256) -> Token {
  Token::FixedBytes(hash.as_bytes().to_vec())
}

fn words(hashes: &[H256]) -> Token {
  Token::Array(hashes.iter().copied().map(word).collect())
}

fn encode_call(call: &Call) -> (Address, Vec<u8>) {
  match call {
    Call::CreateCampaign {
      factory,
      creator,
      identifier_hash,
      platform_hashes,
      data_keys,
      data_values,
      timing,
    } => (
      *factory,
      calldata(
        "createCampaign(address,bytes32,bytes32[],bytes32[],bytes32[],\
         uint256[3])",
        &[
          Token::Address(*creator),
          word(*identifier_hash),
          words(platform_hashes),
          words(data_keys),
          words(data_values),
          Token::FixedArray(vec![
            Token::Uint(timing.launch_time.into()),
            Token::Uint(timing.deadline.into()),
            Token::Uint(timing.goal_amount),
          ]),
        ],
      ),
    ),

    Call::DeployTreasury {
      factory,
      platform_hash,
      campaign,
    } => (
      *factory,
      calldata("deployTreasury(bytes32,address)", &[
        word(*platform_hash),
        Token::Address(*campaign),
      ]),
    ),

    Call::ConfigureTreasury {
      treasury,
      timing,
      fees,
    } => (
      *treasury,
      calldata(
        "configureTreasury(uint256,uint256,uint256,uint256,uint256,\
         uint256,uint256)",
        &[
          Token::Uint(timing.launch_time.into()),
          Token::Uint(timing.deadline.into()),
          Token::Uint(timing.goal_amount),
          Token::Uint(fees.flat_fee),
          Token::Uint(fees.cumulative_flat_fee),
          Token::Uint(fees.platform_fee_bps.into()),
          Token::Uint(fees.commission_bps.into()),
        ],
      ),
    ),

    Call::Approve {
      token,
      spender,
      amount,
    } => (
      *token,
      calldata("approve(address,uint256)", &[
        Token::Address(*spender),
        Token::Uint(*amount),
      ]),
    ),

    Call::Pledge {
      treasury,
      pledge_id,
      amount,
      tip,
    } => (
      *treasury,
      calldata("pledge(bytes32,uint256,uint256)", &[
        word((*pledge_id).into()),
        Token::Uint(*amount),
        Token::Uint(*tip),
      ]),
    ),

    Call::RegisterPledge {
      treasury,
      pledge_id,
      donor,
      amount,
      tip,
    } => (
      *treasury,
      calldata("registerPledge(bytes32,address,uint256,uint256)", &[
        word((*pledge_id).into()),
        Token::Address(*donor),
        Token::Uint(*amount),
        Token::Uint(*tip),
      ]),
    ),
  }
}

impl Provider for RpcProvider {
  async fn chain_time(&self) -> Result<u64, ChainError> {
    let block = self
      .inner
      .get_block(BlockNumber::Latest)
      .await
      .map_err(rpc_err)?
      .ok_or_else(|| ChainError::Rpc("node returned no latest block".into()))?;
    Ok(block.timestamp.as_u64())
  }

  async fn submit(
    &self,
    signer: &LocalWallet,
    call: Call,
  ) -> Result<H256, ChainError> {
    let (to, data) = encode_call(&call);
    let client = SignerMiddleware::new(
      self.inner.clone(),
      signer.clone().with_chain_id(self.chain_id),
    );
    let request = TransactionRequest::new().to(to).data(data);
    let pending = client
      .send_transaction(request, None)
      .await
      .map_err(rpc_err)?;
    let hash = *pending;
    debug!("submitted {hash:?} to {to:?}");
    Ok(hash)
  }

  async fn confirm(&self, hash: H256) -> Result<Receipt, ChainError> {
    loop {
      match self
        .inner
        .get_transaction_receipt(hash)
        .await
        .map_err(rpc_err)?
      {
        Some(receipt) => {
          return Ok(Receipt {
            transaction_hash: hash,
            status: receipt
              .status
              .map(|status| status.as_u64() == 1)
              .unwrap_or(false),
            logs: receipt
              .logs
              .into_iter()
              .map(|log| LogEntry {
                address: log.address,
                topics: log.topics,
                data: log.data.to_vec(),
              })
              .collect(),
          });
        }
        None => tokio::time::sleep(self.poll_interval).await,
      }
    }
  }

  async fn allowance(
    &self,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> Result<U256, ChainError> {
    let data = calldata("allowance(address,address)", &[
      Token::Address(owner),
      Token::Address(spender),
    ]);
    let request: TypedTransaction =
      TransactionRequest::new().to(token).data(data).into();
    let output = self.inner.call(&request, None).await.map_err(rpc_err)?;
    let tokens = abi::decode(&[ParamType::Uint(256)], &output)
      .map_err(|e| ChainError::Rpc(format!("malformed response: {e}")))?;
    match tokens.first() {
      Some(Token::Uint(value)) => Ok(*value),
      _ => Err(ChainError::Rpc("malformed allowance response".into())),
    }
  }

  async fn pledge_claimed(
    &self,
    treasury: Address,
    pledge_id: PledgeId,
  ) -> Result<bool, ChainError> {
    let data =
      calldata("pledgeClaimed(bytes32)", &[word(pledge_id.into())]);
    let request: TypedTransaction =
      TransactionRequest::new().to(treasury).data(data).into();
    let output = self.inner.call(&request, None).await.map_err(rpc_err)?;
    let tokens = abi::decode(&[ParamType::Bool], &output)
      .map_err(|e| ChainError::Rpc(format!("malformed response: {e}")))?;
    match tokens.first() {
      Some(Token::Bool(value)) => Ok(*value),
      _ => Err(ChainError::Rpc("malformed claim response".into())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selectors_are_four_bytes_plus_args() {
    let (to, data) = encode_call(&Call::Approve {
      token: Address::repeat_byte(0x05),
      spender: Address::repeat_byte(0x06),
      amount: U256::from(1000u64),
    });
    assert_eq!(to, Address::repeat_byte(0x05));
    // selector + two 32-byte words
    assert_eq!(data.len(), 4 + 64);
    assert_eq!(&data[..4], &keccak256(b"approve(address,uint256)")[..4]);
  }
}

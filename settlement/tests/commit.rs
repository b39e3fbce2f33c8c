use {
  common::{configured_treasury, devchain, token, wallet},
  ethers::signers::Signer,
  patron_chain::{Call, Provider},
  patron_primitives::{PledgeId, U256},
  patron_settlement::{commit, CommitError, MAX_ALLOWANCE_RETRIES},
};

mod common;

#[tokio::test]
async fn allowance_rejection_is_transient_not_fatal() -> anyhow::Result<()> {
  tokio::time::pause();

  let operator = wallet(1);
  let chain = devchain(&operator);
  let treasury = configured_treasury(&chain, &operator).await?;

  let donor = wallet(2);
  let amount = U256::from(100u64);
  let tip = U256::from(5u64);
  let pledge_id = PledgeId::derive(donor.address(), 1, amount, 1);

  chain
    .submit(&operator, Call::RegisterPledge {
      treasury,
      pledge_id,
      donor: donor.address(),
      amount,
      tip,
    })
    .await?;

  // no approval was ever signed: every attempt is rejected for
  // allowance and the retry loop gives up without marking it fatal
  let err = commit::pledge(
    &chain, &donor, token(), treasury, donor.address(), pledge_id, amount,
    tip,
  )
  .await
  .unwrap_err();
  assert!(matches!(
    err,
    CommitError::AllowanceNotVisible(MAX_ALLOWANCE_RETRIES)
  ));
  assert!(!chain.pledge_claimed(treasury, pledge_id).await?);

  // once the approval confirms, the same pledge id goes through
  let approve = commit::approve(
    &chain,
    &donor,
    token(),
    treasury,
    amount + tip,
  )
  .await?;
  commit::await_success(&chain, approve, "approval").await?;

  commit::pledge(
    &chain, &donor, token(), treasury, donor.address(), pledge_id, amount,
    tip,
  )
  .await?;
  assert!(chain.pledge_claimed(treasury, pledge_id).await?);
  Ok(())
}

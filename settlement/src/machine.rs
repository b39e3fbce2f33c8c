use {
  crate::{
    commit,
    registration::{self, Registrar},
    SettlementError,
    Wallet,
  },
  patron_chain::{classify, ErrorKind, Provider},
  patron_primitives::{
    Address,
    NewPayment,
    PaymentKind,
    PaymentStatus,
    PledgeId,
    H256,
    U256,
  },
  patron_store::{Store, StoreError, PLEDGE_ID_KEY},
  serde::{Deserialize, Serialize},
  std::{
    collections::BTreeMap,
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
  },
  tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
  tracing::{debug, info, warn},
};

/// Steps of the donation settlement flow, in order. `Failed` is
/// reachable from any of them.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
pub enum Step {
  Idle,
  Connect,
  Switch,
  RequestTransaction,
  RegisterPledge,
  ApproveErc20,
  WaitApproveConfirmation,
  PledgeContract,
  WaitPledgeConfirmation,
  StorageComplete,
  Done,
  Failed,
}

impl Display for Step {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Step::Idle => "idle",
      Step::Connect => "connect",
      Step::Switch => "switch",
      Step::RequestTransaction => "requestTransaction",
      Step::RegisterPledge => "registerPledge",
      Step::ApproveErc20 => "approveErc20",
      Step::WaitApproveConfirmation => "waitApproveConfirmation",
      Step::PledgeContract => "pledgeContract",
      Step::WaitPledgeConfirmation => "waitPledgeConfirmation",
      Step::StorageComplete => "storageComplete",
      Step::Done => "done",
      Step::Failed => "failed",
    })
  }
}

/// Transition events emitted by the machine. Consumed by whatever UI
/// layer is driving the donation; the machine itself has no rendering
/// concerns.
#[derive(Debug, Clone)]
pub enum SettlementEvent {
  Entered(Step),
  Completed(SettlementReceipt),
  Failed {
    step: Step,
    kind: ErrorKind,
    message: String,
    retryable: bool,
  },
}

#[derive(Debug, Clone)]
pub struct SettlementReceipt {
  pub payment_id: u64,
  pub pledge_id: PledgeId,
  pub transaction_hash: Option<H256>,
}

/// Parameters of one donation.
#[derive(Debug, Clone)]
pub struct DonationRequest {
  pub campaign_id: u64,
  pub treasury: Option<Address>,
  pub token: Address,
  pub token_symbol: String,
  pub chain_id: u64,
  pub amount: U256,
  pub tip: U256,
  pub user_id: u64,
  pub is_anonymous: bool,
}

/// Drives one donation from wallet connection to the stored payment row.
///
/// The machine holds its position between `run` calls: after a failure
/// it can be re-run and resumes from the failed step, reusing the pledge
/// id derived on the first attempt. Ordering is strict: the pledge id is
/// registered by the platform operator before the donor signs anything,
/// and the approval must confirm before the pledge is submitted.
pub struct Settlement<'a, P, W, S> {
  provider: &'a P,
  registrar: &'a Registrar<'a, P>,
  wallet: &'a mut W,
  store: &'a S,
  request: DonationRequest,
  events: UnboundedSender<SettlementEvent>,
  current: Step,
  cursor: Step,
  pledge_id: Option<PledgeId>,
  approve_hash: Option<H256>,
  pledge_hash: Option<H256>,
}

impl<'a, P, W, S> Settlement<'a, P, W, S>
where
  P: Provider,
  W: Wallet,
  S: Store,
{
  pub fn new(
    provider: &'a P,
    registrar: &'a Registrar<'a, P>,
    wallet: &'a mut W,
    store: &'a S,
    request: DonationRequest,
  ) -> (Self, UnboundedReceiver<SettlementEvent>) {
    let (events, receiver) = unbounded_channel();
    (
      Self {
        provider,
        registrar,
        wallet,
        store,
        request,
        events,
        current: Step::Idle,
        cursor: Step::Idle,
        pledge_id: None,
        approve_hash: None,
        pledge_hash: None,
      },
      receiver,
    )
  }

  /// Pledge id of the current attempt, once derived.
  pub fn pledge_id(&self) -> Option<PledgeId> {
    self.pledge_id
  }

  /// Step the machine is currently at.
  pub fn step(&self) -> Step {
    self.current
  }

  pub async fn run(
    &mut self,
  ) -> Result<SettlementReceipt, SettlementError> {
    match self.drive().await {
      Ok(receipt) => {
        self.current = Step::Done;
        self.emit(SettlementEvent::Completed(receipt.clone()));
        info!("donation settled: payment {}", receipt.payment_id);
        Ok(receipt)
      }
      Err(e) => {
        let step = self.current;
        self.current = Step::Failed;
        let message = e.to_string();
        warn!("donation failed at {step}: {message}");
        self.emit(SettlementEvent::Failed {
          step,
          kind: classify(&message),
          message,
          retryable: e.retryable(),
        });
        Err(e)
      }
    }
  }

  fn emit(&self, event: SettlementEvent) {
    // the consumer may have gone away; settlement continues regardless
    let _ = self.events.send(event);
  }

  fn enter(&mut self, step: Step) {
    debug!("entering {step}");
    self.current = step;
    self.emit(SettlementEvent::Entered(step));
  }

  async fn drive(
    &mut self,
  ) -> Result<SettlementReceipt, SettlementError> {
    // wallet checks re-run on every attempt; they are cheap and the
    // session may have changed between retries
    if self.wallet.address().is_none() {
      self.enter(Step::Connect);
      self.wallet.connect().await?;
    }
    if self.wallet.chain_id() != Some(self.request.chain_id) {
      self.enter(Step::Switch);
      self.wallet.switch_network(self.request.chain_id).await?;
    }

    let donor = self.wallet.address().ok_or(SettlementError::NotConnected)?;

    if self.cursor <= Step::RequestTransaction {
      self.enter(Step::RequestTransaction);
      if self.request.amount.is_zero() {
        return Err(SettlementError::InvalidAmount);
      }
      if self.request.treasury.is_none() {
        return Err(SettlementError::MissingTreasury);
      }
      let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
      self.pledge_id = Some(PledgeId::derive(
        donor,
        self.request.campaign_id,
        self.request.amount,
        timestamp,
      ));
      self.cursor = Step::RegisterPledge;
    }

    let treasury = self
      .request
      .treasury
      .ok_or(SettlementError::MissingTreasury)?;
    let pledge_id = self
      .pledge_id
      .expect("derived before the cursor moves past requestTransaction");

    if self.cursor <= Step::RegisterPledge {
      self.enter(Step::RegisterPledge);
      match self
        .registrar
        .register(
          treasury,
          pledge_id,
          donor,
          self.request.amount,
          self.request.tip,
        )
        .await
      {
        Ok(_) => {}
        // a retry of an attempt whose registration confirmed late; the
        // id is derived from this donor and attempt, so it is ours
        Err(registration::Error::Duplicate(_))
          if self.current == Step::RegisterPledge
            && self.approve_hash.is_none() =>
        {
          debug!("pledge {pledge_id} was already registered, continuing");
        }
        Err(e) => return Err(e.into()),
      }
      self.cursor = Step::ApproveErc20;
    }

    if self.cursor <= Step::ApproveErc20 {
      self.enter(Step::ApproveErc20);
      let signer = self.wallet.signer()?;
      let hash = commit::approve(
        self.provider,
        signer,
        self.request.token,
        treasury,
        self.request.amount + self.request.tip,
      )
      .await?;
      self.approve_hash = Some(hash);
      self.cursor = Step::WaitApproveConfirmation;
    }

    if self.cursor <= Step::WaitApproveConfirmation {
      self.enter(Step::WaitApproveConfirmation);
      let hash = self
        .approve_hash
        .expect("approval submitted before its confirmation step");
      commit::await_success(self.provider, hash, "approval").await?;
      self.cursor = Step::PledgeContract;
    }

    if self.cursor <= Step::PledgeContract {
      self.enter(Step::PledgeContract);
      let signer = self.wallet.signer()?;
      match commit::pledge(
        self.provider,
        signer,
        self.request.token,
        treasury,
        donor,
        pledge_id,
        self.request.amount,
        self.request.tip,
      )
      .await
      {
        Ok(hash) => self.pledge_hash = Some(hash),
        Err(e) => {
          // the submission may have reached the chain even though the
          // error suggests otherwise; never make the donor pay twice
          if !self.claimed(treasury, pledge_id).await {
            return Err(e.into());
          }
          debug!("pledge {pledge_id} already claimed, reconciling");
        }
      }
      self.cursor = Step::WaitPledgeConfirmation;
    }

    if self.cursor <= Step::WaitPledgeConfirmation {
      self.enter(Step::WaitPledgeConfirmation);
      if let Some(hash) = self.pledge_hash {
        if let Err(e) =
          commit::await_success(self.provider, hash, "pledge").await
        {
          // a failed confirmation does not imply the pledge did not
          // mine; reconcile against the treasury before failing
          if !self.claimed(treasury, pledge_id).await {
            return Err(e.into());
          }
          debug!("pledge {pledge_id} mined despite confirm failure");
        }
      }
      self.cursor = Step::StorageComplete;
    }

    self.enter(Step::StorageComplete);
    let mut metadata = BTreeMap::new();
    metadata.insert(PLEDGE_ID_KEY.to_string(), pledge_id.to_string());
    metadata.insert("tip".to_string(), self.request.tip.to_string());
    let row = NewPayment {
      amount: self.request.amount,
      token: self.request.token_symbol.clone(),
      status: PaymentStatus::Confirmed,
      kind: PaymentKind::Buy,
      transaction_hash: self.pledge_hash,
      is_anonymous: self.request.is_anonymous,
      metadata,
      campaign_id: self.request.campaign_id,
      user_id: self.request.user_id,
    };
    let payment_id = match self.store.create_payment(row) {
      Ok(id) => id,
      // an earlier attempt already recorded this donation
      Err(StoreError::DuplicatePayment(_)) => self
        .store
        .payment_by_pledge(&pledge_id)?
        .map(|payment| payment.id)
        .ok_or_else(|| {
          StoreError::Corrupt("pledge indexed without payment row".into())
        })?,
      Err(e) => return Err(e.into()),
    };
    self.cursor = Step::Done;

    Ok(SettlementReceipt {
      payment_id,
      pledge_id,
      transaction_hash: self.pledge_hash,
    })
  }

  async fn claimed(&self, treasury: Address, pledge_id: PledgeId) -> bool {
    self
      .provider
      .pledge_claimed(treasury, pledge_id)
      .await
      .unwrap_or(false)
  }
}

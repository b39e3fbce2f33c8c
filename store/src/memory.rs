use {
  crate::{DeploymentJob, Store, StoreError, PLEDGE_ID_KEY},
  parking_lot::Mutex,
  patron_primitives::{
    Campaign,
    CampaignUpdate,
    NewPayment,
    Payment,
    PledgeId,
  },
  std::collections::{BTreeMap, HashMap},
};

#[derive(Default)]
struct State {
  campaigns: BTreeMap<u64, Campaign>,
  payments: BTreeMap<u64, Payment>,
  payments_by_pledge: HashMap<String, u64>,
  jobs: BTreeMap<u64, DeploymentJob>,
  next_payment_id: u64,
}

/// Ephemeral store for tests and dev scenarios.
#[derive(Default)]
pub struct InMemoryStore {
  state: Mutex<State>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Store for InMemoryStore {
  fn campaign(&self, id: u64) -> Result<Option<Campaign>, StoreError> {
    Ok(self.state.lock().campaigns.get(&id).cloned())
  }

  fn campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
    Ok(self.state.lock().campaigns.values().cloned().collect())
  }

  fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
    self.state.lock().campaigns.insert(campaign.id, campaign);
    Ok(())
  }

  fn update_campaign(
    &self,
    id: u64,
    update: CampaignUpdate,
  ) -> Result<Campaign, StoreError> {
    let mut state = self.state.lock();
    let campaign = state
      .campaigns
      .get_mut(&id)
      .ok_or(StoreError::CampaignNotFound(id))?;
    update.apply(campaign);
    Ok(campaign.clone())
  }

  fn create_payment(&self, payment: NewPayment) -> Result<u64, StoreError> {
    let mut state = self.state.lock();
    if let Some(pledge) = payment.metadata.get(PLEDGE_ID_KEY) {
      if state.payments_by_pledge.contains_key(pledge) {
        return Err(StoreError::DuplicatePayment(pledge.clone()));
      }
    }
    state.next_payment_id += 1;
    let id = state.next_payment_id;
    if let Some(pledge) = payment.metadata.get(PLEDGE_ID_KEY) {
      state.payments_by_pledge.insert(pledge.clone(), id);
    }
    state.payments.insert(id, payment.into_payment(id));
    Ok(id)
  }

  fn payment_by_pledge(
    &self,
    pledge_id: &PledgeId,
  ) -> Result<Option<Payment>, StoreError> {
    let state = self.state.lock();
    Ok(
      state
        .payments_by_pledge
        .get(&pledge_id.to_string())
        .and_then(|id| state.payments.get(id))
        .cloned(),
    )
  }

  fn deployment_job(
    &self,
    campaign_id: u64,
  ) -> Result<Option<DeploymentJob>, StoreError> {
    Ok(self.state.lock().jobs.get(&campaign_id).cloned())
  }

  fn put_deployment_job(&self, job: DeploymentJob) -> Result<(), StoreError> {
    self.state.lock().jobs.insert(job.campaign_id, job);
    Ok(())
  }
}

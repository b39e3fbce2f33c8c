use {
  crate::{DeploymentJob, Store, StoreError, PLEDGE_ID_KEY},
  patron_primitives::{
    Campaign,
    CampaignUpdate,
    NewPayment,
    Payment,
    PledgeId,
  },
  rmp_serde::{from_slice, to_vec},
  serde::{de::DeserializeOwned, Serialize},
  std::path::Path,
};

/// Sled-backed store. Records are rmp-serde encoded under big-endian
/// id keys, one tree per record type.
pub struct DiskStore {
  db: sled::Db,
  campaigns: sled::Tree,
  payments: sled::Tree,
  payments_by_pledge: sled::Tree,
  jobs: sled::Tree,
}

fn io_err(e: sled::Error) -> StoreError {
  StoreError::Io(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
  to_vec(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
  from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl DiskStore {
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    Self::from_db(sled::open(path).map_err(io_err)?)
  }

  /// Backed by a temporary directory that is removed on drop. Test and
  /// dry-run convenience.
  pub fn ephemeral() -> Result<Self, StoreError> {
    Self::from_db(
      sled::Config::new()
        .temporary(true)
        .open()
        .map_err(io_err)?,
    )
  }

  fn from_db(db: sled::Db) -> Result<Self, StoreError> {
    Ok(Self {
      campaigns: db.open_tree("campaigns").map_err(io_err)?,
      payments: db.open_tree("payments").map_err(io_err)?,
      payments_by_pledge: db
        .open_tree("payments-by-pledge")
        .map_err(io_err)?,
      jobs: db.open_tree("jobs").map_err(io_err)?,
      db,
    })
  }

  fn flush(&self) -> Result<(), StoreError> {
    self.db.flush().map_err(io_err)?;
    Ok(())
  }
}

impl Store for DiskStore {
  fn campaign(&self, id: u64) -> Result<Option<Campaign>, StoreError> {
    match self.campaigns.get(id.to_be_bytes()).map_err(io_err)? {
      Some(bytes) => Ok(Some(decode(&bytes)?)),
      None => Ok(None),
    }
  }

  fn campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
    self
      .campaigns
      .iter()
      .map(|entry| {
        let (_, bytes) = entry.map_err(io_err)?;
        decode(&bytes)
      })
      .collect()
  }

  fn insert_campaign(&self, campaign: Campaign) -> Result<(), StoreError> {
    self
      .campaigns
      .insert(campaign.id.to_be_bytes(), encode(&campaign)?)
      .map_err(io_err)?;
    self.flush()
  }

  fn update_campaign(
    &self,
    id: u64,
    update: CampaignUpdate,
  ) -> Result<Campaign, StoreError> {
    let mut campaign = self
      .campaign(id)?
      .ok_or(StoreError::CampaignNotFound(id))?;
    update.apply(&mut campaign);
    self
      .campaigns
      .insert(id.to_be_bytes(), encode(&campaign)?)
      .map_err(io_err)?;
    self.flush()?;
    Ok(campaign)
  }

  fn create_payment(&self, payment: NewPayment) -> Result<u64, StoreError> {
    if let Some(pledge) = payment.metadata.get(PLEDGE_ID_KEY) {
      if self
        .payments_by_pledge
        .contains_key(pledge.as_bytes())
        .map_err(io_err)?
      {
        return Err(StoreError::DuplicatePayment(pledge.clone()));
      }
    }
    let id = self.db.generate_id().map_err(io_err)?;
    if let Some(pledge) = payment.metadata.get(PLEDGE_ID_KEY) {
      self
        .payments_by_pledge
        .insert(pledge.as_bytes(), id.to_be_bytes().to_vec())
        .map_err(io_err)?;
    }
    self
      .payments
      .insert(id.to_be_bytes(), encode(&payment.into_payment(id))?)
      .map_err(io_err)?;
    self.flush()?;
    Ok(id)
  }

  fn payment_by_pledge(
    &self,
    pledge_id: &PledgeId,
  ) -> Result<Option<Payment>, StoreError> {
    let key = pledge_id.to_string();
    let Some(id_bytes) = self
      .payments_by_pledge
      .get(key.as_bytes())
      .map_err(io_err)?
    else {
      return Ok(None);
    };
    match self.payments.get(&id_bytes).map_err(io_err)? {
      Some(bytes) => Ok(Some(decode(&bytes)?)),
      None => Ok(None),
    }
  }

  fn deployment_job(
    &self,
    campaign_id: u64,
  ) -> Result<Option<DeploymentJob>, StoreError> {
    match self.jobs.get(campaign_id.to_be_bytes()).map_err(io_err)? {
      Some(bytes) => Ok(Some(decode(&bytes)?)),
      None => Ok(None),
    }
  }

  fn put_deployment_job(&self, job: DeploymentJob) -> Result<(), StoreError> {
    self
      .jobs
      .insert(job.campaign_id.to_be_bytes(), encode(&job)?)
      .map_err(io_err)?;
    self.flush()
  }
}

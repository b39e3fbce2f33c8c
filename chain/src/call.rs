use {
  patron_primitives::{Address, CampaignTiming, PledgeId, H256, U256},
  serde::{Deserialize, Serialize},
};

/// Fee and commission parameters written into a treasury during
/// configuration. Percentage fees are expressed in basis points, flat
/// fees in token base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryFees {
  pub flat_fee: U256,
  pub cumulative_flat_fee: U256,
  pub platform_fee_bps: u32,
  pub commission_bps: u32,
}

/// The typed submission surface of the platform contracts.
///
/// Every on-chain write in this workspace goes through one of these
/// variants; providers turn them into actual transactions. Keeping the
/// surface closed makes the in-process chain able to enforce the same
/// preconditions the deployed contracts do.
#[derive(Debug, Clone)]
pub enum Call {
  /// Campaign-factory creation. Emits a `CampaignCreated` event whose
  /// indexed topic carries the deployed campaign address.
  CreateCampaign {
    factory: Address,
    creator: Address,
    identifier_hash: H256,
    platform_hashes: Vec<H256>,
    data_keys: Vec<H256>,
    data_values: Vec<H256>,
    timing: CampaignTiming,
  },

  /// Treasury-factory deployment referencing a live campaign contract.
  DeployTreasury {
    factory: Address,
    platform_hash: H256,
    campaign: Address,
  },

  /// Writes timing and fee parameters into a freshly deployed treasury.
  /// Until this succeeds the treasury accepts no registrations.
  ConfigureTreasury {
    treasury: Address,
    timing: CampaignTiming,
    fees: TreasuryFees,
  },

  /// ERC-20 approval, signed by the donor.
  Approve {
    token: Address,
    spender: Address,
    amount: U256,
  },

  /// Allowance-gated pledge, signed by the donor after the approval
  /// confirmed.
  Pledge {
    treasury: Address,
    pledge_id: PledgeId,
    amount: U256,
    tip: U256,
  },

  /// Privileged pledge-id reservation, signed by the platform operator
  /// before the donor may sign anything.
  RegisterPledge {
    treasury: Address,
    pledge_id: PledgeId,
    donor: Address,
    amount: U256,
    tip: U256,
  },
}

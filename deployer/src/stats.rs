use {
  crate::deploy::{CampaignProvisioning, DeploymentResult, TreasuryOutcome},
  patron_chain::{classify, ErrorKind},
  std::{collections::BTreeMap, fmt::Write},
};

const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ErrorBucket {
  pub count: u64,
  pub examples: Vec<String>,
}

/// Append-only accumulator over one batch run.
///
/// Campaign and treasury outcomes are tracked separately, and every
/// failure lands in a per-category histogram with a few example
/// messages, so the end-of-run report can point at concrete
/// remediation per category instead of a wall of raw provider errors.
#[derive(Debug, Clone, Default)]
pub struct DeploymentStats {
  pub attempted: u64,
  pub campaigns_succeeded: u64,
  pub campaigns_failed: u64,
  pub treasuries_succeeded: u64,
  pub treasuries_failed: u64,
  pub treasuries_unconfigured: u64,
  pub errors_by_kind: BTreeMap<ErrorKind, ErrorBucket>,
}

impl DeploymentStats {
  pub fn record(&mut self, outcome: &CampaignProvisioning) {
    self.attempted += 1;
    if let Some(campaign) = &outcome.campaign {
      self.record_campaign(campaign);
    }
    if let Some(treasury) = &outcome.treasury {
      self.record_treasury(treasury);
    }
  }

  pub fn record_campaign(&mut self, result: &DeploymentResult) {
    if result.success {
      self.campaigns_succeeded += 1;
    } else {
      self.campaigns_failed += 1;
      self.record_error(
        result.error_kind.unwrap_or(ErrorKind::Unknown),
        result.error.as_deref().unwrap_or("unspecified failure"),
      );
    }
  }

  pub fn record_treasury(&mut self, outcome: &TreasuryOutcome) {
    if !outcome.result.success {
      self.treasuries_failed += 1;
      self.record_error(
        outcome.result.error_kind.unwrap_or(ErrorKind::Unknown),
        outcome
          .result
          .error
          .as_deref()
          .unwrap_or("unspecified failure"),
      );
    } else if outcome.configured {
      self.treasuries_succeeded += 1;
    } else {
      // deployed but unconfigured is its own terminal partial state
      self.treasuries_unconfigured += 1;
      if let Some(message) = &outcome.config_error {
        self.record_error(classify(message), message);
      }
    }
  }

  fn record_error(&mut self, kind: ErrorKind, message: &str) {
    let bucket = self.errors_by_kind.entry(kind).or_default();
    bucket.count += 1;
    if bucket.examples.len() < MAX_EXAMPLES {
      bucket.examples.push(message.to_string());
    }
  }

  /// Share of campaign deployments that succeeded, in percent.
  pub fn campaign_success_rate(&self) -> f64 {
    let total = self.campaigns_succeeded + self.campaigns_failed;
    if total == 0 {
      return 100.0;
    }
    self.campaigns_succeeded as f64 * 100.0 / total as f64
  }

  /// Human-readable end-of-run report with per-category remediation.
  pub fn report(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "deployment run: {} campaigns", self.attempted);
    let _ = writeln!(
      out,
      "  campaigns:  {} deployed, {} failed ({:.0}% success)",
      self.campaigns_succeeded,
      self.campaigns_failed,
      self.campaign_success_rate()
    );
    let _ = writeln!(
      out,
      "  treasuries: {} configured, {} unconfigured, {} failed",
      self.treasuries_succeeded,
      self.treasuries_unconfigured,
      self.treasuries_failed
    );
    if !self.errors_by_kind.is_empty() {
      let _ = writeln!(out, "  failures by category:");
      for (kind, bucket) in &self.errors_by_kind {
        let _ = writeln!(out, "    {kind}: {}", bucket.count);
        if let Some(example) = bucket.examples.first() {
          let _ = writeln!(out, "      e.g. {example}");
        }
        let _ = writeln!(out, "      fix: {}", kind.remediation());
      }
    }
    out
  }
}

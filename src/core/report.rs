pub use crate::domain::model::{CampaignSummary, Failure};
use crate::domain::model::DeliveryOutcome;

/// Running tally for one campaign. Outcomes are only ever appended.
#[derive(Debug, Default)]
pub struct CampaignReport {
    sent: usize,
    failed: usize,
    failures: Vec<Failure>,
}

impl CampaignReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent { .. } => self.sent += 1,
            DeliveryOutcome::Failed { address, reason } => {
                self.failed += 1;
                self.failures.push(Failure {
                    address: address.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// Number of outcomes recorded so far.
    pub fn recorded(&self) -> usize {
        self.sent + self.failed
    }

    /// Copy of the tally as it stands, for surfacing a run that stopped early.
    pub fn snapshot(&self) -> CampaignSummary {
        CampaignSummary {
            sent: self.sent,
            failed: self.failed,
            failures: self.failures.clone(),
        }
    }

    pub fn finalize(self) -> CampaignSummary {
        CampaignSummary {
            sent: self.sent,
            failed: self.failed,
            failures: self.failures,
        }
    }
}

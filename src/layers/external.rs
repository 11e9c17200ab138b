// 🛰️ Layer 2 - External Verification
// Agreement across a panel of independent confirming sources.

use super::{percentage, LayerEvidence, LayerId, LayerResult};
use crate::collaborators::{consult_verifiers, VerifierPanel};
use crate::config::CallPolicy;
use crate::record::Record;
use crate::status::agreement_score;
use tracing::warn;

pub struct ExternalVerification {
    panel: VerifierPanel,
    policy: CallPolicy,
}

impl ExternalVerification {
    pub fn new(panel: VerifierPanel, policy: CallPolicy, expected_sources: usize) -> Self {
        if panel.len() < expected_sources {
            warn!(
                configured = panel.len(),
                expected = expected_sources,
                "External verification panel is smaller than expected"
            );
        }

        ExternalVerification { panel, policy }
    }

    pub fn source_count(&self) -> usize {
        self.panel.len()
    }

    /// Consult every source and score the agreement
    pub async fn run(&self, record: &Record) -> LayerResult {
        let sources = consult_verifiers(&self.panel, record, &self.policy).await;

        let valid = sources.iter().filter(|s| s.valid).count();
        let agreement_percentage = percentage(valid, sources.len());

        // No valid source at all (including an empty panel) scores 0, not 50
        let score = if valid == 0 {
            0.0
        } else {
            agreement_score(agreement_percentage)
        };

        LayerResult::new(
            LayerId::External,
            score,
            LayerEvidence::External {
                sources,
                agreement_percentage,
            },
        )
    }
}

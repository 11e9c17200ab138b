// 🔁 Layer 3 - Reproducibility Test
// Would independent public indices surface the same fact?

use super::{percentage, LayerEvidence, LayerId, LayerResult};
use crate::collaborators::{consult_indices, IndexPanel};
use crate::config::CallPolicy;
use crate::record::Record;
use crate::status::agreement_score;
use tracing::warn;

pub struct ReproducibilityTest {
    panel: IndexPanel,
    policy: CallPolicy,
}

impl ReproducibilityTest {
    pub fn new(panel: IndexPanel, policy: CallPolicy, expected_indices: usize) -> Self {
        if panel.len() < expected_indices {
            warn!(
                configured = panel.len(),
                expected = expected_indices,
                "Reproducibility panel is smaller than expected"
            );
        }

        ReproducibilityTest { panel, policy }
    }

    pub fn index_count(&self) -> usize {
        self.panel.len()
    }

    pub async fn run(&self, record: &Record) -> LayerResult {
        let indices = consult_indices(&self.panel, record, &self.policy).await;

        let findable = indices.iter().filter(|i| i.findable).count();
        let reproducibility_percentage = percentage(findable, indices.len());

        let score = if indices.is_empty() {
            0.0
        } else {
            agreement_score(reproducibility_percentage)
        };

        LayerResult::new(
            LayerId::Reproducibility,
            score,
            LayerEvidence::Reproducibility {
                indices,
                reproducibility_percentage,
            },
        )
    }
}

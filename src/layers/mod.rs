// Validation Layers
//
// Three independent checks applied in fixed order:
// 1. Internal verification (record alone)
// 2. External verification (panel of confirming sources)
// 3. Reproducibility (panel of public indices)
//
// Each layer produces a LayerResult; the gate turns it into a LayerOutcome
// that either lets the cascade continue or rejects the record.

pub mod external;
pub mod internal;
pub mod reproducibility;

pub use external::ExternalVerification;
pub use internal::InternalVerification;
pub use reproducibility::ReproducibilityTest;

use crate::collaborators::{ExternalSourceResult, IndexLookup};
use crate::status::LAYER_GATE;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LAYER IDENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    Internal,
    External,
    Reproducibility,
}

impl LayerId {
    pub fn number(&self) -> u8 {
        match self {
            LayerId::Internal => 1,
            LayerId::External => 2,
            LayerId::Reproducibility => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerId::Internal => "Internal Verification",
            LayerId::External => "External Verification",
            LayerId::Reproducibility => "Reproducibility Test",
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(LayerId::Internal),
            2 => Some(LayerId::External),
            3 => Some(LayerId::Reproducibility),
            _ => None,
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer {} ({})", self.number(), self.name())
    }
}

// ============================================================================
// LAYER RESULT
// ============================================================================

/// A named sub-check inside a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCheck {
    pub name: String,
    pub score: f64,
    pub detail: serde_json::Value,
}

impl SubCheck {
    pub fn new(name: &str, score: f64, detail: serde_json::Value) -> Self {
        SubCheck {
            name: name.to_string(),
            score: clamp_score(score),
            detail,
        }
    }
}

/// Supporting evidence, shaped per layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerEvidence {
    Internal {
        checks: Vec<SubCheck>,
    },
    External {
        sources: Vec<ExternalSourceResult>,
        agreement_percentage: f64,
    },
    Reproducibility {
        indices: Vec<IndexLookup>,
        reproducibility_percentage: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    pub layer: LayerId,
    pub name: String,
    /// Always within [0, 100]
    pub score: f64,
    pub evidence: LayerEvidence,
}

impl LayerResult {
    pub fn new(layer: LayerId, score: f64, evidence: LayerEvidence) -> Self {
        LayerResult {
            layer,
            name: layer.name().to_string(),
            score: clamp_score(score),
            evidence,
        }
    }

    pub fn passes_gate(&self) -> bool {
        self.score >= LAYER_GATE
    }

    /// Apply the < 75 early-exit rule
    pub fn gate(self) -> LayerOutcome {
        if self.passes_gate() {
            LayerOutcome::Continue(self)
        } else {
            LayerOutcome::Reject(self)
        }
    }
}

// ============================================================================
// LAYER OUTCOME
// ============================================================================

/// What the cascade does after a layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutcome {
    /// Score reached the gate; run the next layer
    Continue(LayerResult),
    /// Score fell below the gate; the record is rejected with this score
    Reject(LayerResult),
}

impl LayerOutcome {
    pub fn result(&self) -> &LayerResult {
        match self {
            LayerOutcome::Continue(result) | LayerOutcome::Reject(result) => result,
        }
    }

    pub fn into_result(self) -> LayerResult {
        match self {
            LayerOutcome::Continue(result) | LayerOutcome::Reject(result) => result,
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, LayerOutcome::Reject(_))
    }
}

/// Keep a score inside [0, 100]; NaN becomes 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// `part / whole * 100`, or 0 when nothing was consulted
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

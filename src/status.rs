// 🏅 Validation Status - terminal classification bands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every layer must reach this score to let the cascade continue
pub const LAYER_GATE: f64 = 75.0;

pub const GOLD_THRESHOLD: f64 = 95.0;
pub const SILVER_THRESHOLD: f64 = 85.0;
pub const BRONZE_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// ≥ 95: release
    Gold,
    /// 85 to < 95: release
    Silver,
    /// 75 to < 85: needs review
    Bronze,
    /// < 75: destroy
    Rejected,
}

impl ValidationStatus {
    /// Classify a final score into its band
    pub fn classify(score: f64) -> Self {
        if score >= GOLD_THRESHOLD {
            ValidationStatus::Gold
        } else if score >= SILVER_THRESHOLD {
            ValidationStatus::Silver
        } else if score >= BRONZE_THRESHOLD {
            ValidationStatus::Bronze
        } else {
            // Also the landing spot for NaN
            ValidationStatus::Rejected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Gold => "GOLD",
            ValidationStatus::Silver => "SILVER",
            ValidationStatus::Bronze => "BRONZE",
            ValidationStatus::Rejected => "REJECTED",
        }
    }

    /// GOLD and SILVER may be released externally
    pub fn is_exportable(&self) -> bool {
        matches!(self, ValidationStatus::Gold | ValidationStatus::Silver)
    }

    /// Anything not rejected is kept in the releasable partition
    pub fn is_retained(&self) -> bool {
        !self.is_rejected()
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationStatus::Rejected)
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an agreement / findability percentage to a layer score
///
/// Shared by the external verification and reproducibility layers.
pub fn agreement_score(percentage: f64) -> f64 {
    if percentage >= 95.0 {
        99.0
    } else if percentage >= 80.0 {
        90.0
    } else if percentage >= 60.0 {
        75.0
    } else {
        50.0
    }
}

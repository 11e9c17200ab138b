// 🧾 Validation Report - full record of one validation run
// Plus the batch report aggregating many runs.

use crate::audit::AuditEntry;
use crate::layers::{LayerId, LayerResult};
use crate::record::Record;
use crate::status::ValidationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validation_id: u64,
    pub record: Record,
    pub record_fingerprint: String,
    pub validated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_1: Option<LayerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_2: Option<LayerResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_3: Option<LayerResult>,

    pub final_score: f64,
    pub final_status: ValidationStatus,

    /// Layer that rejected the record by early exit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<LayerId>,

    pub audit_trail: Vec<AuditEntry>,
}

impl ValidationReport {
    pub fn is_exportable(&self) -> bool {
        self.final_status.is_exportable()
    }

    pub fn is_rejected(&self) -> bool {
        self.final_status.is_rejected()
    }

    pub fn layer(&self, layer: LayerId) -> Option<&LayerResult> {
        match layer {
            LayerId::Internal => self.layer_1.as_ref(),
            LayerId::External => self.layer_2.as_ref(),
            LayerId::Reproducibility => self.layer_3.as_ref(),
        }
    }

    pub fn layers_executed(&self) -> usize {
        self.audit_trail.len()
    }

    pub fn summary(&self) -> String {
        let layers: Vec<String> = [
            LayerId::Internal,
            LayerId::External,
            LayerId::Reproducibility,
        ]
        .into_iter()
        .filter_map(|id| self.layer(id))
        .map(|l| format!("L{}={:.1}", l.layer.number(), l.score))
        .collect();

        let mut summary = format!(
            "{}: {} ({:.1}) [{}]",
            self.record.identity(),
            self.final_status,
            self.final_score,
            layers.join(", ")
        );
        if let Some(layer) = self.rejected_at {
            summary.push_str(&format!(" rejected at {}", layer));
        }
        summary
    }
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub gold: usize,
    pub silver: usize,
    pub bronze: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn from_reports(reports: &[ValidationReport]) -> Self {
        let mut counts = StatusCounts::default();
        for report in reports {
            match report.final_status {
                ValidationStatus::Gold => counts.gold += 1,
                ValidationStatus::Silver => counts.silver += 1,
                ValidationStatus::Bronze => counts.bronze += 1,
                ValidationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.gold + self.silver + self.bronze + self.rejected
    }

    pub fn releasable(&self) -> usize {
        self.gold + self.silver
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub session_id: String,
    pub report_timestamp: DateTime<Utc>,
    pub total_data_points: usize,
    pub statistics: StatusCounts,
    pub average_score: f64,
    pub validation_results: Vec<ValidationReport>,
    pub audit_log: Vec<AuditEntry>,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} gold, {} silver, {} bronze, {} rejected | average score {:.1}",
            self.total_data_points,
            self.statistics.gold,
            self.statistics.silver,
            self.statistics.bronze,
            self.statistics.rejected,
            self.average_score
        )
    }
}

pub fn average_score(reports: &[ValidationReport]) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(|r| r.final_score).sum::<f64>() / reports.len() as f64
}

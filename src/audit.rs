// 📜 Audit Trail - one entry per executed layer
// Append-only: entries are never edited or removed.

use crate::layers::LayerResult;
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Sequence number of the validation call within its session
    pub validation_id: u64,
    pub layer: u8,
    /// The record's address, or "unknown"
    pub record_id: String,
    pub score: f64,
}

impl AuditEntry {
    pub fn for_layer(validation_id: u64, record: &Record, result: &LayerResult) -> Self {
        AuditEntry {
            timestamp: Utc::now(),
            validation_id,
            layer: result.layer.number(),
            record_id: record.identity().to_string(),
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one validation call, in execution order
    pub fn for_validation(&self, validation_id: u64) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.validation_id == validation_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerEvidence, LayerId};

    fn layer_result(layer: LayerId, score: f64) -> LayerResult {
        LayerResult::new(
            layer,
            score,
            LayerEvidence::Reproducibility {
                indices: vec![],
                reproducibility_percentage: 0.0,
            },
        )
    }

    #[test]
    fn test_entry_uses_record_identity() {
        let result = layer_result(LayerId::External, 90.0);

        let entry = AuditEntry::for_layer(7, &Record::new("1094 Riverside Drive"), &result);
        assert_eq!(entry.layer, 2);
        assert_eq!(entry.record_id, "1094 Riverside Drive");
        assert_eq!(entry.validation_id, 7);
        assert_eq!(entry.score, 90.0);

        let entry = AuditEntry::for_layer(8, &Record::default(), &result);
        assert_eq!(entry.record_id, "unknown");
    }

    #[test]
    fn test_log_keeps_order_per_validation() {
        let mut log = AuditLog::new();
        let record = Record::new("1 Main St");

        log.append(AuditEntry::for_layer(1, &record, &layer_result(LayerId::Internal, 96.0)));
        log.append(AuditEntry::for_layer(2, &record, &layer_result(LayerId::Internal, 40.0)));
        log.append(AuditEntry::for_layer(1, &record, &layer_result(LayerId::External, 99.0)));

        assert_eq!(log.len(), 3);
        let first: Vec<u8> = log.for_validation(1).iter().map(|e| e.layer).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(log.for_validation(2).len(), 1);
    }
}

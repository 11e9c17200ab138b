// ✅ Triple-Check Validator - the layer cascade
//
// LAYER1 -> LAYER2 -> LAYER3 -> SCORED, with REJECTED reachable from each
// layer. A layer is audited as soon as it completes; the report enters
// the ledger only once it reaches a terminal status.

use crate::audit::AuditEntry;
use crate::collaborators::{IndexPanel, VerifierPanel};
use crate::config::{LayerWeights, ValidatorConfig};
use crate::error::ConfigError;
use crate::layers::{
    clamp_score, ExternalVerification, InternalVerification, LayerId, LayerOutcome, LayerResult,
    ReproducibilityTest,
};
use crate::record::Record;
use crate::report::{average_score, BatchReport, StatusCounts, ValidationReport};
use crate::session::ValidationSession;
use crate::status::ValidationStatus;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

pub struct TripleCheckValidator {
    weights: LayerWeights,
    batch_concurrency: usize,
    internal: InternalVerification,
    external: ExternalVerification,
    reproducibility: ReproducibilityTest,
}

impl TripleCheckValidator {
    pub fn new(
        config: ValidatorConfig,
        verifiers: VerifierPanel,
        indices: IndexPanel,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let validator = TripleCheckValidator {
            weights: config.weights,
            batch_concurrency: config.batch_concurrency,
            internal: InternalVerification::new(config.authoritative_sources),
            external: ExternalVerification::new(
                verifiers,
                config.call_policy,
                config.min_external_sources,
            ),
            reproducibility: ReproducibilityTest::new(
                indices,
                config.call_policy,
                config.min_reproducibility_indices,
            ),
        };

        info!(
            sources = validator.external.source_count(),
            indices = validator.reproducibility.index_count(),
            "Validator ready"
        );
        Ok(validator)
    }

    /// Validate one record through all three layers
    ///
    /// Never fails: the worst outcome is REJECTED with an audit trail.
    /// Dropping the returned future abandons the layer in flight without
    /// auditing it, and the report never reaches the ledger.
    pub async fn validate(&self, session: &ValidationSession, record: &Record) -> ValidationReport {
        let mut cascade = Cascade::start(session, record);

        // LAYER 1: internal verification
        if let Some(rejected) = cascade.advance(self.internal.run(record).gate()) {
            return cascade.reject(rejected);
        }

        // LAYER 2: external verification
        if let Some(rejected) = cascade.advance(self.external.run(record).await.gate()) {
            return cascade.reject(rejected);
        }

        // LAYER 3: reproducibility
        if let Some(rejected) = cascade.advance(self.reproducibility.run(record).await.gate()) {
            return cascade.reject(rejected);
        }

        cascade.score(&self.weights)
    }

    /// Validate many records concurrently; reports keep input order
    pub async fn validate_batch(
        &self,
        session: &ValidationSession,
        records: &[Record],
    ) -> Vec<ValidationReport> {
        stream::iter(records)
            .map(|record| self.validate(session, record))
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    /// Validate a batch and summarize it with the session's audit log
    pub async fn generate_validation_report(
        &self,
        session: &ValidationSession,
        records: &[Record],
    ) -> BatchReport {
        let results = self.validate_batch(session, records).await;
        let statistics = StatusCounts::from_reports(&results);

        let report = BatchReport {
            session_id: session.id().to_string(),
            report_timestamp: Utc::now(),
            total_data_points: records.len(),
            statistics,
            average_score: average_score(&results),
            validation_results: results,
            audit_log: session.audit_entries(),
        };

        info!(session = session.id(), "{}", report.summary());
        report
    }
}

// ============================================================================
// CASCADE STATE
// ============================================================================

/// In-progress validation of one record
struct Cascade<'a> {
    session: &'a ValidationSession,
    record: &'a Record,
    validation_id: u64,
    layer_1: Option<LayerResult>,
    layer_2: Option<LayerResult>,
    layer_3: Option<LayerResult>,
    audit_trail: Vec<AuditEntry>,
}

impl<'a> Cascade<'a> {
    fn start(session: &'a ValidationSession, record: &'a Record) -> Self {
        Cascade {
            session,
            record,
            validation_id: session.next_validation_id(),
            layer_1: None,
            layer_2: None,
            layer_3: None,
            audit_trail: Vec::with_capacity(3),
        }
    }

    /// Audit a completed layer and keep its result
    ///
    /// Returns the rejecting layer and its score when the gate failed.
    fn advance(&mut self, outcome: LayerOutcome) -> Option<(LayerId, f64)> {
        let entry = AuditEntry::for_layer(self.validation_id, self.record, outcome.result());
        self.session.append_audit(entry.clone());
        self.audit_trail.push(entry);

        let rejected = outcome.is_reject();
        let result = outcome.into_result();
        let (layer, score) = (result.layer, result.score);

        debug!(
            validation_id = self.validation_id,
            record = self.record.identity(),
            layer = layer.number(),
            score,
            rejected,
            "Layer complete"
        );

        match layer {
            LayerId::Internal => self.layer_1 = Some(result),
            LayerId::External => self.layer_2 = Some(result),
            LayerId::Reproducibility => self.layer_3 = Some(result),
        }

        rejected.then_some((layer, score))
    }

    /// Early exit: the final score is the rejecting layer's score
    fn reject(self, (layer, score): (LayerId, f64)) -> ValidationReport {
        self.finish(score, ValidationStatus::Rejected, Some(layer))
    }

    /// All three layers passed: weighted composite, then classification
    fn score(self, weights: &LayerWeights) -> ValidationReport {
        let score_of = |layer: &Option<LayerResult>| layer.as_ref().map_or(0.0, |r| r.score);

        let composite = clamp_score(weights.composite(
            score_of(&self.layer_1),
            score_of(&self.layer_2),
            score_of(&self.layer_3),
        ));

        let status = ValidationStatus::classify(composite);
        if status.is_rejected() {
            warn!(
                validation_id = self.validation_id,
                composite,
                weight_sum = weights.sum(),
                "All layers passed but the composite fell below the gate"
            );
        }

        self.finish(composite, status, None)
    }

    fn finish(
        self,
        final_score: f64,
        final_status: ValidationStatus,
        rejected_at: Option<LayerId>,
    ) -> ValidationReport {
        let report = ValidationReport {
            validation_id: self.validation_id,
            record_fingerprint: self.record.fingerprint(),
            record: self.record.clone(),
            validated_at: Utc::now(),
            layer_1: self.layer_1,
            layer_2: self.layer_2,
            layer_3: self.layer_3,
            final_score,
            final_status,
            rejected_at,
            audit_trail: self.audit_trail,
        };

        if !self.session.commit(report.clone()) {
            warn!(
                validation_id = report.validation_id,
                "Report was already in the ledger"
            );
        }

        info!(
            validation_id = report.validation_id,
            record = report.record.identity(),
            status = %report.final_status,
            score = report.final_score,
            "Validation complete"
        );

        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{
        fast_policy, index_panel, verifier_panel, FixedIndex, FixedVerifier, SlowVerifier,
    };
    use crate::collaborators::{ExternalVerifier, ReproducibilityIndex};
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> ValidatorConfig {
        ValidatorConfig {
            call_policy: fast_policy(),
            ..ValidatorConfig::default()
        }
    }

    fn validator(valid: usize, findable: usize) -> TripleCheckValidator {
        TripleCheckValidator::new(config(), verifier_panel(valid, 5), index_panel(findable, 7))
            .unwrap()
    }

    fn complete_record() -> Record {
        Record::new("1094 Riverside Drive")
            .with_city("Port St. Lucie")
            .with_state("FL")
            .with_postal_code("34984")
            .with_source("County Assessor")
            .with_timestamp("2025-01-15T10:30:00")
    }

    /// Drop every timestamp so two runs can be compared
    fn without_timestamps(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                map.remove("timestamp");
                map.remove("validated_at");
                map.values_mut().for_each(without_timestamps);
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(without_timestamps),
            _ => {}
        }
    }

    #[tokio::test]
    async fn test_gold_scenario() {
        let session = ValidationSession::new();
        let report = validator(5, 7).validate(&session, &complete_record()).await;

        println!("Report: {}", report.summary());

        assert!((report.layer_1.as_ref().unwrap().score - 96.333).abs() < 1e-2);
        assert_eq!(report.layer_2.as_ref().unwrap().score, 99.0);
        assert_eq!(report.layer_3.as_ref().unwrap().score, 99.0);
        assert!((report.final_score - 98.12).abs() < 1e-9);
        assert_eq!(report.final_status, ValidationStatus::Gold);
        assert_eq!(report.rejected_at, None);
        assert_eq!(report.audit_trail.len(), 3);
        assert_eq!(report.layers_executed(), 3);
        assert!(report.is_exportable());

        assert_eq!(session.exportable().len(), 1);
        assert!(session.rejected().is_empty());
        assert_eq!(session.audit_entries().len(), 3);
    }

    #[tokio::test]
    async fn test_record_without_location_is_rejected() {
        let session = ValidationSession::new();
        let record = Record {
            address: None,
            city: None,
            state: None,
            ..complete_record().with_source("HUD")
        };

        let report = validator(5, 7).validate(&session, &record).await;

        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(report.rejected_at, Some(LayerId::Internal));
        assert!((report.final_score - 49.666_666).abs() < 1e-3);
        assert_eq!(report.layers_executed(), 1);
        assert_eq!(report.audit_trail[0].record_id, "unknown");
        assert!(session.exportable().is_empty());
    }

    #[tokio::test]
    async fn test_layer_one_rejection_skips_collaborators() {
        let verifier = Arc::new(FixedVerifier::new("USPS", true));
        let index = Arc::new(FixedIndex::new("Zillow", true));
        let validator = TripleCheckValidator::new(
            config(),
            vec![verifier.clone() as Arc<dyn ExternalVerifier>],
            vec![index.clone() as Arc<dyn ReproducibilityIndex>],
        )
        .unwrap();

        let record = Record {
            address: Some("  ".to_string()),
            ..complete_record().with_source("Random Blog")
        };

        let session = ValidationSession::new();
        let report = validator.validate(&session, &record).await;

        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(report.rejected_at, Some(LayerId::Internal));
        assert_eq!(report.final_score, report.layer_1.as_ref().unwrap().score);
        assert!(report.final_score < 75.0);
        assert_eq!(report.audit_trail.len(), 1);
        assert!(report.layer_2.is_none() && report.layer_3.is_none());
        assert_eq!(verifier.calls(), 0);
        assert_eq!(index.calls(), 0);
        assert_eq!(session.rejected().len(), 1);
    }

    #[tokio::test]
    async fn test_layer_two_rejection() {
        let session = ValidationSession::new();
        let report = validator(2, 7).validate(&session, &complete_record()).await;

        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(report.rejected_at, Some(LayerId::External));
        assert_eq!(report.final_score, 50.0);
        assert_eq!(report.audit_trail.len(), 2);
        assert!(report.layer_3.is_none());
    }

    #[tokio::test]
    async fn test_layer_three_rejection() {
        let session = ValidationSession::new();
        let report = validator(5, 4).validate(&session, &complete_record()).await;

        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(report.rejected_at, Some(LayerId::Reproducibility));
        assert_eq!(report.final_score, 50.0);
        assert_eq!(report.audit_trail.len(), 3);
        let layers: Vec<u8> = report.audit_trail.iter().map(|e| e.layer).collect();
        assert_eq!(layers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sixty_percent_agreement_is_not_early_exit() {
        let session = ValidationSession::new();
        let report = validator(3, 7).validate(&session, &complete_record()).await;

        assert_eq!(report.layer_2.as_ref().unwrap().score, 75.0);
        assert!(report.layer_3.is_some());
        assert_eq!(report.rejected_at, None);
        assert!((report.final_score - 90.2).abs() < 1e-9);
        assert_eq!(report.final_status, ValidationStatus::Silver);
    }

    #[tokio::test]
    async fn test_composite_fallthrough_with_degenerate_weights() {
        let mut config = config();
        config.weights = LayerWeights {
            internal: 0.25,
            external: 0.25,
            reproducibility: 0.25,
        };
        let validator =
            TripleCheckValidator::new(config, verifier_panel(5, 5), index_panel(7, 7)).unwrap();

        let session = ValidationSession::new();
        let report = validator.validate(&session, &complete_record()).await;

        assert_eq!(report.audit_trail.len(), 3);
        assert_eq!(report.rejected_at, None);
        assert!(report.final_score < 75.0);
        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(session.rejected().len(), 1);
        assert!(session.with_ledger(|l| l.releasable().is_empty()));
    }

    #[tokio::test]
    async fn test_bronze_is_retained_but_not_exportable() {
        let mut record = complete_record();
        record.postal_code = None;
        record.timestamp = None;

        let session = ValidationSession::new();
        let report = validator(3, 5).validate(&session, &record).await;

        // L1 = (99 + 66.7 + 90) / 3 = 85.2, L2 = 75, L3 = 75
        assert_eq!(report.final_status, ValidationStatus::Bronze);
        assert!(!report.is_exportable());
        session.with_ledger(|ledger| {
            assert_eq!(ledger.releasable().len(), 1);
            assert_eq!(ledger.needs_review().len(), 1);
            assert!(ledger.exportable().is_empty());
        });
    }

    #[tokio::test]
    async fn test_identical_inputs_give_identical_reports() {
        let validator = validator(4, 6);
        let record = complete_record();

        let first = validator.validate(&ValidationSession::new(), &record).await;
        let second = validator.validate(&ValidationSession::new(), &record).await;

        let mut a = serde_json::to_value(&first).unwrap();
        let mut b = serde_json::to_value(&second).unwrap();
        without_timestamps(&mut a);
        without_timestamps(&mut b);

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn test_scores_stay_in_range() {
        let records = vec![
            complete_record(),
            Record::default(),
            Record::new(""),
            complete_record().with_source("HUD").with_field("x", serde_json::json!(1)),
        ];

        for (valid, findable) in [(0, 0), (5, 7), (3, 5), (5, 0)] {
            let validator = validator(valid, findable);
            let session = ValidationSession::new();
            for record in &records {
                let report = validator.validate(&session, record).await;
                assert!((0.0..=100.0).contains(&report.final_score));
                assert!((1..=3).contains(&report.audit_trail.len()));
            }
        }
    }

    #[tokio::test]
    async fn test_unresponsive_sources_do_not_fault() {
        let panel: VerifierPanel = (0..5)
            .map(|i| {
                Arc::new(SlowVerifier {
                    name: format!("slow-{}", i),
                    delay: Duration::from_secs(10),
                }) as Arc<dyn ExternalVerifier>
            })
            .collect();
        let mut config = config();
        config.call_policy.timeout_ms = 10;
        config.call_policy.max_retries = 0;
        let validator = TripleCheckValidator::new(config, panel, index_panel(7, 7)).unwrap();

        let session = ValidationSession::new();
        let report = validator.validate(&session, &complete_record()).await;

        assert_eq!(report.final_status, ValidationStatus::Rejected);
        assert_eq!(report.rejected_at, Some(LayerId::External));
        assert_eq!(report.final_score, 0.0);
    }

    #[tokio::test]
    async fn test_cancelled_validation_leaves_no_partial_layer() {
        let panel: VerifierPanel = vec![Arc::new(SlowVerifier {
            name: "slow".to_string(),
            delay: Duration::from_secs(10),
        })];
        let mut config = config();
        config.call_policy.timeout_ms = 60_000;
        let validator = TripleCheckValidator::new(config, panel, index_panel(7, 7)).unwrap();

        let session = ValidationSession::new();
        let record = complete_record();
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            validator.validate(&session, &record),
        )
        .await;

        assert!(outcome.is_err());
        let entries = session.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].layer, 1);
        assert!(session.with_ledger(|l| l.is_empty()));
    }

    #[tokio::test]
    async fn test_batch_report() {
        let validator = validator(5, 7);
        let session = ValidationSession::new();
        let records = vec![
            complete_record(),
            Record::new("5632 Lakewood Avenue")
                .with_city("Cleveland")
                .with_state("OH")
                .with_postal_code("44114")
                .with_source("HUD")
                .with_timestamp("2025-01-15T10:30:00"),
            Record::new(" ").with_source("Unknown Blog"),
        ];

        let batch = validator.generate_validation_report(&session, &records).await;

        println!("Batch summary: {}", batch.summary());

        assert_eq!(batch.total_data_points, 3);
        assert_eq!(batch.statistics.gold, 2);
        assert_eq!(batch.statistics.rejected, 1);
        assert_eq!(batch.validation_results[1].record.identity(), "5632 Lakewood Avenue");
        assert_eq!(batch.audit_log.len(), 3 + 3 + 1);
        assert_eq!(batch.session_id, session.id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_validations_share_one_session() {
        let validator = Arc::new(validator(5, 7));
        let session = Arc::new(ValidationSession::new());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let validator = Arc::clone(&validator);
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let record = if i % 4 == 0 {
                        Record::new("").with_source("nobody")
                    } else {
                        complete_record()
                    };
                    validator.validate(&session, &record).await
                })
            })
            .collect();

        let mut trail_total = 0;
        for handle in handles {
            trail_total += handle.await.unwrap().audit_trail.len();
        }

        assert_eq!(session.audit_entries().len(), trail_total);
        session.with_ledger(|ledger| {
            assert_eq!(ledger.len(), 32);
            assert_eq!(ledger.rejected().len(), 8);
            assert_eq!(ledger.exportable().len(), 24);
        });
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let mut config = config();
        config.weights.internal = 0.9;
        assert!(matches!(
            TripleCheckValidator::new(config, vec![], vec![]),
            Err(ConfigError::WeightsExceedOne(_))
        ));
    }
}

// 🔍 Layer 1 - Internal Verification
// Scores the record on its own: source authenticity, structural
// completeness, content sanity. Layer score is the unweighted mean.

use super::{percentage, LayerEvidence, LayerId, LayerResult, SubCheck};
use crate::record::Record;
use serde_json::json;

const AUTHENTIC_SCORE: f64 = 99.0;
const SANITY_BASE: f64 = 90.0;
const BLANK_FIELD_PENALTY: f64 = 50.0;

pub struct InternalVerification {
    /// Known authoritative sources (substring match)
    authoritative_sources: Vec<String>,
}

impl InternalVerification {
    pub fn new(authoritative_sources: Vec<String>) -> Self {
        InternalVerification {
            authoritative_sources,
        }
    }

    /// Run all three sub-checks
    pub fn run(&self, record: &Record) -> LayerResult {
        let checks = vec![
            self.check_source_authenticity(record),
            self.check_completeness(record),
            self.check_content_sanity(record),
        ];

        let score = checks.iter().map(|c| c.score).sum::<f64>() / checks.len() as f64;

        LayerResult::new(LayerId::Internal, score, LayerEvidence::Internal { checks })
    }

    // ========================================================================
    // SUB-CHECKS
    // ========================================================================

    /// Binary: 99 when the claimed source names an authoritative source
    fn check_source_authenticity(&self, record: &Record) -> SubCheck {
        let source = record.source.as_deref().unwrap_or("");

        let matched = self
            .authoritative_sources
            .iter()
            .find(|auth| !auth.is_empty() && source.contains(auth.as_str()));

        SubCheck::new(
            "source_authenticity",
            if matched.is_some() { AUTHENTIC_SCORE } else { 0.0 },
            json!({
                "source": source,
                "is_authentic": matched.is_some(),
                "matched": matched,
            }),
        )
    }

    /// Share of the six required fields that are present
    fn check_completeness(&self, record: &Record) -> SubCheck {
        let fields = record.required_fields();
        let present = fields.iter().filter(|(_, present)| *present).count();
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, present)| !*present)
            .map(|(name, _)| *name)
            .collect();

        SubCheck::new(
            "structural_completeness",
            percentage(present, fields.len()),
            json!({
                "present": present,
                "required": fields.len(),
                "missing": missing,
            }),
        )
    }

    /// 90, minus 50 for each blank or absent address/city/state, floored at 0
    fn check_content_sanity(&self, record: &Record) -> SubCheck {
        let blank: Vec<&str> = [
            ("address", &record.address),
            ("city", &record.city),
            ("state", &record.state),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

        let score = (SANITY_BASE - BLANK_FIELD_PENALTY * blank.len() as f64).max(0.0);

        SubCheck::new("content_sanity", score, json!({ "blank_fields": blank }))
    }
}

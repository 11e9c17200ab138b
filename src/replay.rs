// 📼 Replay Collaborators - answers from previously collected evidence
//
// An evidence file lists, per source and per index, the addresses it
// confirmed when the evidence was gathered. Lookups are answered from that
// list, so the engine can run offline and deterministically.
//
// {
//   "sources": [{"name": "USPS", "confidence": 99, "reference": "...", "confirms": ["..."]}],
//   "indices": [{"name": "Zillow", "lists": ["..."]}]
// }

use crate::collaborators::{
    ExternalSourceResult, ExternalVerifier, IndexPanel, ReproducibilityIndex, VerifierPanel,
};
use crate::error::CollaboratorError;
use crate::record::Record;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub sources: Vec<SourceEvidence>,
    #[serde(default)]
    pub indices: Vec<IndexEvidence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEvidence {
    pub name: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub confirms: Vec<String>,
}

fn default_confidence() -> f64 {
    95.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEvidence {
    pub name: String,
    #[serde(default)]
    pub lists: Vec<String>,
}

impl Evidence {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read evidence file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse evidence JSON")
    }

    pub fn verifier_panel(&self) -> VerifierPanel {
        self.sources
            .iter()
            .map(|s| Arc::new(ReplayVerifier::new(s)) as Arc<dyn ExternalVerifier>)
            .collect()
    }

    pub fn index_panel(&self) -> IndexPanel {
        self.indices
            .iter()
            .map(|i| Arc::new(ReplayIndex::new(i)) as Arc<dyn ReproducibilityIndex>)
            .collect()
    }
}

/// Lowercase and collapse whitespace so "1 Main  St" matches "1 main st"
fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn address_set(addresses: &[String]) -> HashSet<String> {
    addresses
        .iter()
        .map(|a| normalize_address(a))
        .filter(|a| !a.is_empty())
        .collect()
}

fn lookup_key(record: &Record) -> Option<String> {
    record
        .address
        .as_deref()
        .map(normalize_address)
        .filter(|a| !a.is_empty())
}

// ============================================================================
// REPLAY VERIFIER
// ============================================================================

pub struct ReplayVerifier {
    name: String,
    confidence: f64,
    reference: Option<String>,
    confirmed: HashSet<String>,
}

impl ReplayVerifier {
    pub fn new(evidence: &SourceEvidence) -> Self {
        ReplayVerifier {
            name: evidence.name.clone(),
            confidence: evidence.confidence,
            reference: evidence.reference.clone(),
            confirmed: address_set(&evidence.confirms),
        }
    }
}

#[async_trait]
impl ExternalVerifier for ReplayVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self, record: &Record) -> Result<ExternalSourceResult, CollaboratorError> {
        let reference = self.reference.as_deref();

        let confirmed = lookup_key(record)
            .map(|key| self.confirmed.contains(&key))
            .unwrap_or(false);

        Ok(if confirmed {
            ExternalSourceResult::confirmed(&self.name, self.confidence, reference)
        } else {
            ExternalSourceResult::denied(&self.name, self.confidence, reference)
        })
    }
}

// ============================================================================
// REPLAY INDEX
// ============================================================================

pub struct ReplayIndex {
    name: String,
    listed: HashSet<String>,
}

impl ReplayIndex {
    pub fn new(evidence: &IndexEvidence) -> Self {
        ReplayIndex {
            name: evidence.name.clone(),
            listed: address_set(&evidence.lists),
        }
    }
}

#[async_trait]
impl ReproducibilityIndex for ReplayIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_findable(&self, record: &Record) -> Result<bool, CollaboratorError> {
        Ok(lookup_key(record)
            .map(|key| self.listed.contains(&key))
            .unwrap_or(false))
    }
}

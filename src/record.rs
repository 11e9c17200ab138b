// 📍 Record - the claimed fact under validation
// Core fields are typed; everything else stays in an open field map.
//
// A core field is "present" when its key exists in the input, even if its
// value is blank. Layer 1 scores presence and blankness separately.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Identifier used in audit entries when the record has no address
pub const UNKNOWN_RECORD: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordInput")]
pub struct Record {
    // ========================================================================
    // CORE FIELDS
    // ========================================================================
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(rename = "zip", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    /// Claimed source identifier, e.g. "County Assessor"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Claim timestamp as supplied upstream (not parsed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    // ========================================================================
    // OPEN FIELDS (anything else the ingestion stage attached)
    // ========================================================================
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Wire shape of a record before the postal code keys are reconciled
#[derive(Deserialize)]
struct RecordInput {
    #[serde(default, deserialize_with = "lenient_string")]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    zip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    timestamp: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl From<RecordInput> for Record {
    /// "zip" wins; "postal_code" fills in only when "zip" is absent and
    /// otherwise stays an open field
    fn from(mut input: RecordInput) -> Self {
        let postal_code = match input.zip {
            Some(zip) => Some(zip),
            None => input.fields.remove("postal_code").map(scalar_to_string),
        };

        Record {
            address: input.address,
            city: input.city,
            state: input.state,
            postal_code,
            source: input.source,
            timestamp: input.timestamp,
            fields: input.fields,
        }
    }
}

impl Record {
    /// Start a record with just an address
    pub fn new(address: &str) -> Self {
        Record {
            address: Some(address.to_string()),
            ..Default::default()
        }
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    pub fn with_postal_code(mut self, postal_code: &str) -> Self {
        self.postal_code = Some(postal_code.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Identifier written to audit entries: the address, or "unknown"
    pub fn identity(&self) -> &str {
        self.address.as_deref().unwrap_or(UNKNOWN_RECORD)
    }

    /// Presence flags of the six required fields, in declaration order
    pub fn required_fields(&self) -> [(&'static str, bool); 6] {
        [
            ("address", self.address.is_some()),
            ("city", self.city.is_some()),
            ("state", self.state.is_some()),
            ("zip", self.postal_code.is_some()),
            ("source", self.source.is_some()),
            ("timestamp", self.timestamp.is_some()),
        ]
    }

    /// Single-line address used by collaborators for lookups
    pub fn full_address(&self) -> String {
        let street = self.address.as_deref().unwrap_or("").trim();
        let city = self.city.as_deref().unwrap_or("").trim();
        let state = self.state.as_deref().unwrap_or("").trim();
        let zip = self.postal_code.as_deref().unwrap_or("").trim();
        format!("{}, {}, {} {}", street, city, state, zip)
            .trim()
            .to_string()
    }

    /// SHA-256 over the normalized core fields
    ///
    /// Two records describing the same fact from the same source share a
    /// fingerprint regardless of case, surrounding whitespace, or open fields.
    pub fn fingerprint(&self) -> String {
        let norm = |v: &Option<String>| {
            v.as_deref()
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default()
        };

        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            norm(&self.address),
            norm(&self.city),
            norm(&self.state),
            norm(&self.postal_code),
            norm(&self.source)
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// Accept any JSON scalar for a core field; `null` counts as a blank value
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Some(scalar_to_string(value)))
}

fn scalar_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Load a JSON array of records
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read records file: {:?}", path.as_ref()))?;

    let records: Vec<Record> =
        serde_json::from_str(&content).context("Failed to parse records JSON")?;

    Ok(records)
}

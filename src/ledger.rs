// 📒 Ledger - partition of completed reports
//
// releasable: GOLD / SILVER / BRONZE (GOLD and SILVER are exportable)
// rejected:   terminal, kept for audit only
//
// A report lands in exactly one partition, once.

use crate::report::ValidationReport;
use crate::status::ValidationStatus;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    releasable: Vec<ValidationReport>,
    rejected: Vec<ValidationReport>,
    recorded: HashSet<u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a completed report to its partition
    ///
    /// Returns false if a report with the same validation id is already held.
    pub fn record(&mut self, report: ValidationReport) -> bool {
        if !self.recorded.insert(report.validation_id) {
            return false;
        }

        if report.final_status.is_rejected() {
            self.rejected.push(report);
        } else {
            self.releasable.push(report);
        }
        true
    }

    /// GOLD, SILVER and BRONZE reports
    pub fn releasable(&self) -> &[ValidationReport] {
        &self.releasable
    }

    /// GOLD and SILVER reports: cleared for external release
    pub fn exportable(&self) -> Vec<&ValidationReport> {
        self.releasable.iter().filter(|r| r.is_exportable()).collect()
    }

    /// BRONZE reports awaiting review
    pub fn needs_review(&self) -> Vec<&ValidationReport> {
        self.releasable
            .iter()
            .filter(|r| r.final_status == ValidationStatus::Bronze)
            .collect()
    }

    pub fn rejected(&self) -> &[ValidationReport] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.releasable.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the exportable rows as CSV; returns the number of rows written
    pub fn write_exportable_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut rows = 0;

        for report in self.exportable() {
            wtr.serialize(ExportRow::from(report))
                .context("Failed to write export row")?;
            rows += 1;
        }

        wtr.flush().context("Failed to flush CSV export")?;
        Ok(rows)
    }
}

/// Flat row handed to downstream consumers
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    validation_id: u64,
    address: &'a str,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
    source: &'a str,
    final_score: String,
    final_status: ValidationStatus,
    record_fingerprint: &'a str,
}

impl<'a> From<&'a ValidationReport> for ExportRow<'a> {
    fn from(report: &'a ValidationReport) -> Self {
        let record = &report.record;
        ExportRow {
            validation_id: report.validation_id,
            address: record.address.as_deref().unwrap_or(""),
            city: record.city.as_deref().unwrap_or(""),
            state: record.state.as_deref().unwrap_or(""),
            zip: record.postal_code.as_deref().unwrap_or(""),
            source: record.source.as_deref().unwrap_or(""),
            final_score: format!("{:.2}", report.final_score),
            final_status: report.final_status,
            record_fingerprint: &report.record_fingerprint,
        }
    }
}

// 🗄️ Audit Store - SQLite persistence for completed reports
//
// Reports and their audit entries are written in one transaction.
// Re-inserting a report already stored for the same session is a no-op.

use crate::audit::AuditEntry;
use crate::report::ValidationReport;
use crate::status::ValidationStatus;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Validation reports (one row per completed validation)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS validation_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            validation_id INTEGER NOT NULL,
            record_id TEXT NOT NULL,
            record_fingerprint TEXT NOT NULL,
            final_score REAL NOT NULL,
            final_status TEXT NOT NULL,
            rejected_at INTEGER,
            validated_at TEXT NOT NULL,
            report TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(session_id, validation_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Audit log (append-only, one row per executed layer)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            validation_id INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            layer INTEGER NOT NULL,
            record_id TEXT NOT NULL,
            score REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reports_status ON validation_reports(final_status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reports_fingerprint ON validation_reports(record_fingerprint)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_validation ON audit_log(session_id, validation_id)",
        [],
    )?;

    Ok(())
}

/// Store a report and its audit trail; returns false if it was already stored
pub fn insert_report(conn: &mut Connection, session_id: &str, report: &ValidationReport) -> Result<bool> {
    let report_json = serde_json::to_string(report).context("Failed to serialize report")?;
    let tx = conn.transaction()?;

    let result = tx.execute(
        "INSERT INTO validation_reports (
            session_id, validation_id, record_id, record_fingerprint,
            final_score, final_status, rejected_at, validated_at, report
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            session_id,
            report.validation_id as i64,
            report.record.identity(),
            report.record_fingerprint,
            report.final_score,
            report.final_status.as_str(),
            report.rejected_at.map(|l| l.number()),
            report.validated_at.to_rfc3339(),
            report_json,
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    for entry in &report.audit_trail {
        tx.execute(
            "INSERT INTO audit_log (
                session_id, validation_id, timestamp, layer, record_id, score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                entry.validation_id as i64,
                entry.timestamp.to_rfc3339(),
                entry.layer,
                entry.record_id,
                entry.score,
            ],
        )?;
    }

    tx.commit()?;
    Ok(true)
}

/// Store every report of a batch; returns how many were new
pub fn insert_reports(
    conn: &mut Connection,
    session_id: &str,
    reports: &[ValidationReport],
) -> Result<usize> {
    let mut inserted = 0;
    for report in reports {
        if insert_report(conn, session_id, report)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

pub fn get_reports_by_status(
    conn: &Connection,
    status: ValidationStatus,
) -> Result<Vec<ValidationReport>> {
    let mut stmt = conn.prepare(
        "SELECT report FROM validation_reports
         WHERE final_status = ?1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map(params![status.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.iter()
        .map(|json| serde_json::from_str(json).context("Failed to parse stored report"))
        .collect()
}

/// Audit entries of one validation, in execution order
pub fn get_audit_entries(
    conn: &Connection,
    session_id: &str,
    validation_id: u64,
) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, validation_id, layer, record_id, score
         FROM audit_log
         WHERE session_id = ?1 AND validation_id = ?2
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map(params![session_id, validation_id as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, u8>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(timestamp, validation_id, layer, record_id, score)| {
            Ok(AuditEntry {
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .with_context(|| format!("Invalid audit timestamp: {}", timestamp))?
                    .with_timezone(&Utc),
                validation_id: validation_id as u64,
                layer,
                record_id,
                score,
            })
        })
        .collect()
}

pub fn count_reports(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM validation_reports", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerId;
    use crate::record::Record;

    fn report(validation_id: u64, status: ValidationStatus, score: f64) -> ValidationReport {
        let record = Record::new("1094 Riverside Drive").with_source("County Assessor");
        let entry = AuditEntry {
            timestamp: Utc::now(),
            validation_id,
            layer: 1,
            record_id: record.identity().to_string(),
            score,
        };
        ValidationReport {
            validation_id,
            record_fingerprint: record.fingerprint(),
            record,
            validated_at: Utc::now(),
            layer_1: None,
            layer_2: None,
            layer_3: None,
            final_score: score,
            final_status: status,
            rejected_at: status.is_rejected().then_some(LayerId::Internal),
            audit_trail: vec![entry],
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let reports = vec![
            report(1, ValidationStatus::Gold, 98.1),
            report(2, ValidationStatus::Rejected, 46.7),
        ];

        let first = insert_reports(&mut conn, "session-a", &reports).unwrap();
        let second = insert_reports(&mut conn, "session-a", &reports).unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(count_reports(&conn).unwrap(), 2);

        // Duplicate inserts must not duplicate audit rows either
        assert_eq!(get_audit_entries(&conn, "session-a", 1).unwrap().len(), 1);

        // Same validation id in another session is a different report
        assert!(insert_report(&mut conn, "session-b", &reports[0]).unwrap());
        assert_eq!(count_reports(&conn).unwrap(), 3);

        println!("✅ Report idempotency test PASSED");
    }

    #[test]
    fn test_query_by_status() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        insert_reports(
            &mut conn,
            "session-a",
            &[
                report(1, ValidationStatus::Gold, 98.1),
                report(2, ValidationStatus::Rejected, 46.7),
                report(3, ValidationStatus::Gold, 96.0),
            ],
        )
        .unwrap();

        let gold = get_reports_by_status(&conn, ValidationStatus::Gold).unwrap();
        assert_eq!(gold.len(), 2);
        assert_eq!(gold[0].validation_id, 1);
        assert_eq!(gold[1].validation_id, 3);

        let rejected = get_reports_by_status(&conn, ValidationStatus::Rejected).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].rejected_at, Some(LayerId::Internal));
        assert!(get_reports_by_status(&conn, ValidationStatus::Silver)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_audit_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let stored = report(7, ValidationStatus::Rejected, 46.7);
        insert_report(&mut conn, "session-a", &stored).unwrap();

        let entries = get_audit_entries(&conn, "session-a", 7).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].layer, 1);
        assert_eq!(entries[0].record_id, "1094 Riverside Drive");
        assert_eq!(entries[0].score, 46.7);
        assert!(get_audit_entries(&conn, "session-b", 7).unwrap().is_empty());
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");

        {
            let mut conn = Connection::open(&path).unwrap();
            setup_database(&conn).unwrap();
            insert_report(&mut conn, "session-a", &report(1, ValidationStatus::Silver, 90.2))
                .unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(count_reports(&conn).unwrap(), 1);
    }
}

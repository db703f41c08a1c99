//! # Audit Trail Repository
//!
//! Append-only forensic record of bill edits and deletes.
//!
//! One row per EDIT/DELETE: performer, action, target bill, a JSON snapshot
//! of the pre-mutation state, free-text notes and a timestamp. Rows are never
//! mutated after insert, and the transactional logic never reads them back -
//! the read side exists for external reporting and tests.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use medibill_core::{AuditAction, AuditLog};

/// Inserts an audit entry on the caller's open transaction, so the snapshot
/// commits (or vanishes) together with the mutation it describes.
pub async fn insert_audit(conn: &mut SqliteConnection, entry: &AuditLog) -> DbResult<()> {
    debug!(
        bill_id = %entry.bill_id,
        action = ?entry.action,
        performed_by = %entry.performed_by,
        "Recording audit entry"
    );

    sqlx::query(
        r#"
        INSERT INTO audit_logs (
            id, performed_by, action, bill_id, previous_state, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.performed_by)
    .bind(entry.action)
    .bind(&entry.bill_id)
    .bind(&entry.previous_state)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for audit trail reads.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Lists the audit entries recorded against one bill, oldest first.
    pub async fn list_for_bill(&self, bill_id: &str) -> DbResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, performed_by, action, bill_id, previous_state, notes, created_at
            FROM audit_logs
            WHERE bill_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists all entries of one action type, newest first.
    pub async fn list_by_action(&self, action: AuditAction) -> DbResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, performed_by, action, bill_id, previous_state, notes, created_at
            FROM audit_logs
            WHERE action = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(action)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

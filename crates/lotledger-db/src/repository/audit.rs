//! # Audit Repository
//!
//! Write-once who/when/before/after history of every balance-affecting
//! event. Records are written in the same transaction as the event they
//! describe, so an event without its audit record cannot commit.

use chrono::{DateTime, Utc};
use lotledger_core::types::new_id;
use lotledger_core::{AuditAction, AuditRecord, CoreError};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

const TABLE: &str = "audit_log";

/// What an audit record is about.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuditSubject<'a> {
    pub entity_type: &'a str,
    pub entity_id: &'a str,
}

/// Repository for audit history.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// History of one entity in append order.
    pub async fn history(&self, entity_type: &str, entity_id: &str) -> DbResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT seq, id, actor, action, entity_type, entity_id,
                   before_state, after_state, created_at
            FROM audit_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY seq
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Counts all records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Audit records cannot be changed. There is no override.
    pub async fn modify(&self, _record: &AuditRecord) -> DbResult<()> {
        Err(CoreError::immutable(TABLE).into())
    }

    /// Audit records cannot be removed. There is no override.
    pub async fn remove(&self, _id: &str) -> DbResult<()> {
        Err(CoreError::immutable(TABLE).into())
    }
}

/// Writes one audit record inside the caller's transaction.
pub(crate) async fn record(
    conn: &mut SqliteConnection,
    actor: &str,
    action: AuditAction,
    subject: AuditSubject<'_>,
    before: Option<Value>,
    after: Option<Value>,
    at: DateTime<Utc>,
) -> DbResult<AuditRecord> {
    let id = new_id();
    let before_state = before.map(|v| v.to_string());
    let after_state = after.map(|v| v.to_string());

    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO audit_log (
            id, actor, action, entity_type, entity_id, before_state, after_state, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING seq
        "#,
    )
    .bind(&id)
    .bind(actor)
    .bind(action)
    .bind(subject.entity_type)
    .bind(subject.entity_id)
    .bind(&before_state)
    .bind(&after_state)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    debug!(seq, actor, entity_type = subject.entity_type, entity_id = subject.entity_id, "Audit record written");

    Ok(AuditRecord {
        seq,
        id,
        actor: actor.to_string(),
        action,
        entity_type: subject.entity_type.to_string(),
        entity_id: subject.entity_id.to_string(),
        before_state,
        after_state,
        created_at: at,
    })
}

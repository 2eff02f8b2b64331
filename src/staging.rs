//! Staging log
//!
//! Every mutation of a staging-enabled type is recorded as a durable task:
//! object type, object id, operation, and a JSON payload of what changed.
//! Tasks are consumed FIFO per target server (BIGSERIAL order); out-of-order
//! application is unsupported, and retrying a task whose parent has not
//! arrived yet is the consumer's job, not the log's.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::error::{Result, StoreError};
use crate::record::DataRecord;
use crate::sql::ddl::DdlGenerator;
use crate::sql::sanitize::quote_identifier;
use crate::typeinfo::StagingPayload;

/// Mutation kind recorded in a staging task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingOperation {
    Insert,
    Update,
    Delete,
}

impl StagingOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            StagingOperation::Insert => "insert",
            StagingOperation::Update => "update",
            StagingOperation::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(StagingOperation::Insert),
            "update" => Some(StagingOperation::Update),
            "delete" => Some(StagingOperation::Delete),
            _ => None,
        }
    }
}

/// One recorded change awaiting replay
#[derive(Debug, Clone)]
pub struct StagingTask {
    pub id: i64,
    pub object_type: String,
    pub object_id: i64,
    pub operation: StagingOperation,
    pub payload: serde_json::Value,
    pub target: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload recorded for a mutation, honoring the type's payload shape.
///
/// Deletes and inserts always carry the full snapshot; updates carry either
/// the changed columns or the full snapshot.
pub(crate) fn payload_for(record: &DataRecord, operation: StagingOperation) -> serde_json::Value {
    match (record.type_info().staging_payload, operation) {
        (_, StagingOperation::Delete) | (_, StagingOperation::Insert) => record.to_json(),
        (StagingPayload::FullSnapshot, StagingOperation::Update) => record.to_json(),
        (StagingPayload::ChangedColumns, StagingOperation::Update) => record.changed_json(),
    }
}

/// Durable change log backed by one table
#[derive(Debug, Clone)]
pub struct StagingLog {
    pool: PgPool,
    table: String,
}

impl StagingLog {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Create the staging table if it does not exist
    pub(crate) async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&DdlGenerator::create_staging_table(&self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Append one task; returns its FIFO position (the generated id)
    pub async fn record(
        &self,
        object_type: &str,
        object_id: i64,
        operation: StagingOperation,
        payload: serde_json::Value,
        target: Option<&str>,
    ) -> Result<i64> {
        let insert_sql = format!(
            "INSERT INTO {} (object_type, object_id, operation, payload, target) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
            quote_identifier(&self.table)
        );

        let row = sqlx::query(&insert_sql)
            .bind(object_type)
            .bind(object_id)
            .bind(operation.as_str())
            .bind(&payload)
            .bind(target)
            .fetch_one(&self.pool)
            .await?;

        let id: i64 = row.try_get("id")?;
        tracing::debug!(
            object_type,
            object_id,
            operation = operation.as_str(),
            task_id = id,
            "staging task recorded"
        );
        Ok(id)
    }

    /// Fetch tasks FIFO.
    ///
    /// With a target, returns broadcast tasks (no target) plus tasks aimed at
    /// that server; without one, returns everything pending.
    pub async fn fetch_pending(
        &self,
        target: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StagingTask>> {
        let table = quote_identifier(&self.table);

        let rows = match target {
            Some(target) => {
                let select_sql = format!(
                    "SELECT id, object_type, object_id, operation, payload, target, created_at \
                     FROM {} WHERE target IS NULL OR target = $1 ORDER BY id ASC LIMIT $2",
                    table
                );
                sqlx::query(&select_sql)
                    .bind(target)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let select_sql = format!(
                    "SELECT id, object_type, object_id, operation, payload, target, created_at \
                     FROM {} ORDER BY id ASC LIMIT $1",
                    table
                );
                sqlx::query(&select_sql)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::row_to_task).collect()
    }

    /// Remove a processed task
    pub async fn complete(&self, task_id: i64) -> Result<()> {
        let delete_sql = format!(
            "DELETE FROM {} WHERE id = $1",
            quote_identifier(&self.table)
        );
        let result = sqlx::query(&delete_sql)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "staging task {}",
                task_id
            )));
        }
        Ok(())
    }

    /// Delete tasks recorded before the cutoff; returns the removed count
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let delete_sql = format!(
            "DELETE FROM {} WHERE created_at < $1",
            quote_identifier(&self.table)
        );
        let result = sqlx::query(&delete_sql)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<StagingTask> {
        let operation: String = row.try_get("operation")?;
        let operation = StagingOperation::parse(&operation).ok_or_else(|| {
            StoreError::validation(format!("Unknown staging operation '{}'", operation))
        })?;

        Ok(StagingTask {
            id: row.try_get("id")?,
            object_type: row.try_get("object_type")?,
            object_id: row.try_get("object_id")?,
            operation,
            payload: row.try_get("payload")?,
            target: row.try_get("target")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

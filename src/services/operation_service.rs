//! services/operation_service.rs
//! Seguimiento de corridas de campaña en SQLite (estado, resultados y log).

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::campaign_model::LogEntry;
use crate::models::operation_model::{
    CampaignLogRow, ListOperationsResponse, OperationRecord, OperationRow,
    OperationStatusResponse, OPERATION_TYPE_CAMPAIGN,
};

#[derive(Clone, Debug)]
pub struct OperationService {
    db_pool: Pool<Sqlite>,
}

impl OperationService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        OperationService { db_pool }
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run operation migrations")?;
        Ok(())
    }

    /// Crea la operación en DB con estado "pending"
    pub async fn create_operation(&self, is_async: bool) -> Result<String> {
        let op_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO operations (
                id, operation_type, status, error_message,
                is_async, created_at, updated_at, metadata
            )
            VALUES (?1, ?2, 'pending', NULL, ?3, ?4, ?4, NULL)
            "#,
        )
        .bind(&op_id)
        .bind(OPERATION_TYPE_CAMPAIGN)
        .bind(is_async as i64)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar operation")?;

        Ok(op_id)
    }

    /// Actualiza estado y error
    pub async fn update_operation_status(
        &self,
        op_id: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE operations
            SET status = ?2,
                error_message = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(op_id)
        .bind(status)
        .bind(error_message)
        .bind(now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar operación")?;

        Ok(())
    }

    /// Guarda el resultado final (JSON) junto con el estado
    pub async fn finish_operation(
        &self,
        op_id: &str,
        status: &str,
        error_message: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            UPDATE operations
            SET status = ?2,
                error_message = ?3,
                updated_at = ?4,
                metadata = ?5
            WHERE id = ?1
            "#,
        )
        .bind(op_id)
        .bind(status)
        .bind(error_message)
        .bind(now)
        .bind(metadata.to_string())
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar resultado de la operación")?;

        Ok(())
    }

    /// Obtiene la info de una operación
    pub async fn get_operation(&self, op_id: &str) -> Result<OperationRecord> {
        let row: OperationRow = sqlx::query_as(
            r#"
            SELECT
                id, operation_type, status, error_message,
                is_async, created_at, updated_at, metadata
            FROM operations
            WHERE id = ?1
            "#,
        )
        .bind(op_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| anyhow!("Operation not found: {}", op_id))?;

        // parsea strings a boolean, ISO8601 y JSON
        let metadata = match row.metadata {
            Some(raw) => Some(serde_json::from_str(&raw).context("metadata corrupta")?),
            None => None,
        };
        Ok(OperationRecord {
            id: row.id,
            operation_type: row.operation_type,
            status: row.status,
            error_message: row.error_message,
            is_async: row.is_async != 0,
            created_at: row.created_at.parse()?,
            updated_at: row.updated_at.parse()?,
            metadata,
        })
    }

    /// Lista operaciones con paginación
    pub async fn list_operations(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<ListOperationsResponse> {
        let page = page.max(1);
        let offset = (page - 1) * page_size;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operations")
            .fetch_one(&self.db_pool)
            .await?;

        let rows: Vec<OperationRow> = sqlx::query_as(
            r#"
            SELECT
                id, operation_type, status, error_message,
                is_async, created_at, updated_at, metadata
            FROM operations
            ORDER BY created_at DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page_size as i64)
        .bind(offset as i64)
        .fetch_all(&self.db_pool)
        .await?;

        let items: Vec<OperationStatusResponse> = rows.into_iter().map(Into::into).collect();

        Ok(ListOperationsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Inserta el log de una corrida a partir de `start_position`. Devuelve la siguiente posición.
    pub async fn insert_log_entries(
        &self,
        op_id: &str,
        campaign_language: &str,
        start_position: i64,
        entries: &[LogEntry],
    ) -> Result<i64> {
        let mut tx = self.db_pool.begin().await?;
        let mut position = start_position;

        for entry in entries {
            let status = entry.status.map(|s| s.as_str()).unwrap_or("pending");
            sqlx::query(
                r#"
                INSERT INTO campaign_logs (
                    id, operation_id, campaign_language, position, timestamp,
                    name, email, language, original_language, subject,
                    attachments_count, status, error_message
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(op_id)
            .bind(campaign_language)
            .bind(position)
            .bind(entry.timestamp.to_rfc3339())
            .bind(&entry.name)
            .bind(&entry.email)
            .bind(&entry.language)
            .bind(&entry.original_language)
            .bind(&entry.subject)
            .bind(entry.attachments_count as i64)
            .bind(status)
            .bind(&entry.error)
            .execute(&mut *tx)
            .await
            .context("Fallo al insertar campaign_log")?;
            position += 1;
        }

        tx.commit().await?;
        Ok(position)
    }

    pub async fn list_logs(&self, op_id: &str) -> Result<Vec<CampaignLogRow>> {
        let rows = sqlx::query_as(
            r#"
            SELECT campaign_language, position, timestamp, name, email, language,
                   original_language, subject, attachments_count, status, error_message
            FROM campaign_logs
            WHERE operation_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(op_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(rows)
    }

    /// Log de la operación en CSV (con encabezados)
    pub async fn export_logs_csv(&self, op_id: &str) -> Result<String> {
        let rows = self.list_logs(op_id).await?;
        let mut writer = csv::Writer::from_writer(Vec::new());
        if rows.is_empty() {
            writer.write_record([
                "campaign_language",
                "position",
                "timestamp",
                "name",
                "email",
                "language",
                "original_language",
                "subject",
                "attachments_count",
                "status",
                "error_message",
            ])?;
        }
        for row in &rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Error generando CSV: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

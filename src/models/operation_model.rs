use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const OPERATION_TYPE_CAMPAIGN: &str = "campaign_run";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub operation_type: String,
    pub status: String, // "pending", "running", "done", "failed", "cancelled"
    pub error_message: Option<String>,
    pub is_async: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>, // resultados de la corrida
}

/// Fila cruda de la tabla `operations`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperationRow {
    pub id: String,
    pub operation_type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub is_async: i64,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationStatusResponse {
    pub id: String,
    pub operation_type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub is_async: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<OperationRow> for OperationStatusResponse {
    fn from(r: OperationRow) -> Self {
        OperationStatusResponse {
            id: r.id,
            operation_type: r.operation_type,
            status: r.status,
            error_message: r.error_message,
            is_async: r.is_async != 0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Para listar operaciones con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListOperationsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<OperationStatusResponse>,
}

/// Fila de `campaign_logs`; también es el formato del CSV exportado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignLogRow {
    pub campaign_language: String,
    pub position: i64,
    pub timestamp: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub original_language: Option<String>,
    pub subject: String,
    pub attachments_count: i64,
    pub status: String,
    pub error_message: Option<String>,
}

/// Resumen por corrida de una operación.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummaryRow {
    pub campaign_language: String,
    pub total_contacts: usize,
    pub successful_sends: u32,
    pub failed_sends: u32,
    pub success_rate: f64,
    pub test_mode: bool,
    pub completion_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignSummaryReport {
    pub operation_id: String,
    pub runs: Vec<CampaignSummaryRow>,
    pub total_contacts: usize,
    pub successful_sends: u32,
    pub failed_sends: u32,
    pub success_rate: f64,
}

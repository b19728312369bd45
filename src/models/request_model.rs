//! models/request_model.rs
//! Requests y respuestas de la API de campañas.

use serde::{Deserialize, Serialize};

use crate::models::campaign_model::{AttachmentConfig, CampaignRunOutcome, Recipient};
use crate::models::email_model::SmtpSettings;

/// Cómo se eligen los idiomas de la campaña
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LanguageMode {
    /// Cada contacto según su columna `language`
    #[default]
    Auto,
    /// Todos los contactos en un mismo idioma
    Single { language: String },
    /// Una corrida por idioma
    Multi { languages: Vec<String> },
}

pub const AUTO_DETECT_LABEL: &str = "auto-detect";

#[derive(Debug, Clone, Deserialize)]
pub struct RunCampaignRequest {
    pub contacts: Vec<Recipient>,
    /// Columnas de la lista; si no vienen se derivan de los contactos
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// Objeto JSON o texto JSON (como llega del formulario)
    #[serde(default)]
    pub variables: Option<serde_json::Value>,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    pub send_limit: Option<u32>,
    pub delay_min: Option<u64>,
    pub delay_max: Option<u64>,
    pub test_mode: Option<bool>,
    pub default_language: Option<String>,
    #[serde(default)]
    pub mode: LanguageMode,
    /// Si no viene se usa el SMTP del entorno
    pub smtp: Option<SmtpSettings>,
    /// Corre en segundo plano y devuelve el id de operación
    #[serde(default)]
    pub async_run: bool,
    /// Semilla para asuntos y pausas reproducibles
    pub seed: Option<u64>,
}

/// Resultado de una corrida, etiquetado con el idioma de la campaña.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageRunResult {
    pub campaign_language: String,
    #[serde(flatten)]
    pub outcome: CampaignRunOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignRunResponse {
    pub success: bool,
    pub operation_id: String,
    pub status: String,
    /// Vacío en corridas asíncronas
    pub results: Vec<LanguageRunResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub recipient: Recipient,
    pub language: Option<String>,
    #[serde(default)]
    pub variables: Option<serde_json::Value>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResponse {
    pub language: String,
    pub subject: String,
    pub body: String,
}

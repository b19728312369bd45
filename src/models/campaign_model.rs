//! models/campaign_model.rs
//! Estructuras de una campaña: contactos, variables, adjuntos, log y estadísticas.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CampaignError, CampaignResult};

/// Columnas que toda lista de contactos debe exponer.
pub const REQUIRED_COLUMNS: [&str; 2] = ["name", "email"];

/// Un contacto. Los campos conservan el orden en que llegaron.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "IndexMap<String, Value>",
    into = "IndexMap<String, Option<String>>"
)]
pub struct Recipient {
    fields: IndexMap<String, Option<String>>,
}

impl From<IndexMap<String, Value>> for Recipient {
    fn from(raw: IndexMap<String, Value>) -> Self {
        let fields = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                (key, value)
            })
            .collect();
        Recipient { fields }
    }
}

impl From<Recipient> for IndexMap<String, Option<String>> {
    fn from(recipient: Recipient) -> Self {
        recipient.fields
    }
}

impl Recipient {
    pub fn new(name: &str, email: &str) -> Self {
        Recipient::default().with("name", name).with("email", email)
    }

    /// Builder: agrega o reemplaza un campo.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), Some(value.to_string()));
        self
    }

    /// Builder: agrega un campo presente pero vacío (null).
    pub fn with_null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), None);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), Some(value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_deref())
    }

    /// Igual que `get`, pero ignorando valores vacíos o solo espacios.
    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn fields(&self) -> &IndexMap<String, Option<String>> {
        &self.fields
    }

    pub fn name(&self) -> &str {
        self.get("name").unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.get("email").unwrap_or_default()
    }

    /// Idioma declarado, normalizado (trim + minúsculas).
    pub fn language(&self) -> Option<String> {
        self.non_empty("language").map(|l| l.trim().to_lowercase())
    }

    pub fn source(&self) -> Option<&str> {
        self.non_empty("source")
    }

    pub fn attachment(&self) -> Option<&str> {
        self.non_empty("attachment")
    }
}

/// Lista ordenada de contactos, con las columnas que expone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactList {
    pub columns: Vec<String>,
    pub recipients: Vec<Recipient>,
}

impl ContactList {
    /// Las columnas se derivan de los campos de los contactos (orden de aparición).
    pub fn new(recipients: Vec<Recipient>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for r in &recipients {
            for key in r.fields().keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        ContactList {
            columns,
            recipients,
        }
    }

    pub fn with_columns(columns: Vec<String>, recipients: Vec<Recipient>) -> Self {
        ContactList {
            columns,
            recipients,
        }
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Columnas obligatorias ausentes, en el orden de `REQUIRED_COLUMNS`.
    pub fn missing_required_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|c| !self.columns.iter().any(|col| col == *c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Copia de la lista con el idioma de todos los contactos forzado.
    pub fn with_language(&self, language: &str) -> ContactList {
        let recipients = self
            .recipients
            .iter()
            .cloned()
            .map(|mut r| {
                r.set("language", language);
                r
            })
            .collect();
        let mut columns = self.columns.clone();
        if !columns.iter().any(|c| c == "language") {
            columns.push("language".to_string());
        }
        ContactList {
            columns,
            recipients,
        }
    }
}

/// Lista de ejemplo para que el usuario vea el formato esperado.
pub fn sample_contacts() -> ContactList {
    let rows = [
        (
            "John Doe",
            "john@example.com",
            "en",
            "TechCorp",
            "CTO",
            "LinkedIn",
            "I am particularly interested in your work on AI applications.",
        ),
        (
            "Marie Martin",
            "marie@example.fr",
            "fr",
            "InnovateFR",
            "Directeur Innovation",
            "Conference",
            "Votre expertise en innovation m'intéresse beaucoup.",
        ),
        (
            "Alex Smith",
            "alex@example.com",
            "en",
            "StartupXYZ",
            "Founder",
            "Website",
            "I would love to learn about your entrepreneurship journey.",
        ),
    ];

    let recipients = rows
        .iter()
        .map(|(name, email, lang, company, position, source, msg)| {
            Recipient::new(name, email)
                .with("language", lang)
                .with("company", company)
                .with("position", position)
                .with("source", source)
                .with("custom_message", msg)
        })
        .collect();
    ContactList::new(recipients)
}

/// Variables globales de la campaña. Admite claves con sufijo de idioma (`sender_name_fr`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignVariables(IndexMap<String, String>);

impl CampaignVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Valor `<key>_<language>` si existe.
    pub fn localized(&self, key: &str, language: &str) -> Option<&str> {
        self.get(&format!("{}_{}", key, language))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convierte un JSON arbitrario (objeto) en variables.
    pub fn from_value(value: Value) -> CampaignResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                let vars = map
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        Value::Null => None,
                        Value::String(s) => Some((k, s)),
                        other => Some((k, other.to_string())),
                    })
                    .collect();
                Ok(CampaignVariables(vars))
            }
            other => Err(CampaignError::InvalidConfiguration(format!(
                "campaign variables must be a JSON object, got: {}",
                other
            ))),
        }
    }

    /// Parsea el texto JSON que llega desde el formulario. Texto vacío = sin variables.
    pub fn from_json(text: &str) -> CampaignResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_str(text).map_err(|e| {
            CampaignError::InvalidConfiguration(format!(
                "Invalid JSON format for campaign variables: {}",
                e
            ))
        })?;
        Self::from_value(value)
    }
}

impl FromIterator<(String, String)> for CampaignVariables {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        CampaignVariables(iter.into_iter().collect())
    }
}

/// Configuración de adjuntos: comunes y por idioma.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(default)]
    pub common: Vec<String>,
    #[serde(default)]
    pub by_language: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Success,
    Failed,
    TestSuccess,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Success => "success",
            SendStatus::Failed => "failed",
            SendStatus::TestSuccess => "test_success",
        }
    }
}

/// Una entrada por intento de envío.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub email: String,
    /// Idioma resuelto
    pub language: String,
    /// Idioma declarado por el contacto
    pub original_language: Option<String>,
    pub subject: String,
    pub attachments_count: usize,
    /// `None` hasta que termina el intento
    pub status: Option<SendStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub attempted: u32,
    pub successful: u32,
    pub failed: u32,
}

/// Resultado de una corrida completa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total_contacts: usize,
    pub successful_sends: u32,
    pub failed_sends: u32,
    pub completion_time: DateTime<Utc>,
    pub test_mode: bool,
    pub campaign_log: Vec<LogEntry>,
    pub language_statistics: IndexMap<String, LanguageStats>,
    pub available_templates: Vec<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl CampaignStats {
    /// Porcentaje de éxito sobre el total de contactos, redondeado a 2 decimales.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_contacts.max(1) as f64;
        let rate = self.successful_sends as f64 / total * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// Lo que devuelve una corrida: estadísticas o solo el error de validación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CampaignRunOutcome {
    Completed(Box<CampaignStats>),
    Failed { error: String },
}

impl From<CampaignResult<CampaignStats>> for CampaignRunOutcome {
    fn from(result: CampaignResult<CampaignStats>) -> Self {
        match result {
            Ok(stats) => CampaignRunOutcome::Completed(Box::new(stats)),
            Err(e) => CampaignRunOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

impl CampaignRunOutcome {
    pub fn stats(&self) -> Option<&CampaignStats> {
        match self {
            CampaignRunOutcome::Completed(stats) => Some(stats),
            CampaignRunOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CampaignRunOutcome::Completed(_) => None,
            CampaignRunOutcome::Failed { error } => Some(error),
        }
    }
}

//! errors.rs
//! Errores del motor de campañas.

use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CampaignError {
    /// Faltan columnas obligatorias en la lista de contactos (aborta la corrida).
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    /// No hay ninguna plantilla cargada (aborta la corrida).
    #[error("No email templates loaded")]
    NoTemplatesLoaded,

    /// El JSON de plantillas no trae los campos de primer nivel requeridos.
    #[error("Malformed template data: {0}")]
    MalformedTemplateData(String),

    /// Adjunto inexistente o ilegible; no es fatal para el envío.
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// Falla de envío de un mensaje; no es fatal para la campaña.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl CampaignError {
    /// Los errores de validación abortan la corrida antes de cualquier envío.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CampaignError::MissingRequiredColumns(_)
                | CampaignError::NoTemplatesLoaded
                | CampaignError::InvalidConfiguration(_)
        )
    }
}

impl From<lettre::transport::smtp::Error> for CampaignError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        CampaignError::TransportFailure(err.to_string())
    }
}

impl From<lettre::error::Error> for CampaignError {
    fn from(err: lettre::error::Error) -> Self {
        CampaignError::TransportFailure(format!("Failed to build message: {}", err))
    }
}

impl From<lettre::address::AddressError> for CampaignError {
    fn from(err: lettre::address::AddressError) -> Self {
        CampaignError::TransportFailure(format!("Invalid address: {}", err))
    }
}

impl From<serde_json::Error> for CampaignError {
    fn from(err: serde_json::Error) -> Self {
        CampaignError::MalformedTemplateData(err.to_string())
    }
}

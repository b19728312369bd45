//! models/email_model.rs
//! Configuración del transporte SMTP.

use serde::{Deserialize, Serialize};

use crate::errors::{CampaignError, CampaignResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpTlsMode {
    /// STARTTLS (puerto 587)
    #[default]
    Starttls,
    /// TLS implícito (puerto 465)
    Wrapper,
    /// Sin cifrado, solo para servidores de prueba locales
    None,
}

impl std::str::FromStr for SmtpTlsMode {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starttls" | "" => Ok(SmtpTlsMode::Starttls),
            "wrapper" | "tls" | "ssl" => Ok(SmtpTlsMode::Wrapper),
            "none" | "plain" => Ok(SmtpTlsMode::None),
            other => Err(CampaignError::InvalidConfiguration(format!(
                "unknown SMTP TLS mode '{}'",
                other
            ))),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Config SMTP (puede venir del request o del entorno)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: String,
    #[serde(skip_serializing)]
    pub smtp_pass: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub tls: SmtpTlsMode,
    /// Enviar el cuerpo como text/html en lugar de text/plain
    #[serde(default)]
    pub html_body: bool,
}

impl SmtpSettings {
    /// Mismas reglas que el formulario de conexión.
    pub fn validate(&self) -> CampaignResult<()> {
        if self.smtp_user.trim().is_empty() || self.smtp_pass.is_empty() {
            return Err(CampaignError::InvalidConfiguration(
                "Email and password are required".to_string(),
            ));
        }
        if !self.smtp_user.contains('@') {
            return Err(CampaignError::InvalidConfiguration(
                "Invalid email format".to_string(),
            ));
        }
        if self.smtp_host.trim().is_empty() {
            return Err(CampaignError::InvalidConfiguration(
                "SMTP server is required".to_string(),
            ));
        }
        if self.smtp_port == 0 {
            return Err(CampaignError::InvalidConfiguration(
                "SMTP port must be a number between 1 and 65535".to_string(),
            ));
        }
        Ok(())
    }
}

//! config/app_config.rs
//! Configuración global del servicio (valores por defecto + variables de entorno / .env).

use std::env;
use std::path::PathBuf;

use crate::models::email_model::{SmtpSettings, SmtpTlsMode};
use crate::services::dispatcher::CampaignSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_host: String,
    pub bind_port: u16,
    /// Carpeta de la base SQLite
    pub data_dir: PathBuf,
    /// JSON de plantillas a importar al arrancar
    pub templates_file: Option<PathBuf>,
    pub default_language: String,
    pub send_limit: u32,
    pub delay_min: u64,
    pub delay_max: u64,
    pub test_mode: bool,
    /// Transporte por defecto si el request no trae uno
    pub smtp: Option<SmtpSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 5022,
            data_dir: PathBuf::from("data"),
            templates_file: None,
            default_language: "en".to_string(),
            send_limit: 5,
            delay_min: 30,
            delay_max: 60,
            test_mode: true,
            smtp: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Valor inválido para {}='{}', se usa el default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl AppConfig {
    /// Lee la configuración del entorno (llamar después de `dotenv()`).
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let smtp = match (env::var("SMTP_HOST"), env::var("SMTP_USER")) {
            (Ok(host), Ok(user)) => Some(SmtpSettings {
                smtp_host: host,
                smtp_port: env_parse("SMTP_PORT", 587),
                smtp_user: user,
                smtp_pass: env::var("SMTP_PASS").unwrap_or_default(),
                from_name: env::var("SMTP_FROM_NAME").ok(),
                tls: env_parse("SMTP_TLS", SmtpTlsMode::Starttls),
                html_body: env_bool("SMTP_HTML_BODY", false),
            }),
            _ => None,
        };

        AppConfig {
            bind_host: env::var("CAMPAIGN_BIND_HOST").unwrap_or(defaults.bind_host),
            bind_port: env_parse("CAMPAIGN_BIND_PORT", defaults.bind_port),
            data_dir: env::var("CAMPAIGN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            templates_file: env::var("CAMPAIGN_TEMPLATES_FILE").ok().map(PathBuf::from),
            default_language: env::var("CAMPAIGN_DEFAULT_LANGUAGE")
                .unwrap_or(defaults.default_language),
            send_limit: env_parse("CAMPAIGN_SEND_LIMIT", defaults.send_limit),
            delay_min: env_parse("CAMPAIGN_DELAY_MIN", defaults.delay_min),
            delay_max: env_parse("CAMPAIGN_DELAY_MAX", defaults.delay_max),
            test_mode: env_bool("CAMPAIGN_TEST_MODE", defaults.test_mode),
            smtp,
        }
    }

    /// Parámetros de campaña por defecto según esta configuración
    pub fn campaign_defaults(&self) -> CampaignSettings {
        CampaignSettings {
            send_limit: self.send_limit,
            delay_min: self.delay_min,
            delay_max: self.delay_max,
            test_mode: self.test_mode,
            default_language: self.default_language.clone(),
            ..CampaignSettings::default()
        }
    }
}

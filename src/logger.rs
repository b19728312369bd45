//! logger.rs
//! Configuración del logger usando env_logger.

/// Nivel por defecto si no hay RUST_LOG: info para el servicio, warn para sqlx.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

pub fn init_logger() {
    let log_env = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    // try_init: en tests se puede llamar más de una vez
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_env))
        .format_timestamp_secs()
        .format_module_path(false)
        .try_init();
}

use std::io;
use std::path::Path;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::campaign_service::CampaignService;
use crate::services::operation_service::OperationService;

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(data_dir: &Path) -> anyhow::Result<Pool<Sqlite>> {
    // 1) Crear carpeta de datos
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("No se pudo crear directorio '{}'", data_dir.display()))?;

    // 2) Ruta final: <data_dir>/campaigns.db
    let db_path = data_dir.join("campaigns.db");
    log::info!("Conectando a SQLite en {}", db_path.display());

    // 3) Conectarnos con SQLx
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite.")?;

    Ok(db_pool)
}

fn to_io(e: anyhow::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{:#}", e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();

    // Conectarnos a la DB
    let db_pool = setup_database(&config.data_dir).await.map_err(to_io)?;

    // OperationService
    let operation_service = OperationService::new(db_pool.clone());
    operation_service.run_migrations().await.map_err(to_io)?;

    let bind = (config.bind_host.clone(), config.bind_port);
    let templates_file = config.templates_file.clone();
    let campaign_service = CampaignService::new(operation_service, config);

    if let Some(path) = templates_file {
        match campaign_service.load_templates_file(&path).await {
            Ok(()) => log::info!("Plantillas cargadas desde {}", path.display()),
            Err(e) => log::warn!("No se pudieron cargar plantillas de {}: {:#}", path.display(), e),
        }
    }

    // Levantar servidor
    log::info!("Levantando servidor en {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(4 * 1024 * 1024))
            .app_data(web::Data::new(campaign_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind(bind)?
    .run()
    .await
}

//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod attachment_assembler;
pub mod campaign_service;
pub mod dispatcher;
pub mod language_resolver;
pub mod mail_transport;
pub mod operation_service;
pub mod personalizer;
pub mod template_store;

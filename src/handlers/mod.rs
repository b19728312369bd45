//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (campañas, plantillas, operaciones).
pub mod campaign_handler;
pub mod operation_handler;
pub mod template_handler;

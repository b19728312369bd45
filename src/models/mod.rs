//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod campaign_model;
pub mod email_model;
pub mod operation_model;
pub mod request_model;
pub mod template_model;

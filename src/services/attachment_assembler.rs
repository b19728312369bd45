//! services/attachment_assembler.rs

use crate::models::campaign_model::{AttachmentConfig, Recipient};

/// Lista final de adjuntos de un contacto: primero los del idioma, luego los comunes,
/// y al final el adjunto propio del contacto (columna `attachment`).
/// Los archivos no se resuelven acá; los faltantes los reporta el transporte.
pub fn assemble(language: &str, recipient: &Recipient, config: &AttachmentConfig) -> Vec<String> {
    let mut files: Vec<String> = config
        .by_language
        .get(language)
        .cloned()
        .unwrap_or_default();

    files.extend(config.common.iter().cloned());

    if let Some(own) = recipient.attachment() {
        files.push(own.to_string());
    }

    files
}

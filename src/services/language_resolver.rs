//! services/language_resolver.rs
//! Decide qué idioma de plantilla usar para cada contacto.

use crate::errors::{CampaignError, CampaignResult};
use crate::models::campaign_model::Recipient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub language: String,
    /// Aviso cuando hubo que caer a otro idioma
    pub note: Option<String>,
}

/// Prioridad: idioma declarado, luego el idioma por defecto, luego el primero cargado.
pub fn resolve(
    recipient: &Recipient,
    default_language: &str,
    loaded_languages: &[String],
) -> CampaignResult<Resolution> {
    let first = loaded_languages
        .first()
        .ok_or(CampaignError::NoTemplatesLoaded)?;

    let declared = recipient.language();
    let is_loaded = |lang: &str| loaded_languages.iter().any(|l| l == lang);

    if let Some(lang) = declared.as_deref() {
        if is_loaded(lang) {
            return Ok(Resolution {
                language: lang.to_string(),
                note: None,
            });
        }
    }

    if is_loaded(default_language) {
        let note = declared.map(|lang| {
            format!(
                "Language '{}' not available, using default '{}'",
                lang, default_language
            )
        });
        return Ok(Resolution {
            language: default_language.to_string(),
            note,
        });
    }

    let note = match declared {
        Some(lang) => format!(
            "Neither language '{}' nor default '{}' available, using '{}'",
            lang, default_language, first
        ),
        None => format!(
            "Default language '{}' not available, using '{}'",
            default_language, first
        ),
    };
    Ok(Resolution {
        language: first.clone(),
        note: Some(note),
    })
}

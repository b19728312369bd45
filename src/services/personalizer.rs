//! services/personalizer.rs
//! Sustitución de variables `{clave}` en cuerpos y asuntos.

use std::sync::OnceLock;

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};

use crate::models::campaign_model::{CampaignVariables, Recipient};
use crate::services::template_store::TemplateStore;

/// Claves del remitente que admiten override por idioma (`<clave>_<idioma>`).
pub const SENDER_CONTEXT_KEYS: [&str; 5] = [
    "sender_name",
    "sender_title",
    "sender_contact",
    "meeting_duration",
    "call_to_action",
];

pub const FALLBACK_LANGUAGE: &str = "en";
pub const FALLBACK_SUBJECT: &str = "{sender_name}";

const SOURCE_INFO_KEY: &str = "source_info";

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("regex de placeholder inválida"))
}

/// Tabla de sustitución: variables de campaña, campos del contacto encima,
/// y luego los overrides por idioma de las claves del remitente.
fn build_table(
    recipient: &Recipient,
    language: &str,
    vars: Option<&CampaignVariables>,
) -> IndexMap<String, Option<String>> {
    let mut table: IndexMap<String, Option<String>> = IndexMap::new();

    if let Some(vars) = vars {
        for (k, v) in vars.iter() {
            table.insert(k.clone(), Some(v.clone()));
        }
    }

    for (k, v) in recipient.fields() {
        table.insert(k.clone(), v.clone());
    }

    if let Some(vars) = vars {
        for key in SENDER_CONTEXT_KEYS {
            if let Some(localized) = vars.localized(key, language) {
                table.insert(key.to_string(), Some(localized.to_string()));
            }
        }
    }

    table
}

fn source_info(recipient: &Recipient) -> String {
    recipient
        .source()
        .map(|s| format!(" on {}", s))
        .unwrap_or_default()
}

fn substitute(
    template: &str,
    recipient: &Recipient,
    language: &str,
    vars: Option<&CampaignVariables>,
) -> String {
    let table = build_table(recipient, language, vars);
    let source_info = source_info(recipient);
    let mut unresolved: Vec<String> = Vec::new();

    let re = placeholder_regex();
    let rendered = re.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        if key == SOURCE_INFO_KEY {
            return source_info.clone();
        }
        match table.get(key) {
            Some(Some(value)) => value.clone(),
            _ => {
                unresolved.push(key.to_string());
                String::new()
            }
        }
    });

    // Un valor sustituido puede traer sus propios `{...}`; se limpian hasta que no quede ninguno.
    let mut output = rendered.into_owned();
    while re.is_match(&output) {
        for caps in re.captures_iter(&output) {
            unresolved.push(caps[1].to_string());
        }
        output = re.replace_all(&output, "").into_owned();
    }

    if !unresolved.is_empty() {
        log::warn!(
            "(personalize) Placeholders sin valor eliminados para {}: {:?}",
            recipient.email(),
            unresolved
        );
    }
    output
}

/// Personaliza un cuerpo de plantilla para un contacto en el idioma dado.
/// Nunca deja tokens `{...}` en la salida.
pub fn render(
    body: &str,
    recipient: &Recipient,
    language: &str,
    vars: Option<&CampaignVariables>,
) -> String {
    substitute(body, recipient, language, vars)
}

/// Elige al azar una variante de asunto del idioma (o de "en") y la personaliza.
pub fn render_subject<R: Rng + ?Sized>(
    store: &TemplateStore,
    recipient: &Recipient,
    language: &str,
    vars: Option<&CampaignVariables>,
    rng: &mut R,
) -> String {
    let variants = store
        .subjects(language)
        .or_else(|| store.subjects(FALLBACK_LANGUAGE));

    let chosen = variants
        .and_then(|v| v.choose(rng))
        .map(String::as_str)
        .unwrap_or(FALLBACK_SUBJECT);

    substitute(chosen, recipient, language, vars)
}

//! models/template_model.rs
//! Formato de persistencia de plantillas y paquetes de plantillas por defecto.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAMPAIGN_TYPE: &str = "custom";

/// Formato JSON: `{campaign_type, templates, subjects}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(default = "default_campaign_type")]
    pub campaign_type: String,
    pub templates: IndexMap<String, String>,
    pub subjects: IndexMap<String, Vec<String>>,
}

fn default_campaign_type() -> String {
    DEFAULT_CAMPAIGN_TYPE.to_string()
}

/// Request para actualizar el cuerpo y asuntos de un idioma
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLanguageTemplateRequest {
    pub body: String,
    /// Una variante por elemento; también se acepta un texto con una por línea.
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub subjects_text: Option<String>,
}

const NETWORKING_EN: &str = "Dear {name},

I came across your profile{source_info} and was impressed by your work as {position} at {company}.

My name is {sender_name}, {sender_title}. I am reaching out to learn more about your experience and the challenges your team is working on.

Would you be open to a {meeting_duration} call in the coming weeks? {call_to_action}

Best regards,
{sender_name}
{sender_title}
{sender_contact}";

const NETWORKING_FR: &str = "Bonjour {name},

J'ai découvert votre profil{source_info} et votre parcours en tant que {position} chez {company} m'a beaucoup intéressé.

Je m'appelle {sender_name}, {sender_title}. Je me permets de vous contacter afin d'en apprendre davantage sur votre expérience.

Seriez-vous disponible pour un échange de {meeting_duration} dans les prochaines semaines ? {call_to_action}

Cordialement,
{sender_name}
{sender_title}
{sender_contact}";

const JOB_APPLICATION_EN: &str = "Dear {name},

I am writing to express my interest in opportunities at {company}. I found your contact{source_info} and believe my background would be a strong fit for your team.

I am {sender_name}, {sender_title}. Please find my resume attached for your consideration.

I would welcome a {meeting_duration} conversation to discuss how I could contribute. {call_to_action}

Sincerely,
{sender_name}
{sender_contact}";

const JOB_APPLICATION_FR: &str = "Bonjour {name},

Je vous écris afin de vous faire part de mon intérêt pour les opportunités au sein de {company}. J'ai trouvé votre contact{source_info} et je pense que mon profil correspond à votre équipe.

Je suis {sender_name}, {sender_title}. Vous trouverez mon CV en pièce jointe.

Je serais ravi d'échanger {meeting_duration} avec vous. {call_to_action}

Cordialement,
{sender_name}
{sender_contact}";

fn pack(
    campaign_type: &str,
    bodies: [(&str, &str); 2],
    subjects: [(&str, [&str; 3]); 2],
) -> TemplateData {
    TemplateData {
        campaign_type: campaign_type.to_string(),
        templates: bodies
            .iter()
            .map(|(lang, body)| (lang.to_string(), body.to_string()))
            .collect(),
        subjects: subjects
            .iter()
            .map(|(lang, variants)| {
                (
                    lang.to_string(),
                    variants.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect(),
    }
}

/// Paquetes predefinidos: "networking" y "job_application", en inglés y francés.
pub fn default_templates() -> IndexMap<String, TemplateData> {
    let mut packs = IndexMap::new();
    packs.insert(
        "networking".to_string(),
        pack(
            "networking",
            [("en", NETWORKING_EN), ("fr", NETWORKING_FR)],
            [
                (
                    "en",
                    [
                        "Connecting with {name}",
                        "Quick question about your work at {company}",
                        "{sender_name} - networking request",
                    ],
                ),
                (
                    "fr",
                    [
                        "Prise de contact avec {name}",
                        "Question sur votre travail chez {company}",
                        "{sender_name} - demande d'échange",
                    ],
                ),
            ],
        ),
    );
    packs.insert(
        "job_application".to_string(),
        pack(
            "job_application",
            [("en", JOB_APPLICATION_EN), ("fr", JOB_APPLICATION_FR)],
            [
                (
                    "en",
                    [
                        "Application - {sender_name}",
                        "Interest in opportunities at {company}",
                        "{sender_title} interested in joining {company}",
                    ],
                ),
                (
                    "fr",
                    [
                        "Candidature - {sender_name}",
                        "Intérêt pour les opportunités chez {company}",
                        "{sender_title} intéressé par {company}",
                    ],
                ),
            ],
        ),
    );
    packs
}

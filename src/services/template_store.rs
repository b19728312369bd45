//! services/template_store.rs
//! Plantillas por idioma: un cuerpo y una o más variantes de asunto.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::{CampaignError, CampaignResult};
use crate::models::template_model::{default_templates, TemplateData, DEFAULT_CAMPAIGN_TYPE};

/// Se clona como snapshot inmutable para cada corrida.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateStore {
    campaign_type: String,
    templates: IndexMap<String, String>,
    subjects: IndexMap<String, Vec<String>>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        TemplateStore {
            campaign_type: DEFAULT_CAMPAIGN_TYPE.to_string(),
            templates: IndexMap::new(),
            subjects: IndexMap::new(),
        }
    }
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn campaign_type(&self) -> &str {
        &self.campaign_type
    }

    /// No se valida la sintaxis de los placeholders.
    pub fn set_template(&mut self, language: &str, body: &str) {
        self.templates
            .insert(language.to_string(), body.to_string());
    }

    /// Las variantes se recortan y se descartan las vacías.
    pub fn set_subjects<S: AsRef<str>>(&mut self, language: &str, variants: &[S]) {
        let variants: Vec<String> = variants
            .iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.subjects.insert(language.to_string(), variants);
    }

    pub fn body(&self, language: &str) -> Option<&str> {
        self.templates.get(language).map(String::as_str)
    }

    /// `None` si el idioma no tiene variantes (o la lista quedó vacía).
    pub fn subjects(&self, language: &str) -> Option<&[String]> {
        self.subjects
            .get(language)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    /// Idiomas con cuerpo cargado, en orden de inserción.
    pub fn languages(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn export(&self) -> TemplateData {
        TemplateData {
            campaign_type: self.campaign_type.clone(),
            templates: self.templates.clone(),
            subjects: self.subjects.clone(),
        }
    }

    /// Reemplaza el contenido a partir del JSON de persistencia.
    /// Falla con `MalformedTemplateData` si faltan `templates` o `subjects`.
    pub fn import(&mut self, data: Value) -> CampaignResult<()> {
        let obj = data.as_object().ok_or_else(|| {
            CampaignError::MalformedTemplateData("expected a JSON object".to_string())
        })?;

        let missing: Vec<&str> = ["templates", "subjects"]
            .into_iter()
            .filter(|k| !obj.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(CampaignError::MalformedTemplateData(format!(
                "missing top-level field(s): {}",
                missing.join(", ")
            )));
        }

        let parsed: TemplateData = serde_json::from_value(data)?;
        self.replace_with(parsed);
        Ok(())
    }

    fn replace_with(&mut self, data: TemplateData) {
        self.campaign_type = data.campaign_type;
        self.templates = data.templates;
        self.subjects = IndexMap::new();
        for (lang, variants) in data.subjects {
            self.set_subjects(&lang, &variants);
        }
    }

    /// Carga uno de los paquetes predefinidos ("networking", "job_application").
    pub fn load_defaults(&mut self, campaign_type: &str) -> CampaignResult<()> {
        let mut packs = default_templates();
        let data = packs.swap_remove(campaign_type).ok_or_else(|| {
            CampaignError::InvalidConfiguration(format!(
                "unknown template type '{}', expected one of: {}",
                campaign_type,
                default_templates()
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        self.replace_with(data);
        log::info!("(load_defaults) Plantillas '{}' cargadas", campaign_type);
        Ok(())
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.export())?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("No se pudo guardar plantillas en {:?}", path))?;
        log::info!("(save_to_file) Plantillas guardadas en {:?}", path);
        Ok(())
    }

    pub async fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("No se pudo leer plantillas desde {:?}", path))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("JSON inválido en {:?}", path))?;
        self.import(value)?;
        log::info!(
            "(load_from_file) {} idiomas cargados desde {:?}",
            self.templates.len(),
            path
        );
        Ok(())
    }
}

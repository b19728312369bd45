//! services/dispatcher.rs
//! Recorre los contactos en orden, envía y registra cada intento.
//!
//! Estados: `Idle -> Validating -> Sending(i) -> Completed`, con `Aborted`
//! como alternativa terminal desde `Validating`. El envío es secuencial: la
//! pausa aleatoria entre envíos es el mecanismo de rate limiting.

use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::errors::{CampaignError, CampaignResult};
use crate::models::campaign_model::{
    AttachmentConfig, CampaignStats, CampaignVariables, ContactList, LanguageStats, LogEntry,
    SendStatus,
};
use crate::services::mail_transport::{MailTransport, OutgoingMessage};
use crate::services::template_store::TemplateStore;
use crate::services::{attachment_assembler, language_resolver, personalizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Validating,
    Sending(usize),
    Completed,
    Aborted,
}

/// Parámetros de una corrida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSettings {
    pub variables: Option<CampaignVariables>,
    pub attachments: AttachmentConfig,
    /// Máximo de envíos *exitosos* en la corrida
    pub send_limit: u32,
    /// Segundos
    pub delay_min: u64,
    pub delay_max: u64,
    pub test_mode: bool,
    pub default_language: String,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        CampaignSettings {
            variables: None,
            attachments: AttachmentConfig::default(),
            send_limit: 5,
            delay_min: 30,
            delay_max: 60,
            test_mode: true,
            default_language: "en".to_string(),
        }
    }
}

impl CampaignSettings {
    pub fn validate(&self) -> CampaignResult<()> {
        if self.send_limit == 0 {
            return Err(CampaignError::InvalidConfiguration(
                "send limit must be a positive integer".to_string(),
            ));
        }
        if self.delay_min > self.delay_max {
            return Err(CampaignError::InvalidConfiguration(format!(
                "delay_min ({}) must not exceed delay_max ({})",
                self.delay_min, self.delay_max
            )));
        }
        Ok(())
    }
}

/// Una corrida de campaña. Es dueña exclusiva de su log y contadores.
pub struct Dispatcher<'a, R: Rng> {
    store: &'a TemplateStore,
    transport: &'a dyn MailTransport,
    rng: R,
    abort: Option<watch::Receiver<bool>>,
    state: DispatcherState,
}

impl<'a, R: Rng> Dispatcher<'a, R> {
    /// `store` es el snapshot de plantillas para esta corrida.
    pub fn new(store: &'a TemplateStore, transport: &'a dyn MailTransport, rng: R) -> Self {
        Dispatcher {
            store,
            transport,
            rng,
            abort: None,
            state: DispatcherState::Idle,
        }
    }

    /// Señal externa para cortar la corrida (se revisa antes de cada contacto y durante la pausa).
    pub fn with_abort_signal(mut self, abort: watch::Receiver<bool>) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    fn abort_requested(&self) -> bool {
        self.abort.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Duerme la pausa entre envíos. Devuelve `true` si llegó la señal de abortar.
    async fn pause(&mut self, delay: Duration) -> bool {
        match self.abort.as_mut() {
            None => {
                tokio::time::sleep(delay).await;
                false
            }
            Some(rx) => {
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    if *rx.borrow() {
                        return true;
                    }
                    tokio::select! {
                        _ = &mut sleep => return false,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                // El emisor ya no existe: no puede llegar un abort
                                (&mut sleep).await;
                                return false;
                            }
                        }
                    }
                }
            }
        }
    }

    fn validate(
        &mut self,
        contacts: &ContactList,
        settings: &CampaignSettings,
    ) -> CampaignResult<()> {
        self.state = DispatcherState::Validating;

        let missing = contacts.missing_required_columns();
        if !missing.is_empty() {
            return Err(CampaignError::MissingRequiredColumns(missing));
        }
        if self.store.is_empty() {
            return Err(CampaignError::NoTemplatesLoaded);
        }
        settings.validate()
    }

    /// Ejecuta la campaña. Los errores de validación abortan antes de cualquier envío;
    /// las fallas por mensaje se registran y la corrida continúa.
    pub async fn run(
        &mut self,
        contacts: &ContactList,
        settings: &CampaignSettings,
    ) -> CampaignResult<CampaignStats> {
        if let Err(e) = self.validate(contacts, settings) {
            log::error!("(dispatch) Validación fallida: {}", e);
            self.state = DispatcherState::Aborted;
            return Err(e);
        }

        let loaded = self.store.languages();
        let vars = settings.variables.as_ref();
        let total = contacts.len();

        let mut log_entries: Vec<LogEntry> = Vec::new();
        let mut language_stats: IndexMap<String, LanguageStats> = IndexMap::new();
        let mut successful: u32 = 0;
        let mut failed: u32 = 0;
        let mut cancelled = false;

        log::info!(
            "(dispatch) Iniciando campaña: contactos={}, límite={}, test_mode={}, idiomas={:?}",
            total,
            settings.send_limit,
            settings.test_mode,
            loaded
        );

        for (i, recipient) in contacts.recipients.iter().enumerate() {
            if self.abort_requested() {
                log::warn!("(dispatch) Abort recibido antes del contacto #{}", i);
                cancelled = true;
                break;
            }
            if successful >= settings.send_limit {
                log::info!(
                    "(dispatch) Límite de envíos alcanzado ({}), quedan {} contactos sin procesar",
                    settings.send_limit,
                    total - i
                );
                break;
            }

            self.state = DispatcherState::Sending(i);

            let resolution =
                language_resolver::resolve(recipient, &settings.default_language, &loaded)?;
            if let Some(note) = &resolution.note {
                log::warn!(
                    "(dispatch) {} <{}>: {}",
                    recipient.name(),
                    recipient.email(),
                    note
                );
            }
            let language = resolution.language;

            let body_template = self
                .store
                .body(&language)
                .ok_or(CampaignError::NoTemplatesLoaded)?;
            let body = personalizer::render(body_template, recipient, &language, vars);
            let subject = personalizer::render_subject(
                self.store,
                recipient,
                &language,
                vars,
                &mut self.rng,
            );
            let attachments =
                attachment_assembler::assemble(&language, recipient, &settings.attachments);

            let mut entry = LogEntry {
                timestamp: Utc::now(),
                name: recipient.name().to_string(),
                email: recipient.email().to_string(),
                language: language.clone(),
                original_language: recipient.language(),
                subject: subject.clone(),
                attachments_count: attachments.len(),
                status: None,
                note: resolution.note.clone(),
                error: None,
                missing_attachments: Vec::new(),
            };

            let lang_stats = language_stats.entry(language.clone()).or_default();
            lang_stats.attempted += 1;

            if settings.test_mode {
                entry.status = Some(SendStatus::TestSuccess);
                successful += 1;
                lang_stats.successful += 1;
                log::info!(
                    "(dispatch) [TEST] #{} {} <{}> lang={} asunto='{}'",
                    i,
                    entry.name,
                    entry.email,
                    language,
                    subject
                );
            } else {
                let message = OutgoingMessage {
                    to_name: entry.name.clone(),
                    to_email: entry.email.clone(),
                    subject,
                    body,
                    attachments,
                };
                match self.transport.send(&message).await {
                    Ok(report) => {
                        entry.status = Some(SendStatus::Success);
                        entry.missing_attachments = report.missing_attachments;
                        successful += 1;
                        lang_stats.successful += 1;
                        log::info!(
                            "(dispatch) #{} enviado a {} <{}> lang={} via {}",
                            i,
                            entry.name,
                            entry.email,
                            language,
                            self.transport.name()
                        );
                    }
                    Err(e) => {
                        entry.status = Some(SendStatus::Failed);
                        entry.error = Some(e.to_string());
                        failed += 1;
                        lang_stats.failed += 1;
                        log::error!(
                            "(dispatch) #{} falló envío a {} <{}>: {}",
                            i,
                            entry.name,
                            entry.email,
                            e
                        );
                    }
                }
            }

            let sent_live = entry.status == Some(SendStatus::Success);
            log_entries.push(entry);

            let is_last = i + 1 == total;
            if sent_live && !is_last && successful < settings.send_limit {
                let secs = self.rng.gen_range(settings.delay_min..=settings.delay_max);
                log::info!("(dispatch) Esperando {}s antes del siguiente envío", secs);
                if self.pause(Duration::from_secs(secs)).await {
                    log::warn!("(dispatch) Abort recibido durante la pausa");
                    cancelled = true;
                    break;
                }
            }
        }

        self.state = DispatcherState::Completed;
        let stats = CampaignStats {
            total_contacts: total,
            successful_sends: successful,
            failed_sends: failed,
            completion_time: Utc::now(),
            test_mode: settings.test_mode,
            campaign_log: log_entries,
            language_statistics: language_stats,
            available_templates: loaded,
            cancelled,
        };

        log::info!(
            "(dispatch) Campaña finalizada: exitosos={}, fallidos={}, cancelada={}",
            stats.successful_sends,
            stats.failed_sends,
            stats.cancelled
        );
        Ok(stats)
    }
}

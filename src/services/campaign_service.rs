//! services/campaign_service.rs
//! Orquesta las corridas: snapshot de plantillas, modos de idioma, transporte,
//! seguimiento en DB y corridas en segundo plano.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::sync::{watch, RwLock};

use crate::config::app_config::AppConfig;
use crate::errors::{CampaignError, CampaignResult};
use crate::models::campaign_model::{
    CampaignRunOutcome, CampaignVariables, ContactList, Recipient,
};
use crate::models::operation_model::{CampaignSummaryReport, CampaignSummaryRow};
use crate::models::request_model::{
    CampaignRunResponse, LanguageMode, LanguageRunResult, PreviewRequest, PreviewResponse,
    RunCampaignRequest, AUTO_DETECT_LABEL,
};
use crate::models::template_model::{TemplateData, UpdateLanguageTemplateRequest};
use crate::services::dispatcher::{CampaignSettings, Dispatcher};
use crate::services::mail_transport::{DryRunTransport, MailTransport, SmtpMailTransport};
use crate::services::operation_service::OperationService;
use crate::services::template_store::TemplateStore;
use crate::services::{language_resolver, personalizer};

/// Una corrida ya preparada: idioma de campaña, contactos y parámetros.
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub campaign_language: String,
    pub contacts: ContactList,
    pub settings: CampaignSettings,
}

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<RwLock<TemplateStore>>,
    op_service: OperationService,
    config: Arc<AppConfig>,
    running: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
}

fn parse_variables(raw: Option<Value>) -> CampaignResult<Option<CampaignVariables>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => CampaignVariables::from_json(&text).map(Some),
        Some(other) => CampaignVariables::from_value(other).map(Some),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Resumen (totales y tasa de éxito) de las corridas de una operación.
pub fn build_summary(operation_id: &str, results: &[LanguageRunResult]) -> CampaignSummaryReport {
    let runs: Vec<CampaignSummaryRow> = results
        .iter()
        .filter_map(|r| {
            r.outcome.stats().map(|stats| CampaignSummaryRow {
                campaign_language: r.campaign_language.clone(),
                total_contacts: stats.total_contacts,
                successful_sends: stats.successful_sends,
                failed_sends: stats.failed_sends,
                success_rate: stats.success_rate(),
                test_mode: stats.test_mode,
                completion_time: stats.completion_time.to_rfc3339(),
            })
        })
        .collect();

    let total_contacts: usize = runs.iter().map(|r| r.total_contacts).sum();
    let successful_sends: u32 = runs.iter().map(|r| r.successful_sends).sum();
    let failed_sends: u32 = runs.iter().map(|r| r.failed_sends).sum();
    let rate = successful_sends as f64 / total_contacts.max(1) as f64 * 100.0;

    CampaignSummaryReport {
        operation_id: operation_id.to_string(),
        runs,
        total_contacts,
        successful_sends,
        failed_sends,
        success_rate: (rate * 100.0).round() / 100.0,
    }
}

impl CampaignService {
    pub fn new(op_service: OperationService, config: AppConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(TemplateStore::new())),
            op_service,
            config: Arc::new(config),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // ========================================================================
    // Plantillas
    // ========================================================================

    /// Copia inmutable de las plantillas actuales
    pub async fn snapshot(&self) -> TemplateStore {
        self.store.read().await.clone()
    }

    pub async fn export_templates(&self) -> TemplateData {
        self.store.read().await.export()
    }

    /// Si hay `templates_file` configurado, guarda ahí las plantillas actuales.
    async fn persist_templates(&self, store: &TemplateStore) {
        if let Some(path) = &self.config.templates_file {
            if let Err(e) = store.save_to_file(path).await {
                log::warn!("(persist_templates) {:#}", e);
            }
        }
    }

    pub async fn import_templates(&self, data: Value) -> CampaignResult<Vec<String>> {
        let mut store = self.store.write().await;
        store.import(data)?;
        self.persist_templates(&store).await;
        Ok(store.languages())
    }

    pub async fn set_language_template(
        &self,
        language: &str,
        req: UpdateLanguageTemplateRequest,
    ) -> Vec<String> {
        let mut subjects = req.subjects;
        if let Some(text) = req.subjects_text {
            subjects.extend(text.lines().map(str::to_string));
        }
        let mut store = self.store.write().await;
        store.set_template(language, &req.body);
        store.set_subjects(language, &subjects);
        self.persist_templates(&store).await;
        store.languages()
    }

    pub async fn load_default_templates(&self, campaign_type: &str) -> CampaignResult<Vec<String>> {
        let mut store = self.store.write().await;
        store.load_defaults(campaign_type)?;
        self.persist_templates(&store).await;
        Ok(store.languages())
    }

    pub async fn load_templates_file(&self, path: &std::path::Path) -> Result<()> {
        let mut store = self.store.write().await;
        store.load_from_file(path).await
    }

    /// Renderiza cuerpo y asunto de un contacto sin enviar nada
    pub async fn preview(&self, req: PreviewRequest) -> CampaignResult<PreviewResponse> {
        let store = self.snapshot().await;
        if store.is_empty() {
            return Err(CampaignError::NoTemplatesLoaded);
        }
        let vars = parse_variables(req.variables)?;

        let language = match req.language {
            Some(lang) => lang.trim().to_lowercase(),
            None => {
                language_resolver::resolve(
                    &req.recipient,
                    &self.config.default_language,
                    &store.languages(),
                )?
                .language
            }
        };
        let body_template = store.body(&language).ok_or_else(|| {
            CampaignError::InvalidConfiguration(format!(
                "No template available for language: {}",
                language
            ))
        })?;

        let mut rng = make_rng(req.seed);
        Ok(PreviewResponse {
            body: personalizer::render(body_template, &req.recipient, &language, vars.as_ref()),
            subject: personalizer::render_subject(
                &store,
                &req.recipient,
                &language,
                vars.as_ref(),
                &mut rng,
            ),
            language,
        })
    }

    // ========================================================================
    // Corridas
    // ========================================================================

    /// Arma las corridas según el modo de idioma. Falla si la configuración no es válida.
    pub fn plan_runs(
        &self,
        contacts: ContactList,
        settings: CampaignSettings,
        mode: &LanguageMode,
        loaded: &[String],
    ) -> CampaignResult<Vec<PlannedRun>> {
        // En modo auto el dispatcher valida columnas y plantillas en su orden
        if loaded.is_empty() && *mode != LanguageMode::Auto {
            return Err(CampaignError::NoTemplatesLoaded);
        }
        match mode {
            LanguageMode::Auto => Ok(vec![PlannedRun {
                campaign_language: AUTO_DETECT_LABEL.to_string(),
                contacts,
                settings,
            }]),
            LanguageMode::Single { language } => {
                let language = language.trim().to_lowercase();
                if !loaded.iter().any(|l| *l == language) {
                    return Err(CampaignError::InvalidConfiguration(format!(
                        "No template available for language: {}",
                        language
                    )));
                }
                Ok(vec![PlannedRun {
                    campaign_language: language.clone(),
                    contacts: contacts.with_language(&language),
                    settings: CampaignSettings {
                        default_language: language,
                        ..settings
                    },
                }])
            }
            LanguageMode::Multi { languages } => {
                if languages.is_empty() {
                    return Err(CampaignError::InvalidConfiguration(
                        "Please select at least one language".to_string(),
                    ));
                }
                let mut runs = Vec::new();
                for language in languages {
                    let language = language.trim().to_lowercase();
                    if !loaded.iter().any(|l| *l == language) {
                        log::warn!(
                            "(plan_runs) No hay plantilla para '{}', se omite esa corrida",
                            language
                        );
                        continue;
                    }
                    runs.push(PlannedRun {
                        campaign_language: language.clone(),
                        contacts: contacts.with_language(&language),
                        settings: CampaignSettings {
                            default_language: language,
                            ..settings.clone()
                        },
                    });
                }
                if runs.is_empty() {
                    return Err(CampaignError::InvalidConfiguration(format!(
                        "No template available for any selected language: {}",
                        languages.join(", ")
                    )));
                }
                Ok(runs)
            }
        }
    }

    /// Ejecuta una sola corrida con el transporte dado. Devuelve stats o `{error}`.
    pub async fn run_once(
        &self,
        contacts: &ContactList,
        settings: &CampaignSettings,
        transport: &dyn MailTransport,
        seed: Option<u64>,
        abort: Option<watch::Receiver<bool>>,
    ) -> CampaignRunOutcome {
        let snapshot = self.snapshot().await;
        let mut dispatcher = Dispatcher::new(&snapshot, transport, make_rng(seed));
        if let Some(rx) = abort {
            dispatcher = dispatcher.with_abort_signal(rx);
        }
        dispatcher.run(contacts, settings).await.into()
    }

    /// Transporte según el modo: dry-run en test, SMTP (request o entorno) en vivo.
    fn transport_for(
        &self,
        test_mode: bool,
        smtp: Option<crate::models::email_model::SmtpSettings>,
    ) -> CampaignResult<Arc<dyn MailTransport>> {
        if test_mode {
            return Ok(Arc::new(DryRunTransport));
        }
        let settings = smtp.or_else(|| self.config.smtp.clone()).ok_or_else(|| {
            CampaignError::InvalidConfiguration(
                "SMTP settings are required when test mode is off".to_string(),
            )
        })?;
        Ok(Arc::new(SmtpMailTransport::new(settings)?))
    }

    fn settings_from(
        &self,
        req: &mut RunCampaignRequest,
    ) -> CampaignResult<(ContactList, CampaignSettings)> {
        let recipients = std::mem::take(&mut req.contacts);
        let contacts = match req.columns.take() {
            Some(columns) => ContactList::with_columns(columns, recipients),
            None => ContactList::new(recipients),
        };

        let defaults = self.config.campaign_defaults();
        let settings = CampaignSettings {
            variables: parse_variables(req.variables.take())?,
            attachments: std::mem::take(&mut req.attachments),
            send_limit: req.send_limit.unwrap_or(defaults.send_limit),
            delay_min: req.delay_min.unwrap_or(defaults.delay_min),
            delay_max: req.delay_max.unwrap_or(defaults.delay_max),
            test_mode: req.test_mode.unwrap_or(defaults.test_mode),
            default_language: req
                .default_language
                .take()
                .map(|l| l.trim().to_lowercase())
                .unwrap_or(defaults.default_language),
        };
        Ok((contacts, settings))
    }

    /// Punto de entrada de la API: usa el transporte SMTP/dry-run que corresponda.
    pub async fn run_campaign(&self, req: RunCampaignRequest) -> Result<CampaignRunResponse> {
        let test_mode = req.test_mode.unwrap_or(self.config.test_mode);
        match self.transport_for(test_mode, req.smtp.clone()) {
            Ok(transport) => self.run_with_transport(req, transport).await,
            Err(e) => {
                log::error!("(run_campaign) Configuración de transporte inválida: {}", e);
                self.record_rejected(req.async_run, e).await
            }
        }
    }

    /// Igual que `run_campaign` pero con un transporte explícito.
    pub async fn run_with_transport(
        &self,
        mut req: RunCampaignRequest,
        transport: Arc<dyn MailTransport>,
    ) -> Result<CampaignRunResponse> {
        let loaded = self.store.read().await.languages();
        let planned = self
            .settings_from(&mut req)
            .and_then(|(contacts, settings)| self.plan_runs(contacts, settings, &req.mode, &loaded));
        let planned = match planned {
            Ok(p) => p,
            Err(e) => return self.record_rejected(req.async_run, e).await,
        };

        let op_id = self.op_service.create_operation(req.async_run).await?;
        log::info!(
            "(run_campaign) Operación {} creada: corridas={}, async={}",
            op_id,
            planned.len(),
            req.async_run
        );

        let (abort_tx, abort_rx) = watch::channel(false);
        self.register_abort(&op_id, abort_tx);

        if req.async_run {
            let service = self.clone();
            let task_op_id = op_id.clone();
            let seed = req.seed;
            tokio::spawn(async move {
                match service
                    .execute_operation(&task_op_id, planned, transport, seed, abort_rx)
                    .await
                {
                    Ok(_) => log::info!("Async campaign {} finished", task_op_id),
                    Err(e) => log::error!("Failed async campaign {}: {:?}", task_op_id, e),
                }
            });
            return Ok(CampaignRunResponse {
                success: true,
                operation_id: op_id,
                status: "pending".to_string(),
                results: Vec::new(),
            });
        }

        let (status, results) = self
            .execute_operation(&op_id, planned, transport, req.seed, abort_rx)
            .await?;
        Ok(CampaignRunResponse {
            success: status != "failed",
            operation_id: op_id,
            status,
            results,
        })
    }

    /// Registra como fallida una operación rechazada en validación y devuelve `{error}`.
    async fn record_rejected(
        &self,
        is_async: bool,
        err: CampaignError,
    ) -> Result<CampaignRunResponse> {
        let op_id = self.op_service.create_operation(is_async).await?;
        let message = err.to_string();
        let results = vec![LanguageRunResult {
            campaign_language: AUTO_DETECT_LABEL.to_string(),
            outcome: CampaignRunOutcome::Failed {
                error: message.clone(),
            },
        }];
        let metadata = json!({
            "results": results,
            "summary": build_summary(&op_id, &results),
        });
        self.op_service
            .finish_operation(&op_id, "failed", Some(&message), &metadata)
            .await?;
        Ok(CampaignRunResponse {
            success: false,
            operation_id: op_id,
            status: "failed".to_string(),
            results,
        })
    }

    /// Corre las corridas en orden, guardando el log de cada una. Devuelve si hubo abort.
    /// Los resultados ya calculados quedan en `results` aunque falle la DB.
    async fn run_planned(
        &self,
        op_id: &str,
        planned: Vec<PlannedRun>,
        transport: &dyn MailTransport,
        seed: Option<u64>,
        abort_rx: &watch::Receiver<bool>,
        results: &mut Vec<LanguageRunResult>,
    ) -> Result<bool> {
        self.op_service
            .update_operation_status(op_id, "running", None)
            .await?;

        let mut position: i64 = 0;
        let mut cancelled = false;

        for run in planned {
            if *abort_rx.borrow() {
                cancelled = true;
                break;
            }
            log::info!(
                "(execute_operation) op_id={} corrida '{}' con {} contactos",
                op_id,
                run.campaign_language,
                run.contacts.len()
            );
            let outcome = self
                .run_once(
                    &run.contacts,
                    &run.settings,
                    transport,
                    seed,
                    Some(abort_rx.clone()),
                )
                .await;

            let stored = match outcome.stats() {
                Some(stats) => {
                    cancelled |= stats.cancelled;
                    self.op_service
                        .insert_log_entries(
                            op_id,
                            &run.campaign_language,
                            position,
                            &stats.campaign_log,
                        )
                        .await
                        .map(Some)
                }
                None => Ok(None),
            };
            results.push(LanguageRunResult {
                campaign_language: run.campaign_language,
                outcome,
            });
            if let Some(next) = stored.context("No se pudo guardar el log de la campaña")? {
                position = next;
            }
            if cancelled {
                break;
            }
        }
        Ok(cancelled)
    }

    /// Corre todas las corridas planificadas y guarda el resultado final.
    /// Siempre libera la señal de abort y cierra la operación, aun con errores de DB.
    async fn execute_operation(
        &self,
        op_id: &str,
        planned: Vec<PlannedRun>,
        transport: Arc<dyn MailTransport>,
        seed: Option<u64>,
        abort_rx: watch::Receiver<bool>,
    ) -> Result<(String, Vec<LanguageRunResult>)> {
        let mut results: Vec<LanguageRunResult> = Vec::new();
        let run = self
            .run_planned(
                op_id,
                planned,
                transport.as_ref(),
                seed,
                &abort_rx,
                &mut results,
            )
            .await;

        self.unregister_abort(op_id);

        let (cancelled, storage_error) = match run {
            Ok(cancelled) => (cancelled, None),
            Err(e) => {
                log::error!("(execute_operation) op_id={} error de DB: {:#}", op_id, e);
                (false, Some(format!("{:#}", e)))
            }
        };

        let mut errors: Vec<&str> = results.iter().filter_map(|r| r.outcome.error()).collect();
        let status = if storage_error.is_some() {
            "failed"
        } else if cancelled {
            "cancelled"
        } else if !results.is_empty() && errors.len() == results.len() {
            "failed"
        } else {
            "done"
        };
        if let Some(e) = storage_error.as_deref() {
            errors.push(e);
        }
        let error_message = (!errors.is_empty()).then(|| errors.join("; "));

        let metadata = json!({
            "results": results,
            "summary": build_summary(op_id, &results),
        });
        self.op_service
            .finish_operation(op_id, status, error_message.as_deref(), &metadata)
            .await
            .context("No se pudo guardar el resultado de la campaña")?;

        log::info!(
            "(execute_operation) op_id={} finalizada con estado '{}'",
            op_id,
            status
        );
        Ok((status.to_string(), results))
    }

    // ========================================================================
    // Cancelación
    // ========================================================================

    fn register_abort(&self, op_id: &str, tx: watch::Sender<bool>) {
        if let Ok(mut running) = self.running.lock() {
            running.insert(op_id.to_string(), tx);
        }
    }

    fn unregister_abort(&self, op_id: &str) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(op_id);
        }
    }

    /// Pide cortar una corrida en curso. `false` si no hay corrida activa con ese id.
    pub fn abort(&self, op_id: &str) -> bool {
        let running = match self.running.lock() {
            Ok(r) => r,
            Err(_) => return false,
        };
        match running.get(op_id) {
            Some(tx) => {
                log::warn!("(abort) Cancelando campaña {}", op_id);
                tx.send(true).is_ok()
            }
            None => false,
        }
    }

    // ========================================================================
    // Consultas
    // ========================================================================

    pub async fn get_summary(&self, op_id: &str) -> Result<Value> {
        let record = self.op_service.get_operation(op_id).await?;
        record
            .metadata
            .and_then(|m| m.get("summary").cloned())
            .ok_or_else(|| anyhow!("Campaign {} has not finished yet", op_id))
    }

    pub async fn export_log_csv(&self, op_id: &str) -> Result<String> {
        // Verifica que la operación exista
        self.op_service.get_operation(op_id).await?;
        self.op_service.export_logs_csv(op_id).await
    }

    pub fn operations(&self) -> &OperationService {
        &self.op_service
    }

    pub fn sample_recipients(&self) -> Vec<Recipient> {
        crate::models::campaign_model::sample_contacts().recipients
    }
}

//! tests/campaign_service_tests.rs
//! Corridas completas contra SQLite en memoria.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_rt::test;
    use serde_json::{json, Value};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use crate::config::app_config::AppConfig;
    use crate::models::campaign_model::Recipient;
    use crate::models::request_model::{PreviewRequest, RunCampaignRequest};
    use crate::models::template_model::UpdateLanguageTemplateRequest;
    use crate::services::campaign_service::CampaignService;
    use crate::services::mail_transport::DryRunTransport;
    use crate::services::operation_service::OperationService;
    use crate::tests::support::RecordingTransport;

    async fn create_test_service_with_pool() -> (CampaignService, SqlitePool) {
        // Una sola conexión: cada conexión a ":memory:" es una base distinta
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory SQLite");
        let op_service = OperationService::new(pool.clone());
        op_service
            .run_migrations()
            .await
            .expect("Failed to run migrations");
        (CampaignService::new(op_service, AppConfig::default()), pool)
    }

    async fn create_test_service() -> CampaignService {
        create_test_service_with_pool().await.0
    }

    fn request(body: Value) -> RunCampaignRequest {
        serde_json::from_value(body).expect("Invalid test request")
    }

    fn three_contacts() -> Value {
        json!([
            { "name": "John", "email": "john@example.com", "language": "en", "company": "TechCorp" },
            { "name": "Marie", "email": "marie@example.fr", "language": "fr", "company": "InnovateFR" },
            { "name": "Hans", "email": "hans@example.de", "language": "de", "company": "Bau" }
        ])
    }

    #[test]
    async fn test_mode_run_is_persisted_with_log_and_summary() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "variables": { "sender_name": "Jane" },
                    "test_mode": true,
                    "seed": 3
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.status, "done");
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].campaign_language, "auto-detect");
        let stats = resp.results[0].outcome.stats().unwrap();
        assert_eq!(stats.successful_sends, 3);

        let record = service
            .operations()
            .get_operation(&resp.operation_id)
            .await
            .unwrap();
        assert_eq!(record.status, "done");

        let csv = service.export_log_csv(&resp.operation_id).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("campaign_language,position,timestamp"));
        assert!(lines[3].contains("hans@example.de"));
        assert!(lines[3].contains("test_success"));

        let summary = service.get_summary(&resp.operation_id).await.unwrap();
        assert_eq!(summary["total_contacts"], 3);
        assert_eq!(summary["success_rate"], 100.0);
    }

    #[test]
    async fn multi_mode_runs_each_loaded_language() {
        let service = create_test_service().await;
        service.load_default_templates("job_application").await.unwrap();

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": true,
                    "mode": { "type": "multi", "languages": ["fr", "de", "en"] }
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        let languages: Vec<&str> = resp
            .results
            .iter()
            .map(|r| r.campaign_language.as_str())
            .collect();
        assert_eq!(languages, vec!["fr", "en"]);
        for result in &resp.results {
            let stats = result.outcome.stats().unwrap();
            assert!(stats
                .campaign_log
                .iter()
                .all(|e| e.language == result.campaign_language));
        }

        let logs = service
            .operations()
            .list_logs(&resp.operation_id)
            .await
            .unwrap();
        assert_eq!(logs.len(), 6);
        let positions: Vec<i64> = logs.iter().map(|l| l.position).collect();
        assert_eq!(positions, (0..6).collect::<Vec<i64>>());
    }

    #[test]
    async fn validation_failure_is_reported_as_error_object() {
        let service = create_test_service().await;

        let resp = service
            .run_with_transport(
                request(json!({ "contacts": three_contacts(), "test_mode": true })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, "failed");
        assert_eq!(
            resp.results[0].outcome.error(),
            Some("No email templates loaded")
        );

        let record = service
            .operations()
            .get_operation(&resp.operation_id)
            .await
            .unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(
            record.error_message.as_deref(),
            Some("No email templates loaded")
        );
    }

    #[test]
    async fn live_mode_without_smtp_is_rejected() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();

        let resp = service
            .run_campaign(request(json!({
                "contacts": three_contacts(),
                "test_mode": false
            })))
            .await
            .unwrap();

        assert!(!resp.success);
        assert!(resp.results[0]
            .outcome
            .error()
            .unwrap()
            .contains("SMTP settings are required"));
    }

    #[test]
    async fn empty_multi_language_selection_is_rejected() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "mode": { "type": "multi", "languages": [] }
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, "failed");
    }

    #[test]
    async fn multi_mode_on_empty_store_fails() {
        let service = create_test_service().await;

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": true,
                    "mode": { "type": "multi", "languages": ["en"] }
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, "failed");
        assert_eq!(
            resp.results[0].outcome.error(),
            Some("No email templates loaded")
        );
        let record = service
            .operations()
            .get_operation(&resp.operation_id)
            .await
            .unwrap();
        assert_eq!(record.status, "failed");
    }

    #[test]
    async fn multi_mode_with_no_loaded_selection_fails() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": true,
                    "mode": { "type": "multi", "languages": ["de", "it"] }
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, "failed");
        assert!(resp.results[0]
            .outcome
            .error()
            .unwrap()
            .contains("No template available"));
    }

    #[test]
    async fn single_mode_with_unloaded_language_fails() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();
        let transport = Arc::new(RecordingTransport::default());

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": false,
                    "delay_min": 0,
                    "delay_max": 0,
                    "mode": { "type": "single", "language": "de" }
                })),
                transport.clone(),
            )
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, "failed");
        assert_eq!(
            resp.results[0].outcome.error(),
            Some("Invalid configuration: No template available for language: de")
        );
        assert!(transport.sent_to().is_empty());
    }

    #[test]
    async fn log_storage_failure_finishes_operation_as_failed() {
        let (service, pool) = create_test_service_with_pool().await;
        service.load_default_templates("networking").await.unwrap();
        sqlx::query("DROP TABLE campaign_logs")
            .execute(&pool)
            .await
            .unwrap();

        let resp = service
            .run_with_transport(
                request(json!({ "contacts": three_contacts(), "test_mode": true })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.status, "failed");
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].outcome.stats().unwrap().successful_sends, 3);

        let record = service
            .operations()
            .get_operation(&resp.operation_id)
            .await
            .unwrap();
        assert_eq!(record.status, "failed");
        assert!(record
            .error_message
            .unwrap()
            .contains("No se pudo guardar el log"));
        // El canal de aborto ya no está registrado
        assert!(!service.abort(&resp.operation_id));
    }

    #[test]
    async fn single_mode_live_run_uses_transport() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();
        let transport = Arc::new(RecordingTransport::default());

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": false,
                    "delay_min": 0,
                    "delay_max": 0,
                    "send_limit": 2,
                    "mode": { "type": "single", "language": "FR" }
                })),
                transport.clone(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status, "done");
        assert_eq!(resp.results[0].campaign_language, "fr");
        assert_eq!(
            transport.sent_to(),
            vec!["john@example.com", "marie@example.fr"]
        );
        let sent = transport.sent.lock().unwrap().clone();
        assert!(sent[0].body.starts_with("Bonjour John"));
    }

    #[test]
    async fn async_run_finishes_in_background() {
        let service = create_test_service().await;
        service.load_default_templates("networking").await.unwrap();

        let resp = service
            .run_with_transport(
                request(json!({
                    "contacts": three_contacts(),
                    "test_mode": true,
                    "async_run": true
                })),
                Arc::new(DryRunTransport),
            )
            .await
            .unwrap();
        assert_eq!(resp.status, "pending");
        assert!(resp.results.is_empty());

        let mut status = String::new();
        for _ in 0..200 {
            status = service
                .operations()
                .get_operation(&resp.operation_id)
                .await
                .unwrap()
                .status;
            if status == "done" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, "done");
        assert!(service.get_summary(&resp.operation_id).await.is_ok());
    }

    #[test]
    async fn unknown_operations() {
        let service = create_test_service().await;
        assert!(!service.abort("missing-id"));
        let err = service.export_log_csv("missing-id").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    async fn language_template_update_and_preview() {
        let service = create_test_service().await;
        let languages = service
            .set_language_template(
                "es",
                UpdateLanguageTemplateRequest {
                    body: "Hola {name}, soy {sender_name}".to_string(),
                    subjects: vec![],
                    subjects_text: Some("Hola {name}\n\n".to_string()),
                },
            )
            .await;
        assert_eq!(languages, vec!["es"]);

        let preview = service
            .preview(PreviewRequest {
                recipient: Recipient::new("Lucia", "lucia@example.es").with("language", "es"),
                language: None,
                variables: Some(json!({ "sender_name": "Jane", "sender_name_es": "Juana" })),
                seed: Some(1),
            })
            .await
            .unwrap();

        assert_eq!(preview.language, "es");
        assert_eq!(preview.subject, "Hola Lucia");
        assert_eq!(preview.body, "Hola Lucia, soy Juana");

        let exported = service.export_templates().await;
        assert_eq!(exported.subjects["es"], vec!["Hola {name}"]);
    }

    #[test]
    async fn import_rejects_malformed_templates() {
        let service = create_test_service().await;
        let err = service
            .import_templates(json!({ "templates": {} }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("subjects"));
    }
}

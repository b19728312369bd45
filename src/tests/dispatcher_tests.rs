//! tests/dispatcher_tests.rs
//! Pruebas de la corrida secuencial: límites, fallas, pausas y abort.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::sync::watch;

    use crate::errors::CampaignError;
    use crate::models::campaign_model::{AttachmentConfig, ContactList, Recipient, SendStatus};
    use crate::services::dispatcher::{CampaignSettings, Dispatcher, DispatcherState};
    use crate::services::template_store::TemplateStore;
    use crate::tests::support::{contacts, en_fr_store, RecordingTransport};

    fn live_settings(send_limit: u32) -> CampaignSettings {
        CampaignSettings {
            send_limit,
            delay_min: 0,
            delay_max: 0,
            test_mode: false,
            ..CampaignSettings::default()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[actix_rt::test]
    async fn test_mode_stops_at_send_limit_without_sending() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com"]);
        let settings = CampaignSettings {
            send_limit: 3,
            test_mode: true,
            ..CampaignSettings::default()
        };

        let mut dispatcher = Dispatcher::new(&store, &transport, rng());
        let stats = dispatcher.run(&list, &settings).await.unwrap();

        assert_eq!(dispatcher.state(), DispatcherState::Completed);
        assert_eq!(stats.total_contacts, 5);
        assert_eq!(stats.successful_sends, 3);
        assert_eq!(stats.failed_sends, 0);
        assert_eq!(stats.campaign_log.len(), 3);
        assert!(stats
            .campaign_log
            .iter()
            .all(|e| e.status == Some(SendStatus::TestSuccess)));
        assert!(transport.sent_to().is_empty());
        assert_eq!(stats.success_rate(), 60.0);
        assert_eq!(stats.available_templates, vec!["en", "fr"]);
    }

    #[actix_rt::test]
    async fn transport_failure_is_logged_and_run_continues() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["a@x.com", "fail@x.com", "c@x.com"]);

        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &live_settings(5))
            .await
            .unwrap();

        assert_eq!(stats.successful_sends, 2);
        assert_eq!(stats.failed_sends, 1);
        let failed = &stats.campaign_log[1];
        assert_eq!(failed.status, Some(SendStatus::Failed));
        assert!(failed.error.as_deref().unwrap().contains("550"));
        assert_eq!(transport.sent_to(), vec!["a@x.com", "c@x.com"]);
    }

    #[actix_rt::test]
    async fn send_limit_counts_only_successes() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["fail1@x.com", "a@x.com", "b@x.com", "c@x.com"]);

        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &live_settings(2))
            .await
            .unwrap();

        assert_eq!(stats.campaign_log.len(), 3);
        assert_eq!(stats.successful_sends, 2);
        assert_eq!(transport.sent_to(), vec!["a@x.com", "b@x.com"]);
    }

    #[actix_rt::test]
    async fn message_is_personalized_per_resolved_language() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = ContactList::new(vec![
            Recipient::new("Marie", "marie@x.fr")
                .with("company", "InnovateFR")
                .with("language", "fr"),
            Recipient::new("Hans", "hans@x.de")
                .with("company", "Bau")
                .with("language", "de"),
        ]);

        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &live_settings(5))
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent[0].body, "Bonjour Marie de InnovateFR");
        assert_eq!(sent[0].subject, "Salut Marie");
        assert_eq!(sent[1].body, "Hello Hans from Bau");

        let hans = &stats.campaign_log[1];
        assert_eq!(hans.language, "en");
        assert_eq!(hans.original_language.as_deref(), Some("de"));
        assert!(hans.note.is_some());

        assert_eq!(stats.language_statistics["fr"].successful, 1);
        assert_eq!(stats.language_statistics["en"].attempted, 1);
    }

    #[actix_rt::test]
    async fn attachments_are_counted_in_order() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = ContactList::new(vec![Recipient::new("Ann", "ann@x.com")
            .with("company", "Acme")
            .with("attachment", "own.pdf")]);
        let mut attachments = AttachmentConfig {
            common: vec!["common.pdf".to_string()],
            ..AttachmentConfig::default()
        };
        attachments
            .by_language
            .insert("en".to_string(), vec!["resume_en.pdf".to_string()]);
        let settings = CampaignSettings {
            attachments,
            ..live_settings(5)
        };

        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &settings)
            .await
            .unwrap();

        assert_eq!(stats.campaign_log[0].attachments_count, 3);
        assert_eq!(
            transport.sent.lock().unwrap()[0].attachments,
            vec!["resume_en.pdf", "common.pdf", "own.pdf"]
        );
    }

    #[actix_rt::test]
    async fn missing_columns_abort_before_sending() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = ContactList::new(vec![Recipient::default().with("name", "No Email")]);

        let mut dispatcher = Dispatcher::new(&store, &transport, rng());
        let err = dispatcher
            .run(&list, &live_settings(5))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CampaignError::MissingRequiredColumns(vec!["email".to_string()])
        );
        assert_eq!(err.to_string(), "Missing required columns: email");
        assert_eq!(dispatcher.state(), DispatcherState::Aborted);
        assert!(transport.sent_to().is_empty());
    }

    #[actix_rt::test]
    async fn empty_store_aborts() {
        let store = TemplateStore::new();
        let transport = RecordingTransport::default();

        let err = Dispatcher::new(&store, &transport, rng())
            .run(&contacts(&["a@x.com"]), &live_settings(5))
            .await
            .unwrap_err();
        assert_eq!(err, CampaignError::NoTemplatesLoaded);
    }

    #[actix_rt::test]
    async fn inverted_delays_are_rejected() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let settings = CampaignSettings {
            delay_min: 10,
            delay_max: 5,
            ..live_settings(5)
        };

        let err = Dispatcher::new(&store, &transport, rng())
            .run(&contacts(&["a@x.com"]), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidConfiguration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_live_sends_only() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["a@x.com", "b@x.com", "c@x.com"]);
        let settings = CampaignSettings {
            delay_min: 30,
            delay_max: 60,
            ..live_settings(5)
        };

        let started = tokio::time::Instant::now();
        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &settings)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        // Dos pausas: ninguna después del último contacto
        assert_eq!(stats.successful_sends, 3);
        assert!(elapsed >= Duration::from_secs(60), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_secs(120), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_once_limit_is_reached() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["a@x.com", "b@x.com", "c@x.com"]);
        let settings = CampaignSettings {
            delay_min: 30,
            delay_max: 30,
            ..live_settings(1)
        };

        let started = tokio::time::Instant::now();
        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &settings)
            .await
            .unwrap();

        assert_eq!(stats.campaign_log.len(), 1);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_after_failed_send() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["fail@x.com", "b@x.com"]);
        let settings = CampaignSettings {
            delay_min: 30,
            delay_max: 30,
            ..live_settings(5)
        };

        let started = tokio::time::Instant::now();
        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &settings)
            .await
            .unwrap();

        assert_eq!(stats.failed_sends, 1);
        assert_eq!(stats.successful_sends, 1);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_never_pauses() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let list = contacts(&["a@x.com", "b@x.com", "c@x.com"]);
        let settings = CampaignSettings {
            delay_min: 30,
            delay_max: 60,
            test_mode: true,
            ..live_settings(5)
        };

        let started = tokio::time::Instant::now();
        let stats = Dispatcher::new(&store, &transport, rng())
            .run(&list, &settings)
            .await
            .unwrap();

        assert_eq!(stats.successful_sends, 3);
        assert!(transport.sent_to().is_empty());
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_during_pause_cancels_run() {
        let store = en_fr_store();
        let (tx, rx) = watch::channel(false);
        let transport = RecordingTransport {
            abort_on_first: Some(tx),
            ..RecordingTransport::default()
        };
        let list = contacts(&["a@x.com", "b@x.com", "c@x.com"]);
        let settings = CampaignSettings {
            delay_min: 30,
            delay_max: 60,
            ..live_settings(5)
        };

        let started = tokio::time::Instant::now();
        let stats = Dispatcher::new(&store, &transport, rng())
            .with_abort_signal(rx)
            .run(&list, &settings)
            .await
            .unwrap();

        assert!(stats.cancelled);
        assert_eq!(stats.campaign_log.len(), 1);
        assert_eq!(transport.sent_to(), vec!["a@x.com"]);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[actix_rt::test]
    async fn abort_before_start_processes_nobody() {
        let store = en_fr_store();
        let transport = RecordingTransport::default();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let stats = Dispatcher::new(&store, &transport, rng())
            .with_abort_signal(rx)
            .run(&contacts(&["a@x.com"]), &live_settings(5))
            .await
            .unwrap();

        assert!(stats.cancelled);
        assert!(stats.campaign_log.is_empty());
    }
}

//! tests/support.rs
//! Helpers compartidos: transporte falso, plantillas y contactos de prueba.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::errors::{CampaignError, CampaignResult};
use crate::models::campaign_model::{ContactList, Recipient};
use crate::services::mail_transport::{DeliveryReport, MailTransport, OutgoingMessage};
use crate::services::template_store::TemplateStore;

/// Guarda los mensajes y falla para direcciones que contienen "fail".
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutgoingMessage>>,
    /// Si está, se dispara el abort al primer envío
    pub abort_on_first: Option<watch::Sender<bool>>,
}

impl RecordingTransport {
    pub fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.to_email.clone())
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutgoingMessage) -> CampaignResult<DeliveryReport> {
        if let Some(tx) = &self.abort_on_first {
            let _ = tx.send(true);
        }
        if message.to_email.contains("fail") {
            return Err(CampaignError::TransportFailure(
                "550 mailbox unavailable".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(DeliveryReport {
            attached: message.attachments.len(),
            missing_attachments: Vec::new(),
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn en_fr_store() -> TemplateStore {
    let mut store = TemplateStore::new();
    store.set_template("en", "Hello {name} from {company}");
    store.set_subjects("en", &["Hi {name}"]);
    store.set_template("fr", "Bonjour {name} de {company}");
    store.set_subjects("fr", &["Salut {name}"]);
    store
}

pub fn contacts(emails: &[&str]) -> ContactList {
    ContactList::new(
        emails
            .iter()
            .enumerate()
            .map(|(i, email)| {
                Recipient::new(&format!("Contact {}", i), email).with("company", "Acme")
            })
            .collect(),
    )
}

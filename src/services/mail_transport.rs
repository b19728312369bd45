//! services/mail_transport.rs
//! Frontera con el servidor SMTP: un mensaje MIME por llamada.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentDisposition, ContentType},
        Body, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use crate::errors::{CampaignError, CampaignResult};
use crate::models::email_model::{SmtpSettings, SmtpTlsMode};

/// Tiempo máximo para entregar un mensaje
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Mensaje ya personalizado, listo para enviar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
    /// Rutas de archivos, en orden
    pub attachments: Vec<String>,
}

/// Resultado de un envío exitoso.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub attached: usize,
    /// Archivos que no se pudieron leer (el mensaje salió sin ellos)
    pub missing_attachments: Vec<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> CampaignResult<DeliveryReport>;

    fn name(&self) -> &'static str;
}

/// Transporte SMTP con lettre. Se abre una conexión por mensaje.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> CampaignResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    fn build_mailer(&self) -> CampaignResult<AsyncSmtpTransport<Tokio1Executor>> {
        let s = &self.settings;
        let builder = match s.tls {
            SmtpTlsMode::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&s.smtp_host)?
            }
            SmtpTlsMode::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&s.smtp_host)?,
            SmtpTlsMode::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&s.smtp_host)
            }
        };

        Ok(builder
            .port(s.smtp_port)
            .credentials(Credentials::new(s.smtp_user.clone(), s.smtp_pass.clone()))
            .build())
    }

    fn text_part(&self, body: &str) -> SinglePart {
        let content_type = if self.settings.html_body {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };
        SinglePart::builder()
            .header(content_type)
            .body(body.to_string())
    }

    /// Lee un adjunto; `AttachmentNotFound` si no existe o no se puede leer.
    async fn attachment_part(path: &str) -> CampaignResult<SinglePart> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| CampaignError::AttachmentNotFound(format!("{} ({})", path, e)))?;

        let filename = Path::new(path)
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());

        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let content_type = ContentType::parse(mime.essence_str()).map_err(|e| {
            CampaignError::TransportFailure(format!("Invalid content type for {}: {}", path, e))
        })?;

        Ok(SinglePart::builder()
            .header(content_type)
            .header(ContentDisposition::attachment(&filename))
            .body(Body::new(data)))
    }

    pub async fn build_message(
        &self,
        msg: &OutgoingMessage,
    ) -> CampaignResult<(Message, DeliveryReport)> {
        let s = &self.settings;
        let from_address: Address = s.smtp_user.parse()?;
        let from = Mailbox::new(s.from_name.clone(), from_address);

        let to_address: Address = msg.to_email.trim().parse()?;
        let to_name = Some(msg.to_name.trim().to_string()).filter(|n| !n.is_empty());
        let to = Mailbox::new(to_name, to_address);

        let mut multipart = MultiPart::mixed().singlepart(self.text_part(&msg.body));
        let mut report = DeliveryReport::default();

        for path in &msg.attachments {
            match Self::attachment_part(path).await {
                Ok(part) => {
                    multipart = multipart.singlepart(part);
                    report.attached += 1;
                }
                Err(e) => {
                    log::warn!("(smtp) {} -> se envía sin este adjunto", e);
                    report.missing_attachments.push(path.clone());
                }
            }
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(msg.subject.as_str())
            .multipart(multipart)?;

        Ok((message, report))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, msg: &OutgoingMessage) -> CampaignResult<DeliveryReport> {
        log::debug!(
            "(smtp) Enviando a {} via {}:{} (adjuntos={})",
            msg.to_email,
            self.settings.smtp_host,
            self.settings.smtp_port,
            msg.attachments.len()
        );

        let (message, report) = self.build_message(msg).await?;
        let mailer = self.build_mailer()?;

        tokio::time::timeout(SEND_TIMEOUT, mailer.send(message))
            .await
            .map_err(|_| CampaignError::TransportFailure("SMTP send timed out".to_string()))??;

        log::info!(
            "(smtp) Correo entregado a {} ({} adjuntos)",
            msg.to_email,
            report.attached
        );
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }
}

/// Transporte para modo test: nunca abre conexiones.
#[derive(Debug, Clone, Default)]
pub struct DryRunTransport;

#[async_trait]
impl MailTransport for DryRunTransport {
    async fn send(&self, msg: &OutgoingMessage) -> CampaignResult<DeliveryReport> {
        log::debug!("(dry_run) Mensaje para {} no enviado", msg.to_email);
        Ok(DeliveryReport {
            attached: msg.attachments.len(),
            missing_attachments: Vec::new(),
        })
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

use crate::config::AppConfig;
use anyhow::Result;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Which notification template is being sent. Callers treat delivery as
/// best-effort: failures are logged at the dispatch site and swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewResponse,
    ResponseAccepted,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<()>;
}

/// Async SMTP transport wrapper. If `SMTP_HOST` is not configured the
/// notifier operates in no-op mode and only logs, which keeps development
/// and test environments free of email infrastructure.
pub struct SmtpNotifier {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!("invalid SMTP_FROM address: {e}"))?;

        let transport = match &config.smtp_host {
            None => {
                warn!("SMTP host not configured; notifications will be logged only");
                None
            }
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                    .port(config.smtp_port);

                if let (Some(username), Some(password)) =
                    (&config.smtp_username, &config.smtp_password)
                {
                    builder = builder
                        .credentials(Credentials::new(username.clone(), password.clone()));
                }

                Some(Arc::new(builder.build()))
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        kind: NotificationKind,
        recipient: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!("[no-op notifier] {:?} -> {}: {}", kind, recipient, subject);
            return Ok(());
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse::<Mailbox>()?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))?;

        transport.send(message).await?;
        info!("notification {:?} sent to {}", kind, recipient);
        Ok(())
    }
}

/// Notification bodies. Plaintext and HTML are built together so the two
/// parts never drift apart.
pub mod templates {
    /// Sent to the post author when a new response arrives.
    pub fn new_response(
        post_title: &str,
        responder: &str,
        content: &str,
    ) -> (String, String, String) {
        let subject = format!("New response to \"{post_title}\"");
        let text = format!(
            "{responder} responded to your listing \"{post_title}\":\n\n{content}\n\nOpen your responses page to accept or reject it."
        );
        let html = format!(
            "<p><strong>{responder}</strong> responded to your listing \
             <strong>{post_title}</strong>:</p><blockquote>{content}</blockquote>\
             <p>Open your responses page to accept or reject it.</p>"
        );
        (subject, text, html)
    }

    /// Sent to the responder when the post author accepts their response.
    pub fn response_accepted(post_title: &str) -> (String, String, String) {
        let subject = format!("Your response to \"{post_title}\" was accepted");
        let text = format!(
            "Good news: the author of \"{post_title}\" accepted your response.\nYou can now arrange the deal with them."
        );
        let html = format!(
            "<p>Good news: the author of <strong>{post_title}</strong> accepted \
             your response.</p><p>You can now arrange the deal with them.</p>"
        );
        (subject, text, html)
    }
}

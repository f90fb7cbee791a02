//! SMTP transport (async lettre). Gmail by default; STARTTLS on 587,
//! implicit TLS on 465. The transport and its connection pool are built on
//! the first send and reused afterwards.

use async_trait::async_trait;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rsvp_core::config::MailConfig;
use rsvp_core::error::{Result, RsvpError};
use rsvp_core::traits::MailTransport;
use rsvp_core::types::{DeliveryReceipt, OutgoingMail};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpMailer {
    config: MailConfig,
    transport: Mutex<Option<AsyncSmtpTransport<Tokio1Executor>>>,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
        }
    }

    fn send_failed(to: &str, cause: String) -> RsvpError {
        RsvpError::SendFailed {
            recipient: to.to_string(),
            cause,
            diagnostic: None,
        }
    }

    /// Build the MIME message: plain HTML, or multipart/related with the
    /// inline image when the mail carries one. Returns the message and the
    /// Message-ID assigned to it.
    pub fn build_message(&self, mail: &OutgoingMail) -> Result<(Message, String)> {
        let sender: Address = self
            .config
            .username
            .parse()
            .map_err(|e| RsvpError::Auth(format!("Invalid sender address: {e}")))?;
        let from = Mailbox::new(Some(self.config.from_name.clone()), sender);

        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| Self::send_failed(&mail.to, format!("Invalid recipient: {e}")))?;

        let message_id = next_message_id(&self.config.username);
        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.clone())
            .message_id(Some(message_id.clone()));

        let html = SinglePart::html(mail.html.clone());
        let built = match &mail.attachment {
            Some(att) => {
                let content_type = ContentType::parse(&att.content_type).map_err(|e| {
                    Self::send_failed(&mail.to, format!("Attachment content type: {e}"))
                })?;
                let inline = Attachment::new_inline(att.content_id.clone())
                    .body(att.bytes.clone(), content_type);
                builder.multipart(MultiPart::related().singlepart(html).singlepart(inline))
            }
            None => builder.singlepart(html),
        };

        let message =
            built.map_err(|e| Self::send_failed(&mail.to, format!("Build email: {e}")))?;
        Ok((message, message_id))
    }

    /// Shared transport. Credentials are checked on every call; the relay is
    /// built once and cloned (clones share the connection pool).
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        if self.config.username.is_empty() || self.config.password.is_empty() {
            return Err(RsvpError::Auth(
                "SMTP credentials are not set (GMAIL_USER / GMAIL_PASS)".into(),
            ));
        }

        let mut slot = self.transport.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(transport) = slot.as_ref() {
            return Ok(transport.clone());
        }
        let transport = self.build_transport()?;
        tracing::debug!(
            "📮 SMTP transport ready: {}:{}",
            self.config.smtp_host,
            self.config.smtp_port
        );
        *slot = Some(transport.clone());
        Ok(transport)
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let relay = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
        };
        let builder = relay
            .map_err(|e| RsvpError::Config(format!("SMTP relay {}: {e}", self.config.smtp_host)))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        Ok(builder
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(self.config.send_timeout_secs)))
            .build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt> {
        let mailer = self.transport()?;
        let (message, message_id) = self.build_message(mail)?;

        match mailer.send(message).await {
            Ok(response) => {
                let line = format!(
                    "{} {}",
                    response.code(),
                    response.message().collect::<Vec<_>>().join(" ")
                );
                if response.is_positive() {
                    Ok(DeliveryReceipt {
                        message_id: Some(message_id),
                        response: line,
                    })
                } else {
                    Err(RsvpError::SendFailed {
                        recipient: mail.to.clone(),
                        cause: "server did not accept the message".into(),
                        diagnostic: Some(line),
                    })
                }
            }
            Err(e) => Err(RsvpError::SendFailed {
                recipient: mail.to.clone(),
                cause: format!("SMTP send: {e}"),
                diagnostic: e.status().map(|code| code.to_string()),
            }),
        }
    }
}

/// `<hex-nanos.seq@sender-domain>`
fn next_message_id(sender: &str) -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let domain = sender
        .rsplit_once('@')
        .map(|(_, d)| d)
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost");
    format!("<{nanos:x}.{seq}@{domain}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_core::types::InlineAttachment;

    fn config() -> MailConfig {
        MailConfig {
            username: "couple@gmail.com".into(),
            password: "app-password".into(),
            ..MailConfig::default()
        }
    }

    fn mail(attachment: Option<InlineAttachment>) -> OutgoingMail {
        OutgoingMail {
            to: "alice@x.com".into(),
            subject: "Cảm ơn".into(),
            html: "<p>hi</p><img src=\"cid:just_married_image\">".into(),
            attachment,
        }
    }

    fn is_built(mailer: &SmtpMailer) -> bool {
        mailer.transport.lock().unwrap().is_some()
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_html_only_message() {
        let (message, id) = SmtpMailer::new(config()).build_message(&mail(None)).unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("multipart/related"));
        assert!(raw.contains(&id));
        assert!(id.ends_with("@gmail.com>"));
    }

    #[test]
    fn test_inline_image_message() {
        let att = InlineAttachment {
            filename: "just.png".into(),
            content_id: "just_married_image".into(),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };
        let (message, _) = SmtpMailer::new(config())
            .build_message(&mail(Some(att)))
            .unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <just_married_image>"));
        assert!(raw.contains("image/png"));
    }

    #[test]
    fn test_invalid_recipient() {
        let mut bad = mail(None);
        bad.to = "not an address".into();
        let err = SmtpMailer::new(config()).build_message(&bad).unwrap_err();
        assert!(matches!(err, RsvpError::SendFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_at_send() {
        let mailer = SmtpMailer::new(MailConfig::default());
        let err = mailer.send(&mail(None)).await.unwrap_err();
        assert!(matches!(err, RsvpError::Auth(_)));
        assert!(!is_built(&mailer));
    }

    #[tokio::test]
    async fn test_transport_built_once_and_reused() {
        let mailer = SmtpMailer::new(config());
        assert!(!is_built(&mailer));

        mailer.transport().unwrap();
        assert!(is_built(&mailer));
        mailer.transport().unwrap();
        assert!(is_built(&mailer));
    }

    #[tokio::test]
    async fn test_credentials_checked_even_with_cached_transport() {
        let mut mailer = SmtpMailer::new(config());
        mailer.transport().unwrap();
        mailer.config.password.clear();
        assert!(matches!(mailer.transport(), Err(RsvpError::Auth(_))));
    }

    #[test]
    fn test_message_ids_unique() {
        let a = next_message_id("x@y.com");
        let b = next_message_id("x@y.com");
        assert_ne!(a, b);
        assert!(next_message_id("nobody").ends_with("@localhost>"));
    }
}

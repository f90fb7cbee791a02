//! Notification dispatcher — picks a template for a row and hands the
//! rendered message to the transport. Never retries; a failed row stays
//! eligible for the next pass because the caller does not record it.

use rsvp_core::error::{Result, RsvpError};
use rsvp_core::traits::MailTransport;
use rsvp_core::types::{DeliveryReceipt, RsvpRow};

use crate::attachment::InlineImage;
use crate::templates::Template;

pub struct Dispatcher {
    transport: Box<dyn MailTransport>,
    image: InlineImage,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn MailTransport>, image: InlineImage) -> Self {
        Self { transport, image }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Send the reply for `row`. `Ok` means the transport accepted it.
    pub async fn notify(&self, row: &RsvpRow) -> Result<DeliveryReceipt> {
        if row.recipient.is_none() {
            return Err(RsvpError::SendFailed {
                recipient: row.raw_email.clone(),
                cause: format!("row {} has no email address", row.row_number),
                diagnostic: None,
            });
        }
        let to = row.raw_email.as_str();

        let template = Template::for_row(row);
        let image = if template.wants_image() {
            self.image.probe()
        } else {
            None
        };
        let mail = template.render(to, image);

        tracing::info!("✉️ Sending {} email to {to}", template.label());
        match self.transport.send(&mail).await {
            Ok(receipt) => {
                tracing::info!(
                    "✅ Email sent successfully to {to}. Message ID: {}",
                    receipt.message_id.as_deref().unwrap_or("-")
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!("❌ Error sending email to {to}: {e}");
                if let Some(diag) = e.diagnostic() {
                    tracing::error!("   {} response: {diag}", self.transport.name());
                }
                Err(e)
            }
        }
    }
}

//! # RSVP Relay Mail
//!
//! Reply templates, the notification dispatcher, and the SMTP transport.

pub mod attachment;
pub mod dispatcher;
pub mod smtp;
pub mod templates;

pub use attachment::InlineImage;
pub use dispatcher::Dispatcher;
pub use smtp::SmtpMailer;
pub use templates::Template;

use rsvp_core::config::{MailConfig, expand_path};

/// Wire up the production dispatcher (SMTP) from configuration.
pub fn dispatcher_from_config(config: &MailConfig) -> Dispatcher {
    let image = InlineImage::new(expand_path(&config.image_path), &config.image_content_id);
    Dispatcher::new(Box::new(SmtpMailer::new(config.clone())), image)
}

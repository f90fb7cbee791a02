//! The two reply templates. Attendance "neither" gets the regret note,
//! everything else gets the thank-you note.

use rsvp_core::types::{InlineAttachment, OutgoingMail, RsvpRow};

const REGRET_SUBJECT: &str = "Thật tiếc! 💔";
const REGRET_BODY: &str = "<p>Thật tiếc vì bạn không thể tham dự.</p>\n\
<p>Chúng tôi sẽ rất nhớ bạn tại buổi tiệc!</p>\n\
<p>🫶🏼</p>\n\
<br>";

const THANKS_SUBJECT: &str = "Cảm ơn bạn đã xác nhận tham dự 💍";
const THANKS_BODY: &str = "<p>Xin cảm ơn bạn rất nhiều vì đã phản hồi ☺️!</p>\n\
<p>Chúng tôi rất vui khi bạn sẽ tham dự ngày cưới của chúng tôi.</p>\n\
<p>Rất vui vì bạn sẽ là một phần trong ngày đặc biệt này!💍👰🏻‍♀️🤵🏽🌷</p>\n\
<br>";

/// Which reply a row gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Declined. Never carries the image.
    Regret,
    /// Attending (or anything that is not the decline sentinel).
    Thanks,
}

impl Template {
    pub fn for_row(row: &RsvpRow) -> Self {
        if row.is_declined() {
            Self::Regret
        } else {
            Self::Thanks
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Self::Regret => REGRET_SUBJECT,
            Self::Thanks => THANKS_SUBJECT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Regret => "regret",
            Self::Thanks => "thanks",
        }
    }

    /// Whether this template wants the inline image when one is available.
    pub fn wants_image(&self) -> bool {
        matches!(self, Self::Thanks)
    }

    /// Render the HTML body. The `<img>` tag is emitted only when `image`
    /// is present.
    pub fn html(&self, image: Option<&InlineAttachment>) -> String {
        match (self, image) {
            (Self::Regret, _) => REGRET_BODY.to_string(),
            (Self::Thanks, None) => THANKS_BODY.to_string(),
            (Self::Thanks, Some(img)) => format!(
                "{THANKS_BODY}\n<img src=\"cid:{}\" alt=\"Just Married\" \
                 style=\"max-width: 100%; height: auto; margin: 20px 0;\">",
                img.content_id
            ),
        }
    }

    /// Build the outgoing message for `to`. A regret message never carries
    /// an attachment, whatever is passed in.
    pub fn render(&self, to: &str, image: Option<InlineAttachment>) -> OutgoingMail {
        let attachment = if self.wants_image() { image } else { None };
        OutgoingMail {
            to: to.to_string(),
            subject: self.subject().to_string(),
            html: self.html(attachment.as_ref()),
            attachment,
        }
    }
}

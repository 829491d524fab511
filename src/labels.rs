//! Projection of a remote label set onto the mirror's boolean flags.

use crate::models::{Message, RawMessage};

pub const UNREAD: &str = "UNREAD";

/// Flag columns that are set when their label is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Personal,
    Social,
    Promotions,
    Updates,
    Forums,
    Important,
    Starred,
    Trash,
    Spam,
    Inbox,
    Replied,
}

/// Remote label id -> local flag. New categories only need a row here.
pub const LABEL_FLAGS: &[(&str, Flag)] = &[
    ("CATEGORY_PERSONAL", Flag::Personal),
    ("CATEGORY_SOCIAL", Flag::Social),
    ("CATEGORY_PROMOTIONS", Flag::Promotions),
    ("CATEGORY_UPDATES", Flag::Updates),
    ("CATEGORY_FORUMS", Flag::Forums),
    ("IMPORTANT", Flag::Important),
    ("STARRED", Flag::Starred),
    ("TRASH", Flag::Trash),
    ("SPAM", Flag::Spam),
    ("INBOX", Flag::Inbox),
    ("SENT", Flag::Replied),
];

impl Flag {
    fn slot(self, message: &mut Message) -> &mut bool {
        match self {
            Flag::Personal => &mut message.is_personal,
            Flag::Social => &mut message.is_social,
            Flag::Promotions => &mut message.is_promotions,
            Flag::Updates => &mut message.is_updates,
            Flag::Forums => &mut message.is_forums,
            Flag::Important => &mut message.is_important,
            Flag::Starred => &mut message.is_starred,
            Flag::Trash => &mut message.is_trash,
            Flag::Spam => &mut message.is_spam,
            Flag::Inbox => &mut message.is_inbox,
            Flag::Replied => &mut message.is_replied,
        }
    }
}

/// Builds the mirror row for a remote message. Never fails: anything missing
/// becomes an empty string, zero, or `false`.
pub fn project(raw: &RawMessage) -> Message {
    let (sender_name, sender_email) = parse_sender(header(raw, "From"));

    let mut message = Message {
        id: raw.id.clone(),
        thread_id: raw.thread_id.clone().unwrap_or_default(),
        sender_name,
        sender_email,
        subject: header(raw, "Subject").to_string(),
        received_on: raw.internal_date.unwrap_or(0),
        is_read: !raw.label_ids.iter().any(|l| l == UNREAD),
        is_personal: false,
        is_social: false,
        is_promotions: false,
        is_updates: false,
        is_forums: false,
        is_important: false,
        is_starred: false,
        is_trash: false,
        is_spam: false,
        is_inbox: false,
        is_replied: false,
    };

    for (label, flag) in LABEL_FLAGS {
        if raw.label_ids.iter().any(|l| l == label) {
            *flag.slot(&mut message) = true;
        }
    }

    message
}

fn header<'a>(raw: &'a RawMessage, name: &str) -> &'a str {
    raw.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

/// Splits a `From` value into `(name, email)`.
///
/// `"Jane Doe <jane@x.com>"` gives `("Jane Doe", "jane@x.com")`; a value
/// without angle brackets is taken whole as the email.
pub fn parse_sender(from: &str) -> (String, String) {
    if let Some(open) = from.find('<') {
        if from.contains('>') {
            let after = &from[open + 1..];
            let email = after.split('>').next().unwrap_or("");
            return (from[..open].trim().to_string(), email.to_string());
        }
    }
    (String::new(), from.to_string())
}

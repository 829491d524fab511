use serde::{Deserialize, Serialize};

/// One mirrored row of the `emails` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    pub received_on: i64, // ms since epoch
    pub is_read: bool,
    pub is_personal: bool,
    pub is_social: bool,
    pub is_promotions: bool,
    pub is_updates: bool,
    pub is_forums: bool,
    pub is_important: bool,
    pub is_starred: bool,
    pub is_trash: bool,
    pub is_spam: bool,
    pub is_inbox: bool,
    pub is_replied: bool,
}

/// A message as the remote side hands it over, before projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub internal_date: Option<i64>,
    pub label_ids: Vec<String>,
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of a remote message listing.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use gsweep::db::Database;
use gsweep::gmail::MailRemote;
use gsweep::models::{Header, MessagePage, RawMessage};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory stand-in for the Gmail API.
pub struct FakeMailbox {
    inner: Mutex<Inner>,
    page_size: usize,
    max_batch: usize,
}

#[derive(Default)]
struct Inner {
    messages: BTreeMap<String, RawMessage>,
    list_calls: usize,
    get_calls: usize,
    batch_calls: Vec<(String, Vec<String>)>,
    fail_get: Option<String>,
    fail_batch_at: Option<usize>,
    blank_page_at: Option<usize>,
}

impl FakeMailbox {
    pub fn new(page_size: usize, max_batch: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size,
            max_batch,
        }
    }

    pub fn add(&self, id: &str, received_on: i64, from: &str, labels: &[&str]) {
        let raw = RawMessage {
            id: id.to_string(),
            thread_id: Some(format!("t-{id}")),
            internal_date: Some(received_on),
            label_ids: labels.iter().map(|l| l.to_string()).collect(),
            headers: vec![
                Header::new("From", from),
                Header::new("Subject", format!("subject {id}")),
            ],
        };
        self.inner.lock().unwrap().messages.insert(id.to_string(), raw);
    }

    pub fn remove(&self, id: &str) {
        self.inner.lock().unwrap().messages.remove(id);
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().messages.keys().cloned().collect()
    }

    pub fn labels_of(&self, id: &str) -> Vec<String> {
        self.inner.lock().unwrap().messages[id].label_ids.clone()
    }

    pub fn fail_get_of(&self, id: &str) {
        self.inner.lock().unwrap().fail_get = Some(id.to_string());
    }

    /// Makes the n-th batch call (0-based) fail.
    pub fn fail_batch_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_batch_at = Some(n);
    }

    /// Makes the listing page starting at `offset` come back empty while
    /// still handing out a token for the next one.
    pub fn blank_page_at(&self, offset: usize) {
        self.inner.lock().unwrap().blank_page_at = Some(offset);
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    pub fn get_calls(&self) -> usize {
        self.inner.lock().unwrap().get_calls
    }

    pub fn batch_calls(&self) -> Vec<(String, Vec<String>)> {
        self.inner.lock().unwrap().batch_calls.clone()
    }

    fn record_batch(&self, kind: &str, ids: &[String]) -> Result<std::sync::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock().unwrap();
        let n = inner.batch_calls.len();
        inner.batch_calls.push((kind.to_string(), ids.to_vec()));
        if inner.fail_batch_at == Some(n) {
            return Err(anyhow!("429 rate limit exceeded"));
        }
        Ok(inner)
    }
}

#[async_trait]
impl MailRemote for FakeMailbox {
    async fn list_messages(&self, page_token: Option<&str>) -> Result<MessagePage> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        let offset: usize = page_token.map(|t| t.parse()).transpose()?.unwrap_or(0);
        if inner.blank_page_at == Some(offset) {
            return Ok(MessagePage {
                ids: Vec::new(),
                next_page_token: Some(offset.to_string()),
            });
        }
        let ids: Vec<String> = inner
            .messages
            .keys()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let next = offset + ids.len();
        let next_page_token = (next < inner.messages.len()).then(|| next.to_string());
        Ok(MessagePage {
            ids,
            next_page_token,
        })
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        let mut inner = self.inner.lock().unwrap();
        inner.get_calls += 1;
        if inner.fail_get.as_deref() == Some(id) {
            return Err(anyhow!("connection reset fetching {id}"));
        }
        inner
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("404 message {id} not found"))
    }

    async fn batch_delete(&self, ids: &[String]) -> Result<()> {
        let mut inner = self.record_batch("delete", ids)?;
        for id in ids {
            inner.messages.remove(id);
        }
        Ok(())
    }

    async fn batch_modify(&self, ids: &[String], remove_label_ids: &[&str]) -> Result<()> {
        let mut inner = self.record_batch("modify", ids)?;
        for id in ids {
            if let Some(msg) = inner.messages.get_mut(id) {
                msg.label_ids
                    .retain(|l| !remove_label_ids.contains(&l.as_str()));
            }
        }
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }
}

pub async fn open_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("mirror.db").display());
    let db = Database::new(&url).await.unwrap();
    db.run_migrations().await.unwrap();
    (dir, db)
}

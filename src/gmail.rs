use crate::config::Config;
use crate::models::{Header, MessagePage, RawMessage};
use crate::retry::Backoff;
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::Gmail;
use google_gmail1::api::{BatchDeleteMessagesRequest, BatchModifyMessagesRequest};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use tracing::debug;

/// The remote mailbox as the sync and mutation code sees it.
#[async_trait]
pub trait MailRemote: Send + Sync {
    async fn list_messages(&self, page_token: Option<&str>) -> Result<MessagePage>;

    async fn get_message(&self, id: &str) -> Result<RawMessage>;

    async fn batch_delete(&self, ids: &[String]) -> Result<()>;

    async fn batch_modify(&self, ids: &[String], remove_label_ids: &[&str]) -> Result<()>;

    /// Largest id set one batch call accepts.
    fn max_batch_size(&self) -> usize;
}

#[derive(Clone)]
pub struct GmailClient {
    hub: Gmail<HttpsConnector<HttpConnector>>,
    user_id: String,
    page_size: u32,
    max_batch_size: usize,
    backoff: Backoff,
}

impl GmailClient {
    pub fn new(hub: Gmail<HttpsConnector<HttpConnector>>, config: &Config) -> Self {
        Self {
            hub,
            user_id: config.user_id.clone(),
            page_size: config.sync.page_size,
            max_batch_size: config.remote.max_batch_size,
            backoff: Backoff {
                max_retries: config.remote.max_retries,
                initial: config.remote.initial_backoff(),
                max: config.remote.max_backoff(),
            },
        }
    }
}

/// Rate limits, server errors and dropped connections are worth another try.
fn is_transient(err: &google_gmail1::Error) -> bool {
    match err {
        google_gmail1::Error::HttpError(_) => true,
        google_gmail1::Error::Failure(response) => retryable_status(response.status().as_u16()),
        // Gmail answers with a JSON body, which the hub surfaces as `BadRequest`
        // whatever the status was.
        google_gmail1::Error::BadRequest(body) => {
            let error = &body["error"];
            let status = error["code"].as_u64().unwrap_or_default();
            let rate_limited = error["errors"].as_array().is_some_and(|errors| {
                errors.iter().any(|e| {
                    matches!(
                        e["reason"].as_str(),
                        Some("rateLimitExceeded" | "userRateLimitExceeded")
                    )
                })
            });
            rate_limited || u16::try_from(status).is_ok_and(retryable_status)
        }
        _ => false,
    }
}

fn retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

#[async_trait]
impl MailRemote for GmailClient {
    async fn list_messages(&self, page_token: Option<&str>) -> Result<MessagePage> {
        let (_, list) = self
            .backoff
            .run("messages.list", is_transient, || {
                let mut req = self
                    .hub
                    .users()
                    .messages_list(&self.user_id)
                    .max_results(self.page_size);
                if let Some(token) = page_token {
                    req = req.page_token(token);
                }
                req.doit()
            })
            .await
            .context("Failed to list messages")?;

        let ids = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        Ok(MessagePage {
            ids,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        let (_, msg) = self
            .backoff
            .run("messages.get", is_transient, || {
                self.hub
                    .users()
                    .messages_get(&self.user_id, id)
                    .format("metadata")
                    .add_metadata_headers("From")
                    .add_metadata_headers("Subject")
                    .doit()
            })
            .await
            .with_context(|| format!("Failed to get message {id}"))?;

        let headers = msg
            .payload
            .and_then(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| Some(Header::new(h.name?, h.value.unwrap_or_default())))
            .collect();

        Ok(RawMessage {
            id: msg.id.unwrap_or_else(|| id.to_string()),
            thread_id: msg.thread_id,
            internal_date: msg.internal_date,
            label_ids: msg.label_ids.unwrap_or_default(),
            headers,
        })
    }

    async fn batch_delete(&self, ids: &[String]) -> Result<()> {
        debug!(count = ids.len(), "messages.batchDelete");
        self.backoff
            .run("messages.batchDelete", is_transient, || {
                let req = BatchDeleteMessagesRequest {
                    ids: Some(ids.to_vec()),
                };
                self.hub
                    .users()
                    .messages_batch_delete(req, &self.user_id)
                    .doit()
            })
            .await
            .context("Failed to batch delete messages")?;
        Ok(())
    }

    async fn batch_modify(&self, ids: &[String], remove_label_ids: &[&str]) -> Result<()> {
        debug!(count = ids.len(), remove = ?remove_label_ids, "messages.batchModify");
        self.backoff
            .run("messages.batchModify", is_transient, || {
                let req = BatchModifyMessagesRequest {
                    ids: Some(ids.to_vec()),
                    remove_label_ids: Some(remove_label_ids.iter().map(|l| l.to_string()).collect()),
                    add_label_ids: None,
                };
                self.hub
                    .users()
                    .messages_batch_modify(req, &self.user_id)
                    .doit()
            })
            .await
            .context("Failed to batch modify messages")?;
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

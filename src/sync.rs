//! Paginated mirror of the remote mailbox into the local store.

use crate::db::Database;
use crate::gmail::MailRemote;
use crate::labels;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Where the fetch loop is. A run always starts from `Start`; there is no
/// persisted cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Start,
    FetchingPage(Option<String>),
    Done,
}

/// Progress shared with whoever is watching the run.
#[derive(Debug, Default)]
pub struct SyncState {
    pub state: FetchState,
    pub pages: usize,
    /// Remote ids seen so far, known or new.
    pub seen: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub seen: usize,
    pub inserted: usize,
    pub pruned: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Delete local rows the remote listing no longer contains. Only applied
    /// after a complete run.
    pub prune: bool,
}

pub struct Syncer<'a, R: MailRemote + ?Sized> {
    remote: &'a R,
    db: &'a Database,
    state: Arc<Mutex<SyncState>>,
}

impl<'a, R: MailRemote + ?Sized> Syncer<'a, R> {
    pub fn new(remote: &'a R, db: &'a Database) -> Self {
        Self {
            remote,
            db,
            state: Arc::new(Mutex::new(SyncState::default())),
        }
    }

    pub fn with_state(mut self, state: Arc<Mutex<SyncState>>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> Arc<Mutex<SyncState>> {
        self.state.clone()
    }

    /// Walks every page of the listing and stores each message not already
    /// mirrored. The first failure aborts the run; what was stored stays,
    /// and running again picks up the rest.
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut remote_ids = HashSet::new();
        let mut fetch = FetchState::FetchingPage(None);
        let mut complete = true;

        while let FetchState::FetchingPage(token) = fetch {
            self.update(|s| s.state = FetchState::FetchingPage(token.clone()));
            let page = self.remote.list_messages(token.as_deref()).await?;
            if page.ids.is_empty() {
                if page.next_page_token.is_some() {
                    warn!("empty page still carried a page token, listing may be incomplete");
                    complete = false;
                } else {
                    debug!("empty page, listing finished");
                }
                break;
            }
            report.pages += 1;

            for id in &page.ids {
                report.seen += 1;
                if options.prune {
                    remote_ids.insert(id.clone());
                }
                if self
                    .db
                    .message_exists(id)
                    .await
                    .context("checking mirrored message")?
                {
                    continue;
                }

                let raw = self.remote.get_message(id).await?;
                let message = labels::project(&raw);
                if self
                    .db
                    .upsert(&message)
                    .await
                    .with_context(|| format!("storing message {id}"))?
                {
                    report.inserted += 1;
                }
            }

            let (pages, seen, inserted) = (report.pages, report.seen, report.inserted);
            self.update(|s| {
                s.pages = pages;
                s.seen = seen;
                s.inserted = inserted;
            });
            info!(pages, seen, inserted, "fetched page");

            fetch = match page.next_page_token {
                Some(next) => FetchState::FetchingPage(Some(next)),
                None => FetchState::Done,
            };
        }
        self.update(|s| s.state = FetchState::Done);

        if options.prune {
            if complete {
                report.pruned = self.prune(&remote_ids).await?;
            } else {
                warn!("skipping prune after an incomplete listing");
            }
        }

        info!(
            pages = report.pages,
            seen = report.seen,
            inserted = report.inserted,
            pruned = report.pruned,
            "sync finished"
        );
        Ok(report)
    }

    async fn prune(&self, remote_ids: &HashSet<String>) -> Result<u64> {
        let stale: Vec<String> = self
            .db
            .all_ids()
            .await
            .context("listing mirrored ids")?
            .into_iter()
            .filter(|id| !remote_ids.contains(id))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        info!(count = stale.len(), "pruning messages gone from the remote mailbox");
        self.db
            .delete_by_ids(&stale)
            .await
            .context("pruning stale messages")
    }

    fn update(&self, f: impl FnOnce(&mut SyncState)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }
}

//! Bulk delete / mark-read across the remote mailbox and the mirror.
//!
//! Every selection mode resolves to a plain id list first; one executor then
//! calls the remote side and, only once a batch is confirmed there, applies
//! the same change locally. A failed remote call therefore never leaves the
//! mirror claiming a state the remote mailbox does not have.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::filter::FilterSpec;
use crate::gmail::MailRemote;
use crate::labels::UNREAD;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Delete,
    MarkRead,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "delete" => Ok(Action::Delete),
            "mark-read" | "mark_read" => Ok(Action::MarkRead),
            other => Err(Error::Validation(format!("unknown action '{other}'"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Delete => "delete",
            Action::MarkRead => "mark-read",
        })
    }
}

/// Which messages a mutation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Ids {
        ids: Vec<String>,
        excluded: Vec<String>,
    },
    Filter(FilterSpec),
    Sender(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub action: Action,
    pub mutated_count: usize,
}

pub struct Coordinator<'a, R: MailRemote + ?Sized> {
    remote: &'a R,
    db: &'a Database,
}

impl<'a, R: MailRemote + ?Sized> Coordinator<'a, R> {
    pub fn new(remote: &'a R, db: &'a Database) -> Self {
        Self { remote, db }
    }

    /// Resolves `selection` and applies `action` to it on both sides.
    pub async fn mutate(&self, selection: &Selection, action: Action) -> Result<MutationOutcome> {
        let ids = self.resolve(selection).await?;
        if ids.is_empty() {
            return Err(Error::Validation(
                "no message ids left to process".to_string(),
            ));
        }
        self.execute(&ids, action).await
    }

    /// Turns a selection into the id list to mutate, exclusions removed.
    pub async fn resolve(&self, selection: &Selection) -> Result<Vec<String>> {
        match selection {
            Selection::Ids { ids, excluded } => {
                let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
                let mut seen = HashSet::new();
                Ok(ids
                    .iter()
                    .filter(|id| !excluded.contains(id.as_str()))
                    .filter(|id| seen.insert(id.as_str()))
                    .cloned()
                    .collect())
            }
            Selection::Filter(filter) => Ok(self.db.ids_matching(filter).await?),
            Selection::Sender(sender) => {
                if sender.trim().is_empty() {
                    return Err(Error::Validation("no sender email provided".to_string()));
                }
                Ok(self.db.ids_by_sender(sender).await?)
            }
        }
    }

    async fn execute(&self, ids: &[String], action: Action) -> Result<MutationOutcome> {
        let batch_size = self.remote.max_batch_size().max(1);
        let mut confirmed = 0;

        for batch in ids.chunks(batch_size) {
            let remote = match action {
                Action::Delete => self.remote.batch_delete(batch).await,
                Action::MarkRead => self.remote.batch_modify(batch, &[UNREAD]).await,
            };
            if let Err(e) = remote {
                warn!(%action, confirmed, failed = batch.len(), error = %e, "remote batch rejected");
                return Err(Error::remote(confirmed, e));
            }

            let local = match action {
                Action::Delete => self.db.delete_by_ids(batch).await,
                Action::MarkRead => self.db.mark_read_by_ids(batch).await,
            };
            if let Err(source) = local {
                warn!(%action, confirmed, stale = batch.len(), error = %source, "local commit failed after remote change");
                return Err(Error::LocalCommit {
                    confirmed,
                    remote_applied: batch.len(),
                    source,
                });
            }
            confirmed += batch.len();
        }

        info!(%action, count = confirmed, "mutation applied");
        Ok(MutationOutcome {
            action,
            mutated_count: confirmed,
        })
    }
}

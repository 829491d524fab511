use crate::filter::{Bound, FilterSpec, parse_bound};
use crate::mutation::Selection;
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Mirror a Gmail mailbox locally and sweep it in bulk.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Settings file.
    #[arg(long, default_value = crate::config::DEFAULT_PATH)]
    pub config: PathBuf,

    /// Verbose logging.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pull every remote message into the mirror.
    Sync {
        /// Drop local rows the remote mailbox no longer has.
        #[arg(long)]
        prune: bool,
    },
    /// Print mirrored messages matching a filter as JSON.
    Query {
        #[command(flatten)]
        filter: FilterArgs,
        /// Include per-day and per-sender counts.
        #[arg(long)]
        report: bool,
    },
    /// Print every sender address in the mirror.
    Senders,
    /// Delete messages from Gmail and the mirror.
    Delete(TargetArgs),
    /// Mark messages read in Gmail and the mirror.
    MarkRead(TargetArgs),
    /// Forget the stored OAuth token.
    ResetToken,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Earliest receive time, YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub start: Option<String>,
    /// Latest receive time, YYYY-MM-DD (whole day) or RFC 3339.
    #[arg(long)]
    pub end: Option<String>,
    /// Sender address, or "all".
    #[arg(long = "from")]
    pub sender_email: Option<String>,
    #[arg(long)]
    pub exclude_starred: bool,
    #[arg(long)]
    pub exclude_important: bool,
    #[arg(long)]
    pub exclude_personal: bool,
    #[arg(long)]
    pub exclude_read: bool,
    #[arg(long)]
    pub exclude_sent: bool,
}

/// Arg ids of every `FilterArgs` flag.
const FILTER_FLAGS: [&str; 8] = [
    "start",
    "end",
    "sender_email",
    "exclude_starred",
    "exclude_important",
    "exclude_personal",
    "exclude_read",
    "exclude_sent",
];

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Explicit message ids.
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "sender",
        conflicts_with_all = FILTER_FLAGS
    )]
    pub ids: Vec<String>,
    /// Ids to leave alone.
    #[arg(long, value_delimiter = ',', requires = "ids")]
    pub exclude: Vec<String>,
    /// Every mirrored message from this sender.
    #[arg(long, conflicts_with_all = FILTER_FLAGS)]
    pub sender: Option<String>,
    #[command(flatten)]
    pub filter: FilterArgs,
}

impl FilterArgs {
    pub fn to_spec(&self) -> Result<FilterSpec> {
        Ok(FilterSpec {
            start: self
                .start
                .as_deref()
                .map(|s| parse_bound(s, Bound::Start))
                .transpose()?,
            end: self
                .end
                .as_deref()
                .map(|s| parse_bound(s, Bound::End))
                .transpose()?,
            sender_email: self.sender_email.clone(),
            exclude_starred: self.exclude_starred,
            exclude_important: self.exclude_important,
            exclude_personal: self.exclude_personal,
            exclude_read: self.exclude_read,
            exclude_sent: self.exclude_sent,
        })
    }
}

impl TargetArgs {
    /// Explicit ids, a sender or the filter flags; clap keeps them exclusive.
    pub fn to_selection(&self) -> Result<Selection> {
        if !self.ids.is_empty() {
            return Ok(Selection::Ids {
                ids: self.ids.clone(),
                excluded: self.exclude.clone(),
            });
        }
        if let Some(sender) = &self.sender {
            return Ok(Selection::Sender(sender.clone()));
        }
        let filter = self.filter.to_spec()?;
        let unscoped = FilterSpec {
            sender_email: filter.sender_email.clone(),
            ..FilterSpec::default()
        };
        if filter.sender().is_none() && filter == unscoped {
            bail!("refusing to touch the whole mailbox: pass --ids, --sender or a filter flag");
        }
        Ok(Selection::Filter(filter))
    }
}

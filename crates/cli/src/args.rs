use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

use tripsplit_core::ExpenseId;
use tripsplit_ledger::ExpenseQuery;
use tripsplit_observability::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "tripsplit")]
#[command(about = "Split shared trip expenses and work out who pays whom")]
pub struct Cli {
    /// Log output on stderr (also read from `TRIPSPLIT_LOG_FORMAT`).
    #[arg(long, global = true, env = "TRIPSPLIT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Net balance per participant.
    Balances(ReportArgs),
    /// Balances plus the payments that settle them.
    Settle(ReportArgs),
    /// Look up expenses by id, payer or participant.
    Query(QueryArgs),
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Bill export (bill API response or JSON array); `-` reads stdin
    /// (also read from `TRIPSPLIT_BILLS`).
    #[arg(long, env = "TRIPSPLIT_BILLS")]
    pub bills: PathBuf,

    /// Output format (also read from `TRIPSPLIT_FORMAT`).
    #[arg(long, value_enum, env = "TRIPSPLIT_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Register a participant even if no bill mentions them (repeatable).
    #[arg(long = "participant", value_name = "NAME")]
    pub participants: Vec<String>,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: QueryFilter,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct QueryFilter {
    #[arg(long)]
    pub id: Option<String>,
    /// Case-insensitive substring of the payer's name.
    #[arg(long)]
    pub payer: Option<String>,
    /// Case-insensitive substring of a sharer's name.
    #[arg(long)]
    pub participant: Option<String>,
}

impl QueryFilter {
    pub fn to_query(&self) -> anyhow::Result<ExpenseQuery> {
        match (&self.id, &self.payer, &self.participant) {
            (Some(id), _, _) => Ok(ExpenseQuery::Id(
                ExpenseId::parse(id).context("invalid --id")?,
            )),
            (_, Some(payer), _) => Ok(ExpenseQuery::Payer(payer.clone())),
            (_, _, Some(participant)) => Ok(ExpenseQuery::Participant(participant.clone())),
            (None, None, None) => anyhow::bail!("one of --id, --payer or --participant is required"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

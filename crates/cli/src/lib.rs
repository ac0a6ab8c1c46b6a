//! `tripsplit` command line: reads a bill export and reports balances,
//! settlement payments or matching expenses.

use std::io::Write;

use anyhow::Context;
use chrono::Utc;

use tripsplit_core::LedgerId;
use tripsplit_import::{ImportError, import_from};
use tripsplit_ledger::LedgerSnapshot;
use tripsplit_settlement::{Balances, plan_settlement};

pub mod args;
pub mod render;
pub mod source;

pub use args::{Cli, Command, OutputFormat};
pub use source::FileSource;

/// Build a ledger from the bill export, with `extra` names registered first.
///
/// An export with no usable records yields a ledger with only `extra`.
pub fn load_ledger(bills: &FileSource, extra: &[String]) -> anyhow::Result<LedgerSnapshot> {
    let mut ledger = LedgerSnapshot::empty(LedgerId::new());
    for name in extra {
        ledger = ledger
            .add_participant(name)
            .with_context(|| format!("invalid --participant {name:?}"))?;
    }

    match import_from(&ledger, bills, Utc::now()) {
        Ok(outcome) => Ok(outcome.snapshot),
        Err(ImportError::NothingToImport { skipped }) => {
            tracing::warn!(skipped, "no usable bill records");
            Ok(ledger)
        }
        Err(e) => Err(e).context("importing bills"),
    }
}

/// Execute a parsed command, writing its report to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let report = match &cli.command {
        Command::Balances(args) => {
            let ledger = load_ledger(&FileSource::new(&args.source.bills), &args.participants)?;
            render::balances(&Balances::from(&ledger), args.source.format)?
        }
        Command::Settle(args) => {
            let ledger = load_ledger(&FileSource::new(&args.source.bills), &args.participants)?;
            let balances = Balances::from(&ledger);
            let plan = plan_settlement(&balances);
            render::settlement(&balances, &plan, args.source.format)?
        }
        Command::Query(args) => {
            let query = args.filter.to_query()?;
            let ledger = load_ledger(&FileSource::new(&args.source.bills), &[])?;
            render::expenses(&query.run(ledger.expenses()), args.source.format)?
        }
    };

    out.write_all(report.as_bytes())
        .context("writing report")?;
    Ok(())
}

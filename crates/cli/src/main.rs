use std::io::Write;

use clap::Parser;

use tripsplit_cli::{Cli, run};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tripsplit_observability::init_with(cli.log_format);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}

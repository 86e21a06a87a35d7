//! Interactive shell over a StrataDB table.
//!
//! Reads one command per line from stdin, prompting with `db > `. Closing
//! the session (`.exit` or end of input) is what persists the table.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use stratadb::common::config::TABLE_MAX_PAGES;
use stratadb::execution::{execute, execute_meta, ExecuteOutcome, MetaCommand, MetaOutcome, Statement};
use stratadb::{Error, StoreConfig, Table};

#[derive(Parser, Debug)]
#[command(name = "stratadb", version, about = "B+Tree key-value store shell")]
struct Args {
    /// Database file, created if missing
    path: PathBuf,

    /// Ceiling on pages in the database file
    #[arg(long, default_value_t = TABLE_MAX_PAGES)]
    max_pages: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "session aborted");
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = StoreConfig::new(args.max_pages);
    let mut table = Table::open_with_config(&args.path, config)
        .with_context(|| format!("failed to open {}", args.path.display()))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        write!(stdout, "db > ")?;
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            let command = match MetaCommand::parse(line) {
                Ok(command) => command,
                Err(err) => {
                    writeln!(stdout, "{}", err)?;
                    continue;
                }
            };
            match execute_meta(&mut table, command) {
                Ok(MetaOutcome::Exit) => break,
                Ok(MetaOutcome::Output(text)) => write!(stdout, "{}", text)?,
                Err(err) => report(&mut stdout, err)?,
            }
            continue;
        }

        let statement = match Statement::parse(line) {
            Ok(statement) => statement,
            Err(err) => {
                writeln!(stdout, "{}", err)?;
                continue;
            }
        };
        match execute(&mut table, &statement) {
            Ok(ExecuteOutcome::Done) => writeln!(stdout, "Executed.")?,
            Ok(ExecuteOutcome::Rows(rows)) => {
                for row in rows {
                    writeln!(stdout, "{}", row)?;
                }
                writeln!(stdout, "Executed.")?;
            }
            Err(err) => report(&mut stdout, err)?,
        }
    }

    table.close().context("failed to close the database")?;
    Ok(())
}

/// Print a non-fatal error and carry on, or give up on a fatal one.
fn report(out: &mut impl Write, err: Error) -> anyhow::Result<()> {
    match err {
        Error::DuplicateKey(_) => writeln!(out, "Error: Duplicate key.")?,
        Error::KeyNotFound(_) => writeln!(out, "Error: Key not found.")?,
        err if !err.is_fatal() => writeln!(out, "Error: {}", err)?,
        err => return Err(err.into()),
    }
    Ok(())
}

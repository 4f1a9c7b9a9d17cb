use std::process::ExitCode;

use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::Level;

use tagrunner::{parse_clauses, StructTag};

/// Inspect field tags the way the tag runner reads them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an annotation such as `update=v1 v2,validate` into clauses
    Parse {
        annotation: String,
    },
    /// Look up one key of a struct tag such as `json:"f" bar:"update=v1"`
    Lookup {
        tag: String,
        key: String,
        /// Print the parsed clauses instead of the raw annotation
        #[arg(long)]
        parse: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args.command) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String, Box<dyn std::error::Error>> {
    match command {
        Command::Parse { annotation } => render_clauses(&annotation),
        Command::Lookup { tag, key, parse } => {
            let Some(raw) = StructTag::new(&tag).lookup(&key) else {
                return Err(format!("key `{key}` not found in tag").into());
            };
            tracing::debug!(key = %key, raw = %raw, "found annotation");
            if parse {
                render_clauses(&raw)
            } else {
                Ok(raw)
            }
        }
    }
}

fn render_clauses(annotation: &str) -> Result<String, Box<dyn std::error::Error>> {
    let clauses = parse_clauses(annotation)?;
    tracing::debug!(
        values = %clauses.iter().map(|c| c.value.as_str()).join(","),
        "parsed annotation"
    );
    Ok(serde_json::to_string_pretty(&clauses)?)
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use kconfig_tools::KconfigError;
use kconfig_tools::config::{self, DefaultsPolicy};
use kconfig_tools::renames::RenameMap;
use kconfig_tools::report::Verbosity;
use kconfig_tools::server::Session;
use kconfig_tools::symbol::Origin;
use kconfig_tools::world::World;

/// Line-delimited JSON server over stdin/stdout.  One request object per
/// line in, one response object per line out; diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Root Kconfig file
    #[arg(long, value_name = "FILE")]
    kconfig: PathBuf,

    /// Configuration file to load initially and for `load`/`save` with a
    /// null path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rename map for backward compatibility
    #[arg(long, value_name = "FILE")]
    renames: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e.downcast_ref::<KconfigError>().is_some() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

// The engine is synchronous; a single task serializes every request.
#[tokio::main(flavor = "current_thread")]
async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_env();
    let policy = DefaultsPolicy::from_env();

    let renames = match &args.renames {
        Some(path) => Some(
            RenameMap::load(path)
                .with_context(|| format!("loading rename map {}", path.display()))?,
        ),
        None => None,
    };

    let mut world = World::load(&args.kconfig)
        .with_context(|| format!("loading Kconfig tree {}", args.kconfig.display()))?;
    if let Some(path) = &args.config {
        if path.is_file() {
            config::load_config(
                &mut world,
                path,
                Origin::PrimaryConfig,
                renames.as_ref(),
                policy,
            )
            .with_context(|| format!("loading configuration {}", path.display()))?;
        }
    }

    let mut session = Session::new(world, args.config.clone(), renames, policy, verbosity);

    let mut stdout = tokio::io::stdout();
    let initial = serde_json::to_string(&session.initial_message())?;
    stdout.write_all(initial.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = session.handle_line(&line);
        let rendered = serde_json::to_string(&response)?;
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

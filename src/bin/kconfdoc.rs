use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use kconfig_tools::KconfigError;
use kconfig_tools::docs;
use kconfig_tools::report::Verbosity;
use kconfig_tools::world::World;

/// Generate a markdown reference of a Kconfig tree.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Root Kconfig file
    #[arg(long, value_name = "FILE")]
    kconfig: PathBuf,

    /// Markdown output path (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
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

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut world = World::load(&args.kconfig)
        .with_context(|| format!("loading Kconfig tree {}", args.kconfig.display()))?;
    let rendered = docs::render_markdown(&mut world);
    world.report.emit(Verbosity::from_env());

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

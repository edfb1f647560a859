use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use kconfig_tools::KconfigError;
use kconfig_tools::config::{self, DefaultsPolicy};
use kconfig_tools::renames::RenameMap;
use kconfig_tools::report::Verbosity;
use kconfig_tools::symbol::Origin;
use kconfig_tools::world::World;

/// Generate a configuration (and optional C header) from a Kconfig tree.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Root Kconfig file
    #[arg(long, value_name = "FILE")]
    kconfig: PathBuf,

    /// Previously saved configuration to ingest
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Defaults overlay file(s), applied in order
    #[arg(long, value_name = "FILE")]
    defaults: Vec<PathBuf>,

    /// Rename map for backward compatibility
    #[arg(long, value_name = "FILE")]
    renames: Option<PathBuf>,

    /// Where to write the configuration (defaults to --config)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Optional C header output
    #[arg(long, value_name = "FILE")]
    header: Option<PathBuf>,

    /// Defaults policy: sdkconfig, kconfig or interactive
    #[arg(long)]
    policy: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            // User errors (bad input) exit 1, internal failures exit 2.
            if e.downcast_ref::<KconfigError>().is_some() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let verbosity = Verbosity::from_env();
    let policy = match args.policy.as_deref() {
        Some("sdkconfig") => DefaultsPolicy::Sdkconfig,
        Some("kconfig") => DefaultsPolicy::Kconfig,
        Some("interactive") => DefaultsPolicy::Interactive,
        Some(other) => {
            return Err(KconfigError::Config(format!("unknown defaults policy `{other}`")).into());
        }
        None => DefaultsPolicy::from_env(),
    };

    let renames = match &args.renames {
        Some(path) => Some(
            RenameMap::load(path)
                .with_context(|| format!("loading rename map {}", path.display()))?,
        ),
        None => None,
    };

    let mut world = World::load(&args.kconfig)
        .with_context(|| format!("loading Kconfig tree {}", args.kconfig.display()))?;

    for overlay in &args.defaults {
        config::load_config(
            &mut world,
            overlay,
            Origin::DefaultsFile,
            renames.as_ref(),
            policy,
        )
        .with_context(|| format!("loading defaults {}", overlay.display()))?;
    }

    if let Some(prior) = &args.config {
        if prior.is_file() {
            let outcome = config::load_config(
                &mut world,
                prior,
                Origin::PrimaryConfig,
                renames.as_ref(),
                policy,
            )
            .with_context(|| format!("loading configuration {}", prior.display()))?;
            settle_conflicts(&mut world, outcome.conflicts)?;
        }
    }

    world.refresh();
    world.report.emit(verbosity);
    log::info!("generation finished: {}", world.report.status().as_str());

    let output = args
        .output
        .clone()
        .or_else(|| args.config.clone())
        .context("no output path: pass --output or --config")?;
    config::save_config(&mut world, &output, renames.as_ref())?;
    if let Some(header) = &args.header {
        config::save_header(&mut world, header)?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Under the interactive policy, unresolved conflicts are settled over
/// stdin; everything else never reaches this point.
fn settle_conflicts(
    world: &mut World,
    conflicts: Vec<config::DefaultConflict>,
) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    for c in conflicts {
        eprint!(
            "{}: stored default is {}, Kconfig default is {}. Keep stored? [Y/n] ",
            c.name, c.stored, c.kconfig
        );
        std::io::stderr().flush().ok();
        let mut answer = String::new();
        stdin.read_line(&mut answer)?;
        if answer.trim().eq_ignore_ascii_case("n") {
            if let Some(id) = world.defined_sym_id(&c.name) {
                world.reset_symbol(id);
            }
        }
    }
    Ok(())
}

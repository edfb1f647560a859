use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use kconfig_tools::renames::RenameMap;

/// Validate a rename list: rejects self-renames and cycles.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Rename map file
    #[arg(long, value_name = "FILE")]
    map: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match RenameMap::load(&args.map) {
        Ok(map) => {
            println!(
                "{}: {} renames, all chains resolve",
                args.map.display(),
                map.entries().len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

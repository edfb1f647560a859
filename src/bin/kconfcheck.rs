use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use kconfig_tools::checker;

/// Style-check Kconfig files; fixable issues produce a `.new` sibling.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Files to check
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut any_issue = false;
    let mut failed = false;
    for file in &args.files {
        match checker::check_file(file) {
            Ok(outcome) => {
                for issue in &outcome.issues {
                    println!("{}:{}: {}", file.display(), issue.line + 1, issue.message);
                }
                if let Some(fixed) = &outcome.fixed {
                    println!("{}: fixes written to {}", file.display(), fixed.display());
                }
                any_issue |= !outcome.issues.is_empty();
            }
            Err(e) => {
                eprintln!("error: {}: {e}", file.display());
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::from(2)
    } else if any_issue {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

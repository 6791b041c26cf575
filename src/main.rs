//! composer-cnb - PHP Composer buildpack
//!
//! CLI entry point for `bin/detect` and `bin/build`.

use console::style;
use php_composer_cnb::cli::{Cli, Commands};
use php_composer_cnb::error::{ComposerError, ComposerResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ComposerResult<u8> {
    let cli = Cli::parse_with_program_name(std::env::args_os());

    // 0 = info, 1+ = debug; BP_LOG_LEVEL=DEBUG behaves like -v
    let debug_requested = std::env::var("BP_LOG_LEVEL")
        .map(|level| level.eq_ignore_ascii_case("debug"))
        .unwrap_or(false);
    let filter = if cli.verbose > 0 || debug_requested {
        EnvFilter::new("php_composer_cnb=debug")
    } else {
        EnvFilter::new("php_composer_cnb=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let app_dir = match cli.app_dir {
        Some(dir) => dir,
        None => current_dir()?,
    };

    match cli.command {
        Commands::Detect(args) => {
            let outcome = php_composer_cnb::cli::commands::detect(args, &app_dir).await?;
            Ok(outcome.exit_code())
        }
        Commands::Build(args) => {
            php_composer_cnb::cli::commands::build(args, &app_dir).await?;
            Ok(0)
        }
    }
}

fn current_dir() -> ComposerResult<PathBuf> {
    std::env::current_dir().map_err(|e| ComposerError::io("getting current directory", e))
}

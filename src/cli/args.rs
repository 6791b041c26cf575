//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// PHP Composer Cloud Native Buildpack
///
/// Installs Composer packages into cached layers. Usually invoked through
/// `bin/detect` and `bin/build` links, which imply the subcommand.
#[derive(Parser, Debug)]
#[command(name = "composer-cnb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Application directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub app_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the app uses Composer and write the build plan
    Detect(DetectArgs),

    /// Install composer and the app's packages into layers
    Build(BuildArgs),
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Platform directory
    pub platform_dir: PathBuf,

    /// Build plan to write
    pub plan_path: PathBuf,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Layers directory
    pub layers_dir: PathBuf,

    /// Platform directory
    pub platform_dir: PathBuf,

    /// Buildpack plan to read
    pub plan_path: PathBuf,
}

impl Cli {
    /// Parse `args`, inserting the subcommand implied by the program name
    pub fn parse_with_program_name<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let implied = args
            .first()
            .and_then(|argv0| implied_subcommand(Path::new(argv0)));
        if let Some(subcommand) = implied {
            args.insert(1, subcommand.into());
        }
        Self::parse_from(args)
    }
}

/// `detect` or `build` when the binary runs under that name
pub fn implied_subcommand(program: &Path) -> Option<&'static str> {
    match program.file_name()?.to_str()? {
        "detect" => Some("detect"),
        "build" => Some("build"),
        _ => None,
    }
}

//! `composer check-platform-reqs` output parsing
//!
//! Composer has no machine-readable mode for this subcommand. Each line is
//! whitespace-separated columns:
//!
//! ```text
//! <requirement> <installed version|n/a> [<required by> ...] <status>
//! ```
//!
//! The requirement may carry an `ext-` prefix; the status is the last column
//! (`success`, `missing`, `failed`).

use super::Composer;
use crate::error::ComposerResult;
use crate::runner::{Invocation, RunOutput};
use std::fmt;

/// Exit code composer uses when some requirements are not met
pub const PARTIAL_SUCCESS_EXIT: i32 = 2;

const EXTENSION_PREFIX: &str = "ext-";
const MISSING_STATUS: &str = "missing";

/// Whether a platform requirement is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementStatus {
    Missing,
    /// Installed; composer may still report a version mismatch
    Present,
}

/// One row of the requirement listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRequirement {
    /// Identifier with any `ext-` prefix removed
    pub name: String,
    pub status: RequirementStatus,
}

impl PlatformRequirement {
    /// True for requirements on the interpreter itself (`php`, `php-64bit`)
    pub fn is_interpreter(&self) -> bool {
        self.name == "php" || self.name.starts_with("php-")
    }

    /// A PHP extension that must be enabled before installing
    pub fn is_missing_extension(&self) -> bool {
        self.status == RequirementStatus::Missing && !self.is_interpreter()
    }
}

impl fmt::Display for PlatformRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            RequirementStatus::Missing => "missing",
            RequirementStatus::Present => "present",
        };
        write!(f, "{} ({})", self.name, status)
    }
}

/// Parse every non-empty line of the listing
pub fn parse_requirements(output: &str) -> Vec<PlatformRequirement> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<PlatformRequirement> {
    let mut tokens = line.split_whitespace();
    let identifier = tokens.next()?;
    let status = tokens.last().unwrap_or(identifier);

    // only a literal prefix is stripped; "foo-ext-bar" stays as it is
    let name = identifier
        .strip_prefix(EXTENSION_PREFIX)
        .unwrap_or(identifier);

    Some(PlatformRequirement {
        name: name.to_string(),
        status: if status == MISSING_STATUS {
            RequirementStatus::Missing
        } else {
            RequirementStatus::Present
        },
    })
}

/// Extensions reported missing, in order of first appearance
pub fn missing_extensions(requirements: &[PlatformRequirement]) -> Vec<String> {
    requirements
        .iter()
        .filter(|req| req.is_missing_extension())
        .map(|req| req.name.clone())
        .collect()
}

/// Check the exit status, then parse the listing
///
/// Exit code 0 and [`PARTIAL_SUCCESS_EXIT`] are both expected; anything else
/// means composer could not produce the listing.
pub fn interpret(
    invocation: &Invocation,
    output: &RunOutput,
) -> ComposerResult<Vec<PlatformRequirement>> {
    output.ensure_status(invocation, &[0, PARTIAL_SUCCESS_EXIT])?;
    Ok(parse_requirements(&output.stdout))
}

impl Composer {
    /// Run `check-platform-reqs` and parse its listing
    pub async fn check_platform_reqs(
        &self,
        env: &super::ComposerEnv,
    ) -> ComposerResult<Vec<PlatformRequirement>> {
        let invocation = self.invocation(env).arg("check-platform-reqs");
        let output = self.runner().run_capturing(&invocation).await?;
        interpret(&invocation, &output)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

mod git;

use std::env;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

pub use git::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam between version control lookups and real processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Finds `program` on the search path of the given host platform.
    fn locate(&self, program: &str, platform: &str) -> Option<PathBuf>;

    async fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> Result<CommandOutput>;
}

fn is_windows(platform: &str) -> bool {
    return platform.to_lowercase().contains("windows");
}

/// Walks `search_path` looking for an executable file named `program`. The
/// separator and executable suffix depend on the host platform.
pub fn locate_executable(program: &str, search_path: &str, platform: &str) -> Option<PathBuf> {
    let windows = is_windows(platform);
    let separator = if windows { ';' } else { ':' };

    let mut file_name = program.to_string();
    if windows && !file_name.to_lowercase().ends_with(".exe") {
        file_name = format!("{file_name}.exe");
    }

    return search_path
        .split(separator)
        .map(|dir| return dir.trim())
        .filter(|dir| return !dir.is_empty())
        .map(|dir| return Path::new(dir).join(&file_name))
        .find(|candidate| return candidate.is_file());
}

#[derive(Default)]
pub struct SystemCommandRunner {}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    fn locate(&self, program: &str, platform: &str) -> Option<PathBuf> {
        let search_path = env::var("PATH").unwrap_or_default();
        return locate_executable(program, &search_path, platform);
    }

    #[allow(clippy::implicit_return)]
    async fn run(&self, program: &Path, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .await?;

        let res = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        tracing::debug!(program = ?program, args = ?args, res = ?res, "Command request/response");

        return Ok(res);
    }
}

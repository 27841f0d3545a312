#[cfg(test)]
#[path = "git_test.rs"]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;

use super::CommandRunner;
use super::SystemCommandRunner;
use crate::configuration::SettingKey;
use crate::configuration::SettingsStore;
use crate::domain::models::BranchResolver;
use crate::domain::models::HostEnvironment;
use crate::domain::models::DEFAULT_BRANCH;

const BRANCH_ARGS: [&str; 3] = ["rev-parse", "--abbrev-ref", "HEAD"];

/// Resolves the branch with the git CLI. Any failure turns git support off
/// for the rest of the session instead of failing on every heartbeat.
pub struct Git {
    settings: Arc<dyn SettingsStore>,
    host: Arc<dyn HostEnvironment>,
    runner: Box<dyn CommandRunner>,
}

impl Git {
    pub fn new(settings: Arc<dyn SettingsStore>, host: Arc<dyn HostEnvironment>) -> Git {
        return Git::with_runner(settings, host, Box::<SystemCommandRunner>::default());
    }

    pub fn with_runner(
        settings: Arc<dyn SettingsStore>,
        host: Arc<dyn HostEnvironment>,
        runner: Box<dyn CommandRunner>,
    ) -> Git {
        return Git {
            settings,
            host,
            runner,
        };
    }

    pub fn is_enabled(&self) -> bool {
        return self.settings.get_bool(SettingKey::GitEnabled, true);
    }

    fn disable(&self) -> String {
        self.settings.set_bool(SettingKey::GitEnabled, false);
        return DEFAULT_BRANCH.to_string();
    }
}

#[async_trait]
impl BranchResolver for Git {
    #[allow(clippy::implicit_return)]
    async fn current_branch(&self) -> String {
        if !self.is_enabled() {
            return DEFAULT_BRANCH.to_string();
        }

        let platform = self.host.platform();
        let git = match self.runner.locate("git", &platform) {
            Some(git) => git,
            None => {
                tracing::warn!(
                    platform = platform,
                    "git was not found on the search path, disabling git support"
                );
                return self.disable();
            }
        };

        let project_root = self.host.project_root();
        let output = match self.runner.run(&git, &BRANCH_ARGS, &project_root).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to run git, disabling git support");
                return self.disable();
            }
        };

        if !output.stderr.trim().is_empty() {
            tracing::warn!(
                stderr = output.stderr.trim(),
                project_root = ?project_root,
                "git reported an error, disabling git support"
            );
            return self.disable();
        }

        let branch = output.stdout.trim();
        if branch.is_empty() {
            return DEFAULT_BRANCH.to_string();
        }

        return branch.to_string();
    }
}

#[cfg(test)]
#[path = "heartbeats_test.rs"]
mod tests;

use std::sync::Arc;

use chrono::Utc;

use super::TrackerContext;
use crate::domain::models::BranchResolver;
use crate::domain::models::Heartbeat;
use crate::domain::models::HostEnvironment;
use crate::domain::models::UNSAVED_ENTITY;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SkipReason {
    Disabled,
    KeyNotValidated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Composition {
    /// Preconditions failed, nothing was built.
    Skipped(SkipReason),
    /// Duplicate of the last delivered heartbeat.
    Suppressed,
    Ready(Heartbeat),
}

pub struct HeartbeatComposer {
    context: Arc<TrackerContext>,
    host: Arc<dyn HostEnvironment>,
    branches: Arc<dyn BranchResolver>,
}

impl HeartbeatComposer {
    pub fn new(
        context: Arc<TrackerContext>,
        host: Arc<dyn HostEnvironment>,
        branches: Arc<dyn BranchResolver>,
    ) -> HeartbeatComposer {
        return HeartbeatComposer {
            context,
            host,
            branches,
        };
    }

    pub fn now() -> i64 {
        return Utc::now().timestamp();
    }

    fn entity(&self) -> String {
        return self
            .host
            .active_document_path()
            .filter(|path| return !path.trim().is_empty())
            .unwrap_or_else(|| return UNSAVED_ENTITY.to_string());
    }

    /// Builds the heartbeat for the host's current state at `time`, unless
    /// tracking is off or it would duplicate the last delivered one. The
    /// branch is only resolved once the heartbeat is known to be sent.
    pub async fn compose(&self, is_write: bool, time: i64) -> Composition {
        if !self.context.is_enabled() {
            tracing::debug!("Tracking disabled, skipping heartbeat");
            return Composition::Skipped(SkipReason::Disabled);
        }

        if !self.context.is_key_validated() {
            tracing::debug!("API key not validated, skipping heartbeat");
            return Composition::Skipped(SkipReason::KeyNotValidated);
        }

        let entity = self.entity();
        if self
            .context
            .last_heartbeat()
            .suppresses(&entity, time, is_write)
        {
            tracing::debug!(entity = entity, time = time, "Suppressed duplicate heartbeat");
            return Composition::Suppressed;
        }

        let project = self
            .context
            .active_project()
            .map(|project| return project.name)
            .unwrap_or_default();
        let branch = self.branches.current_branch().await;

        return Composition::Ready(Heartbeat::new(
            &entity, time, &project, &branch, is_write,
        ));
    }
}

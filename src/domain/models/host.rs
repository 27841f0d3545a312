#[cfg(test)]
#[path = "host_test.rs"]
mod tests;

use std::path::PathBuf;

use strum::EnumIter;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

/// Lifecycle hooks exposed by the editor host. Every one of them produces a
/// heartbeat attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum HostHook {
    SceneSaved,
    SceneOpened,
    SceneClosing,
    SceneCreated,
    PlayModeChanged,
    PropertyContextMenu,
    HotReloadCompleted,
}

impl HostHook {
    pub fn parse(text: &str) -> Option<HostHook> {
        return HostHook::iter().find(|e| return e.to_string() == text);
    }

    /// Only an explicit save counts as a write.
    pub fn is_write(&self) -> bool {
        return *self == HostHook::SceneSaved;
    }
}

/// Registration points the host offers. Registrations do not survive a hot
/// reload, so they must be made again once it completes.
pub trait HostHooks: Send + Sync {
    fn subscribe(&self, hook: HostHook, tx: mpsc::UnboundedSender<HostHook>);

    fn unsubscribe_all(&self);
}

/// Queries answered by the host about what the user is currently doing.
pub trait HostEnvironment: Send + Sync {
    /// Path of the active document, `None` when it is not saved to disk.
    fn active_document_path(&self) -> Option<String>;

    /// Display name of the application/project open in the host.
    fn application_name(&self) -> String;

    /// Platform identifier, used to pick the search path separator.
    fn platform(&self) -> String;

    /// Directory version control commands run in.
    fn project_root(&self) -> PathBuf;
}

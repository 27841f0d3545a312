#[cfg(test)]
#[path = "heartbeat_test.rs"]
mod tests;

use serde::Deserialize;
use serde::Serialize;

/// Entity reported when the host has no document backed by a file on disk.
pub const UNSAVED_ENTITY: &str = "Unsaved Scene";
pub const ENTITY_TYPE: &str = "app";
pub const LANGUAGE: &str = "Unity";
pub const DEFAULT_BRANCH: &str = "master";

/// Non-write heartbeats for the same entity inside this window are dropped.
pub const HEARTBEAT_COOLDOWN_SECS: f64 = 120.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub time: i64,
    pub project: String,
    pub branch: String,
    pub language: String,
    pub is_write: bool,
    pub plugin: String,
}

impl Heartbeat {
    pub fn new(entity: &str, time: i64, project: &str, branch: &str, is_write: bool) -> Heartbeat {
        let mut entity = entity.trim().to_string();
        if entity.is_empty() {
            entity = UNSAVED_ENTITY.to_string();
        }

        let mut branch = branch.trim().to_string();
        if branch.is_empty() {
            branch = DEFAULT_BRANCH.to_string();
        }

        return Heartbeat {
            entity,
            entity_type: ENTITY_TYPE.to_string(),
            time,
            project: project.to_string(),
            branch,
            language: LANGUAGE.to_string(),
            is_write,
            plugin: Heartbeat::plugin_name(),
        };
    }

    pub fn plugin_name() -> String {
        return format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
    }
}

/// The heartbeat the server last acknowledged. This is also the shape of the
/// `data` payload echoed back by the heartbeats endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LastHeartbeat {
    #[serde(default)]
    pub id: String,
    pub entity: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    pub time: f64,
}

impl LastHeartbeat {
    /// Writes always go through. Anything else for the same entity is a
    /// duplicate until the cooldown has elapsed.
    pub fn suppresses(&self, entity: &str, time: i64, is_write: bool) -> bool {
        if is_write {
            return false;
        }

        if self.entity != entity {
            return false;
        }

        return (time as f64) - self.time < HEARTBEAT_COOLDOWN_SECS;
    }
}

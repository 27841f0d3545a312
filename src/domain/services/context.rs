#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::configuration::SettingKey;
use crate::configuration::SettingsStore;
use crate::domain::models::LastHeartbeat;
use crate::domain::models::Project;
use crate::domain::models::User;

/// State that only lives for the current session. A hot reload throws all of
/// it away.
#[derive(Default)]
struct Session {
    user: Option<User>,
    projects: Vec<Project>,
    last_heartbeat: LastHeartbeat,
}

/// Credentials, project selection and debounce memory shared by the tracker
/// components. Durable values go through the settings store, the rest is
/// held in memory until `reinitialize`.
pub struct TrackerContext {
    settings: Arc<dyn SettingsStore>,
    session: Mutex<Session>,
}

impl TrackerContext {
    pub fn new(settings: Arc<dyn SettingsStore>) -> TrackerContext {
        return TrackerContext {
            settings,
            session: Mutex::new(Session::default()),
        };
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        return self.session.lock().unwrap_or_else(PoisonError::into_inner);
    }

    pub fn settings(&self) -> Arc<dyn SettingsStore> {
        return self.settings.clone();
    }

    pub fn is_enabled(&self) -> bool {
        return self.settings.get_bool(SettingKey::Enabled, true);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings.set_bool(SettingKey::Enabled, enabled);
    }

    pub fn api_key(&self) -> String {
        return self.settings.get_string(SettingKey::ApiKey, "");
    }

    /// Stores the key. A different key invalidates the previous validation.
    pub fn set_api_key(&self, key: &str) {
        if self.api_key() == key {
            return;
        }

        self.settings.set_string(SettingKey::ApiKey, key);
        self.set_key_validated(false);
    }

    pub fn is_key_validated(&self) -> bool {
        return self.settings.get_bool(SettingKey::ApiKeyValidated, false);
    }

    pub fn set_key_validated(&self, validated: bool) {
        self.settings
            .set_bool(SettingKey::ApiKeyValidated, validated);
    }

    pub fn user(&self) -> Option<User> {
        return self.session().user.clone();
    }

    pub fn set_user(&self, user: Option<User>) {
        self.session().user = user;
    }

    pub fn projects(&self) -> Vec<Project> {
        return self.session().projects.clone();
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        self.session().projects = projects;
    }

    pub fn active_project(&self) -> Option<Project> {
        let name = self.settings.get_string(SettingKey::ProjectName, "");
        if name.is_empty() {
            return None;
        }

        let id = self.settings.get_string(SettingKey::ProjectId, "");
        return Some(Project::new(&id, &name));
    }

    pub fn select_project(&self, project: Option<&Project>) {
        match project {
            Some(project) => {
                self.settings.set_string(SettingKey::ProjectId, &project.id);
                self.settings
                    .set_string(SettingKey::ProjectName, &project.name);
                tracing::info!(project = project.name, "Selected project");
            }
            None => {
                self.settings.set_string(SettingKey::ProjectId, "");
                self.settings.set_string(SettingKey::ProjectName, "");
            }
        }
    }

    /// Selects the cached project with exactly this name. Returns false when
    /// there is none.
    pub fn select_project_by_name(&self, name: &str) -> bool {
        let project = self
            .projects()
            .into_iter()
            .find(|project| return project.name == name);

        if let Some(project) = project {
            self.select_project(Some(&project));
            return true;
        }

        return false;
    }

    pub fn last_heartbeat(&self) -> LastHeartbeat {
        return self.session().last_heartbeat.clone();
    }

    pub fn record_heartbeat(&self, heartbeat: LastHeartbeat) {
        self.session().last_heartbeat = heartbeat;
    }

    /// Drops everything held in memory, as a host reload does. Durable
    /// settings are untouched, debounce memory starts from zero again.
    pub fn reinitialize(&self) {
        *self.session() = Session::default();
        tracing::debug!("Tracker context reinitialized");
    }
}

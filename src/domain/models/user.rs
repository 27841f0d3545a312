use serde::Deserialize;
use serde::Serialize;

/// Profile returned by the current user endpoint when a key validates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub photo: Option<String>,
    pub last_plugin: Option<String>,
    pub last_heartbeat: Option<String>,
}

impl User {
    pub fn label(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.to_string();
        }

        if let Some(name) = &self.username {
            return name.to_string();
        }

        return self.id.to_string();
    }
}

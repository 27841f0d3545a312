#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

use std::fs;
use std::path;

use anyhow::Result;
use dashmap::DashMap;
use strum::EnumIter;

/// Names of the durable settings. These survive restarts and hot reloads.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SettingKey {
    Enabled,
    ApiKey,
    ApiKeyValidated,
    GitEnabled,
    ProjectId,
    ProjectName,
}

/// Durable key/value store owned by the host.
pub trait SettingsStore: Send + Sync {
    fn get_bool(&self, key: SettingKey, default: bool) -> bool;
    fn set_bool(&self, key: SettingKey, value: bool);
    fn get_string(&self, key: SettingKey, default: &str) -> String;
    fn set_string(&self, key: SettingKey, value: &str);
    fn get_int(&self, key: SettingKey, default: i64) -> i64;
    fn set_int(&self, key: SettingKey, value: i64);
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    fn to_toml(&self) -> toml_edit::Item {
        match self {
            SettingValue::Bool(val) => return toml_edit::value(*val),
            SettingValue::Int(val) => return toml_edit::value(*val),
            SettingValue::Text(val) => return toml_edit::value(val.as_str()),
        }
    }

    fn from_toml(item: &toml_edit::Item) -> Option<SettingValue> {
        if let Some(val) = item.as_bool() {
            return Some(SettingValue::Bool(val));
        }

        if let Some(val) = item.as_integer() {
            return Some(SettingValue::Int(val));
        }

        if let Some(val) = item.as_str() {
            return Some(SettingValue::Text(val.to_string()));
        }

        return None;
    }
}

/// Settings held in memory only. Used by tests and as the backing map of
/// `FileSettings`.
#[derive(Default)]
pub struct MemorySettings {
    values: DashMap<String, SettingValue>,
}

impl MemorySettings {
    fn get(&self, key: SettingKey) -> Option<SettingValue> {
        return self
            .values
            .get(&key.to_string())
            .map(|val| return val.clone());
    }

    fn set(&self, key: SettingKey, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }
}

impl SettingsStore for MemorySettings {
    fn get_bool(&self, key: SettingKey, default: bool) -> bool {
        if let Some(SettingValue::Bool(val)) = self.get(key) {
            return val;
        }

        return default;
    }

    fn set_bool(&self, key: SettingKey, value: bool) {
        self.set(key, SettingValue::Bool(value));
    }

    fn get_string(&self, key: SettingKey, default: &str) -> String {
        if let Some(SettingValue::Text(val)) = self.get(key) {
            return val;
        }

        return default.to_string();
    }

    fn set_string(&self, key: SettingKey, value: &str) {
        self.set(key, SettingValue::Text(value.to_string()));
    }

    fn get_int(&self, key: SettingKey, default: i64) -> i64 {
        if let Some(SettingValue::Int(val)) = self.get(key) {
            return val;
        }

        return default;
    }

    fn set_int(&self, key: SettingKey, value: i64) {
        self.set(key, SettingValue::Int(value));
    }
}

/// Settings persisted to a TOML file. Every write rewrites the file.
pub struct FileSettings {
    pub file_path: path::PathBuf,
    memory: MemorySettings,
}

impl FileSettings {
    pub fn open(file_path: path::PathBuf) -> Result<FileSettings> {
        let memory = MemorySettings::default();

        if file_path.exists() {
            let toml_str = fs::read_to_string(&file_path)?;
            let doc = toml_str.parse::<toml_edit::Document>()?;
            for (key, item) in doc.iter() {
                if let Some(val) = SettingValue::from_toml(item) {
                    memory.values.insert(key.to_string(), val);
                }
            }
        }

        return Ok(FileSettings { file_path, memory });
    }

    fn persist(&self) -> Result<()> {
        let mut entries = self
            .memory
            .values
            .iter()
            .map(|entry| return (entry.key().to_string(), entry.value().clone()))
            .collect::<Vec<(String, SettingValue)>>();
        entries.sort_by(|a, b| return a.0.cmp(&b.0));

        let mut doc = toml_edit::Document::new();
        for (key, val) in entries.iter() {
            doc[key.as_str()] = val.to_toml();
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file_path, doc.to_string())?;

        return Ok(());
    }

    fn persist_or_warn(&self, key: SettingKey) {
        if let Err(err) = self.persist() {
            tracing::warn!(
                key = key.to_string(),
                path = ?self.file_path,
                error = ?err,
                "Failed to persist setting"
            );
        }
    }
}

impl SettingsStore for FileSettings {
    fn get_bool(&self, key: SettingKey, default: bool) -> bool {
        return self.memory.get_bool(key, default);
    }

    fn set_bool(&self, key: SettingKey, value: bool) {
        self.memory.set_bool(key, value);
        self.persist_or_warn(key);
    }

    fn get_string(&self, key: SettingKey, default: &str) -> String {
        return self.memory.get_string(key, default);
    }

    fn set_string(&self, key: SettingKey, value: &str) {
        self.memory.set_string(key, value);
        self.persist_or_warn(key);
    }

    fn get_int(&self, key: SettingKey, default: i64) -> i64 {
        return self.memory.get_int(key, default);
    }

    fn set_int(&self, key: SettingKey, value: i64) {
        self.memory.set_int(key, value);
        self.persist_or_warn(key);
    }
}

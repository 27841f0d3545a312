#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    ApiURL,
    AppName,
    ConfigFile,
    ProjectDir,
    SettingsFile,
    TickInterval,
}

fn app_cache_dir() -> path::PathBuf {
    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("wakabeat");
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        let project_dir = env::current_dir().unwrap_or_else(|_| return path::PathBuf::from("."));

        #[cfg(not(target_os = "macos"))]
        let config_path = dirs::config_dir()
            .unwrap_or_else(app_cache_dir)
            .join("wakabeat/config.toml");
        #[cfg(target_os = "macos")]
        let config_path = dirs::home_dir()
            .unwrap_or_else(app_cache_dir)
            .join(".config/wakabeat/config.toml");

        let res = match key {
            ConfigKey::ApiURL => "https://api.wakatime.com/api/v1".to_string(),
            ConfigKey::AppName => project_dir
                .file_name()
                .map(|name| return name.to_string_lossy().to_string())
                .unwrap_or_default(),
            ConfigKey::ProjectDir => project_dir.to_string_lossy().to_string(),
            ConfigKey::SettingsFile => app_cache_dir()
                .join("settings.toml")
                .to_string_lossy()
                .to_string(),
            ConfigKey::TickInterval => "50".to_string(),

            // Special
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
        };

        return res;
    }

    pub fn log_dir() -> String {
        return env::var("WAKABEAT_LOG_DIR").unwrap_or_else(|_| {
            return app_cache_dir().to_string_lossy().to_string();
        });
    }

    pub async fn load(clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::set(key, val_str);
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            api_url = Config::get(ConfigKey::ApiURL),
            app_name = Config::get(ConfigKey::AppName),
            project_dir = Config::get(ConfigKey::ProjectDir),
            settings_file = Config::get(ConfigKey::SettingsFile),
            tick_interval = Config::get(ConfigKey::TickInterval),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i32>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = {}", toml_edit::Value::from(val.as_str()));
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}

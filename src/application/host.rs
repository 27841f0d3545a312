#[cfg(test)]
#[path = "host_test.rs"]
mod tests;

use std::env;
use std::path::PathBuf;
use std::sync::PoisonError;
use std::sync::RwLock;

use anyhow::Result;
use dashmap::DashMap;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::domain::models::HostEnvironment;
use crate::domain::models::HostHook;
use crate::domain::models::HostHooks;

/// Maps the short words accepted on a line to hooks. Full kebab-case hook
/// names are accepted as well.
fn parse_hook(word: &str) -> Option<HostHook> {
    let hook = match word.to_lowercase().as_str() {
        "saved" | "save" => HostHook::SceneSaved,
        "opened" | "open" => HostHook::SceneOpened,
        "closing" | "closed" | "close" => HostHook::SceneClosing,
        "created" | "new" => HostHook::SceneCreated,
        "play" => HostHook::PlayModeChanged,
        "inspect" | "context-menu" => HostHook::PropertyContextMenu,
        "reload" => HostHook::HotReloadCompleted,
        other => return HostHook::parse(other),
    };

    return Some(hook);
}

/// Host driven by text lines, one event per line in the form
/// `<hook> [path]`. Used by `wakabeat watch` with stdin.
pub struct LineHost {
    subscribers: DashMap<HostHook, mpsc::UnboundedSender<HostHook>>,
    document: RwLock<Option<String>>,
    app_name: String,
    project_root: PathBuf,
}

impl LineHost {
    pub fn new(app_name: &str, project_root: PathBuf) -> LineHost {
        return LineHost {
            subscribers: DashMap::new(),
            document: RwLock::new(None),
            app_name: app_name.to_string(),
            project_root,
        };
    }

    pub fn set_document(&self, path: Option<&str>) {
        let mut document = self
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *document = path
            .map(|path| return path.trim().to_string())
            .filter(|path| return !path.is_empty());
    }

    pub fn parse_line(line: &str) -> Option<(HostHook, Option<String>)> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, Some(rest.trim().to_string())),
            None => (line, None),
        };

        let hook = parse_hook(word)?;
        return Some((hook, rest.filter(|path| return !path.is_empty())));
    }

    /// Applies the line to the tracked document and forwards the hook to its
    /// subscriber. Returns `false` when nothing was delivered.
    pub fn dispatch_line(&self, line: &str) -> bool {
        let (hook, path) = match LineHost::parse_line(line) {
            Some(res) => res,
            None => {
                if !line.trim().is_empty() {
                    tracing::warn!(line = line, "Unrecognized host event");
                }
                return false;
            }
        };

        if let Some(path) = path {
            match hook {
                HostHook::SceneOpened | HostHook::SceneSaved | HostHook::SceneCreated => {
                    self.set_document(Some(&path));
                }
                _ => {}
            }
        }

        let tx = match self.subscribers.get(&hook) {
            Some(tx) => tx.value().clone(),
            None => {
                tracing::debug!(hook = hook.to_string(), "No subscriber for host event");
                return false;
            }
        };

        return tx.send(hook).is_ok();
    }

    /// Dispatches every line until the reader is exhausted.
    pub async fn run<R>(&self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            self.dispatch_line(&line);
        }

        tracing::debug!("Host input closed");
        return Ok(());
    }
}

impl HostHooks for LineHost {
    fn subscribe(&self, hook: HostHook, tx: mpsc::UnboundedSender<HostHook>) {
        self.subscribers.insert(hook, tx);
    }

    fn unsubscribe_all(&self) {
        self.subscribers.clear();
    }
}

impl HostEnvironment for LineHost {
    fn active_document_path(&self) -> Option<String> {
        return self
            .document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
    }

    fn application_name(&self) -> String {
        return self.app_name.to_string();
    }

    fn platform(&self) -> String {
        return env::consts::OS.to_string();
    }

    fn project_root(&self) -> PathBuf {
        return self.project_root.clone();
    }
}

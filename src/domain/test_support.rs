use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::models::BranchResolver;
use crate::domain::models::HostEnvironment;
use crate::domain::models::HostHook;
use crate::domain::models::HostHooks;
use crate::domain::models::ProgressIndicator;

pub struct FakeHost {
    pub document: Mutex<Option<String>>,
    pub app_name: String,
}

impl FakeHost {
    pub fn new(document: Option<&str>, app_name: &str) -> FakeHost {
        return FakeHost {
            document: Mutex::new(document.map(|e| return e.to_string())),
            app_name: app_name.to_string(),
        };
    }

    pub fn open(&self, document: Option<&str>) {
        *self.document.lock().unwrap() = document.map(|e| return e.to_string());
    }
}

impl HostEnvironment for FakeHost {
    fn active_document_path(&self) -> Option<String> {
        return self.document.lock().unwrap().clone();
    }

    fn application_name(&self) -> String {
        return self.app_name.to_string();
    }

    fn platform(&self) -> String {
        return "linux".to_string();
    }

    fn project_root(&self) -> PathBuf {
        return PathBuf::from("/tmp/project");
    }
}

pub struct FakeBranches {
    pub branch: String,
    pub calls: AtomicUsize,
}

impl FakeBranches {
    pub fn new(branch: &str) -> FakeBranches {
        return FakeBranches {
            branch: branch.to_string(),
            calls: AtomicUsize::new(0),
        };
    }

    pub fn calls(&self) -> usize {
        return self.calls.load(Ordering::SeqCst);
    }
}

#[async_trait]
impl BranchResolver for FakeBranches {
    #[allow(clippy::implicit_return)]
    async fn current_branch(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        return self.branch.to_string();
    }
}

#[derive(Default)]
pub struct FakeHooks {
    pub subscribed: Mutex<Vec<HostHook>>,
    pub senders: Mutex<Vec<(HostHook, mpsc::UnboundedSender<HostHook>)>>,
    pub unsubscribe_calls: AtomicUsize,
}

impl FakeHooks {
    pub fn subscribed(&self) -> Vec<HostHook> {
        return self.subscribed.lock().unwrap().clone();
    }

    pub fn unsubscribe_calls(&self) -> usize {
        return self.unsubscribe_calls.load(Ordering::SeqCst);
    }

    /// Fires the hook through whatever sender is currently registered.
    pub fn fire(&self, hook: HostHook) -> bool {
        let senders = self.senders.lock().unwrap();
        if let Some((_, tx)) = senders.iter().find(|(e, _)| return *e == hook) {
            return tx.send(hook).is_ok();
        }

        return false;
    }
}

impl HostHooks for FakeHooks {
    fn subscribe(&self, hook: HostHook, tx: mpsc::UnboundedSender<HostHook>) {
        self.subscribed.lock().unwrap().push(hook);
        self.senders.lock().unwrap().push((hook, tx));
    }

    fn unsubscribe_all(&self) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.senders.lock().unwrap().clear();
    }
}

#[derive(Default)]
pub struct FakeProgress {
    pub cancel: AtomicBool,
    pub reports: AtomicUsize,
    pub cleared: AtomicBool,
}

impl FakeProgress {
    pub fn cancelling() -> FakeProgress {
        return FakeProgress {
            cancel: AtomicBool::new(true),
            ..FakeProgress::default()
        };
    }
}

impl ProgressIndicator for FakeProgress {
    fn report(&self, _title: &str, _info: &str, _progress: f32) -> bool {
        self.reports.fetch_add(1, Ordering::SeqCst);
        return self.cancel.load(Ordering::SeqCst);
    }

    fn clear(&self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

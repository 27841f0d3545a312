use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::task::JoinHandle;
use yansi::Paint;

use crate::domain::models::ProgressIndicator;

/// Progress line on stderr. Ctrl-C requests cancellation instead of killing
/// the process while it is alive.
pub struct TerminalProgress {
    cancelled: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

impl TerminalProgress {
    pub fn new() -> TerminalProgress {
        let cancelled = Arc::new(AtomicBool::new(false));

        let flag = cancelled.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::SeqCst);
            }
        });

        return TerminalProgress {
            cancelled,
            listener,
        };
    }
}

impl ProgressIndicator for TerminalProgress {
    fn report(&self, title: &str, info: &str, progress: f32) -> bool {
        let percent = (progress.clamp(0.0, 1.0) * 100.0).round();
        eprint!(
            "\r{} {info} {}",
            Paint::cyan(title).bold(),
            Paint::new(format!("{percent:>3}%")).dimmed()
        );
        let _ = std::io::stderr().flush();

        return self.cancelled.load(Ordering::SeqCst);
    }

    fn clear(&self) {
        eprint!("\r\x1b[2K");
        let _ = std::io::stderr().flush();
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

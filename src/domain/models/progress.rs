/// Foreground progress display for the one request the user waits on.
pub trait ProgressIndicator: Send + Sync {
    /// Shows progress in the `0.0..=1.0` range. Returns `true` once the user
    /// asked to cancel.
    fn report(&self, title: &str, info: &str, progress: f32) -> bool;

    fn clear(&self);
}

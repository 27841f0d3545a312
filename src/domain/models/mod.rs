mod envelope;
mod heartbeat;
mod host;
mod progress;
mod project;
mod user;
mod vcs;

pub use envelope::*;
pub use heartbeat::*;
pub use host::*;
pub use progress::*;
pub use project::*;
pub use user::*;
pub use vcs::*;

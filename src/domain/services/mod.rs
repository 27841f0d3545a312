mod bindings;
mod context;
mod heartbeats;
mod scheduler;
mod tracker;

pub use bindings::*;
pub use context::*;
pub use heartbeats::*;
pub use scheduler::*;
pub use tracker::*;

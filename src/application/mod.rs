pub mod cli;
pub mod host;
pub mod progress;

pub mod api;
pub mod vcs;

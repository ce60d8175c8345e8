//! Core services: the verification pipeline and its collaborators

pub mod content_store;
pub mod leaderboard;
pub mod lifecycle;
pub mod scorer;
pub mod user_directory;
pub mod verification;

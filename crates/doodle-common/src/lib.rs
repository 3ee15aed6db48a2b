pub mod config;
pub mod game;
pub mod lobby;
pub mod profile;
pub mod protocol;
pub mod room;
pub mod scoring;
pub mod session;
pub mod store;
pub mod words;

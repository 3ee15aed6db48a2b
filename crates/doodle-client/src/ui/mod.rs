pub mod canvas;
pub mod dashboard;
pub mod game;
pub mod help_popup;
pub mod lobby;
pub mod scoreboard;
pub mod standings_widget;

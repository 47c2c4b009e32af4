pub mod config;
pub mod game;
pub mod input;
pub mod logging;
pub mod session;

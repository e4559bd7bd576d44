pub mod browser;
pub mod config;
pub mod logging;
pub mod media;

use std::path::PathBuf;

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
mod server;
pub mod spotify;

lazy_static::lazy_static! {
    pub static ref CONFIG_PATH: PathBuf = {
        let home = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
        #[cfg(windows)]
        return home.join(".autoplay");
        #[cfg(not(windows))]
        return home.join(".config/autoplay");
    };
}

use log::LevelFilter;
use reqwest::StatusCode;

/// Warn for dependencies, info for this crate
const DEFAULT_FILTER: &str = concat!("warn,", env!("CARGO_CRATE_NAME"), "=info");

/// Install `env_logger`.
///
/// `verbosity` is the `-v` count minus the `-q` count. Priority from highest to lowest: the
/// command line flags, `RUST_LOG`, then [`DEFAULT_FILTER`].
pub fn init(verbosity: i8) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, DEFAULT_FILTER),
    );

    if let Some(level) = level(verbosity) {
        logger.filter_module(env!("CARGO_CRATE_NAME"), level);
    }

    // A second init, as in tests, keeps the first logger
    let _ = logger.try_init();
}

/// Level for this crate picked by the flags, `None` leaves the environment in charge
fn level(verbosity: i8) -> Option<LevelFilter> {
    match verbosity {
        i8::MIN..=-1 => Some(LevelFilter::Warn),
        0 => None,
        1 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

pub struct ResponseLogger;

impl ResponseLogger {
    /// Record the body of a non success Spotify response
    pub fn log_error(status: StatusCode, body: &str) {
        log::debug!("[{status}] {}", body.replace('\n', ""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_pick_crate_level() {
        assert_eq!(level(0), None);
        assert_eq!(level(-2), Some(LevelFilter::Warn));
        assert_eq!(level(1), Some(LevelFilter::Debug));
        assert_eq!(level(3), Some(LevelFilter::Trace));
        assert_eq!(DEFAULT_FILTER, "warn,autoplay=info");
    }
}

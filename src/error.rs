use std::path::PathBuf;

use hyper::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing configuration: {0}")]
    Config(String),
    #[error("invalid playlist uri {0:?}, expected spotify:playlist:<id>")]
    InvalidPlaylistUri(String),

    #[error("no token stored at {}", .0.display())]
    NotFound(PathBuf),
    #[error("stored token at {} is corrupt: {reason}", path.display())]
    CorruptData { path: PathBuf, reason: String },
    #[error("failed to read token from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write token to {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("refresh token was rejected, log in again at /login")]
    AuthExpired,

    #[error("callback state does not match the pending login")]
    StateMismatch,
    #[error("authorization was denied: {0}")]
    AuthorizationDenied(String),
    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("malformed callback: {0}")]
    BadCallback(String),

    #[error("spotify responded {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to parse spotify response: {0}")]
    Decode(String),
    #[error("nothing playing on device {0:?} yet")]
    NotPlaying(String),
    #[error("playback did not start after {attempts} attempts: {last}")]
    PlaybackActivationFailed { attempts: u32, last: Box<Error> },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors that must stop the process even when they surface inside a request handler.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::WriteError { .. })
    }

    /// Status the web front door answers with when a login attempt fails with this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::StateMismatch => StatusCode::NOT_FOUND,
            Error::AuthorizationDenied(_) | Error::ExchangeFailed(_) | Error::BadCallback(_) => {
                StatusCode::FORBIDDEN
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

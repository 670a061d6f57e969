use base64::Engine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Spotify app credentials, read from `AUTOPLAY_CLIENT_ID` and `AUTOPLAY_CLIENT_SECRET`
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub(crate) fn from_vars<I: IntoIterator<Item = (String, String)>>(vars: I) -> Result<Self> {
        let creds: Self = envy::prefixed("AUTOPLAY_")
            .from_iter(vars)
            .map_err(|err| Error::Config(err.to_string()))?;

        if creds.client_id.is_empty() {
            return Err(Error::Config("AUTOPLAY_CLIENT_ID is empty".into()));
        }
        if creds.client_secret.is_empty() {
            return Err(Error::Config("AUTOPLAY_CLIENT_SECRET is empty".into()));
        }
        Ok(creds)
    }

    /// Value for the `Basic` authorization header of the token endpoint
    pub fn auth(&self) -> String {
        let auth = format!("{}:{}", self.client_id, self.client_secret);
        base64::engine::general_purpose::STANDARD.encode(auth.as_bytes())
    }
}

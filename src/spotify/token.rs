use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Spotify OAuth token as it is kept in memory and on disk.
///
/// The field names match the common `oauth2` token json layout so files written by other tools
/// can be picked up as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

/// Body of a successful `POST /api/token`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Token {
    /// Leeway for slower requests, a token this close to its expiry counts as expired
    pub const LEEWAY: i64 = 10;

    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now() + Duration::seconds(Self::LEEWAY)
    }

    /// Get the auth header for the token
    ///
    /// # Example
    ///
    /// `Bearer 1POdFZRZbvb...qqillRxMr2z`
    pub fn to_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Build a token from a code exchange response. The response must carry a refresh token.
    pub(crate) fn from_response(response: TokenResponse) -> Option<Self> {
        let refresh_token = response.refresh_token.filter(|t| !t.is_empty())?;
        Some(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token,
            expiry: Utc::now() + Duration::seconds(response.expires_in),
        })
    }

    /// Apply a refresh response. Spotify may omit the refresh token, in which case the current
    /// one stays valid.
    pub(crate) fn refreshed(self, response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or(self.refresh_token),
            expiry: Utc::now() + Duration::seconds(response.expires_in),
        }
    }

    /// Check the record is usable, returns the name of the first empty field
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        if self.access_token.is_empty() {
            Some("access_token")
        } else if self.refresh_token.is_empty() {
            Some("refresh_token")
        } else if self.token_type.is_empty() {
            Some("token_type")
        } else {
            None
        }
    }
}

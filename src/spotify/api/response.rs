use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    /// Spotify omits the id for some restricted devices
    pub id: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub _type: String,
    pub volume_percent: Option<u32>,
}

/// `GET /me/player`, trimmed to what is needed to confirm playback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerState {
    pub device: Device,
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub context: Option<Context>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Context {
    pub uri: String,
}

impl PlayerState {
    /// Playback counts as started when the requested device reports itself active and playing.
    pub fn is_playing_on(&self, device_id: &str) -> bool {
        self.device.id.as_deref() == Some(device_id) && self.device.is_active && self.is_playing
    }
}

/// Web api error body: `{"error": {"status": 404, "message": "Device not found"}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub message: String,
}

/// Accounts error body: `{"error": "invalid_grant", "error_description": "Refresh token revoked"}`
#[derive(Debug, Deserialize)]
pub(crate) struct AuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Display for AuthErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::spotify::api::body::StartPlayback;
use crate::spotify::api::{Accounts, Player};
use crate::spotify::cache::TokenCache;
use crate::spotify::Token;

/// Retries after the first attempt
pub const RETRIES: u32 = 3;
/// Pause between two attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

lazy_static! {
    static ref PLAYLIST_URI: Regex = Regex::new(r"^spotify:playlist:([0-9A-Za-z]+)$").unwrap();
    static ref PLAYLIST_URL: Regex = Regex::new(
        r"^https://open\.spotify\.com/(?:intl-[a-z]+/)?playlist/([0-9A-Za-z]+)/?(?:\?.*)?$"
    )
    .unwrap();
}

/// `spotify:playlist:<id>`, also parsed from `https://open.spotify.com/playlist/<id>` share links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistUri(String);

impl PlaylistUri {
    pub fn id(&self) -> &str {
        &self.0["spotify:playlist:".len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PlaylistUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        PLAYLIST_URI
            .captures(s)
            .or_else(|| PLAYLIST_URL.captures(s))
            .and_then(|c| c.get(1))
            .map(|id| PlaylistUri(format!("spotify:playlist:{}", id.as_str())))
            .ok_or_else(|| Error::InvalidPlaylistUri(s.to_string()))
    }
}

impl Display for PlaylistUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to play and where, fixed for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    device_id: String,
    playlist: PlaylistUri,
}

impl PlaybackRequest {
    pub fn new<S: Into<String>>(device_id: S, playlist: PlaylistUri) -> Result<Self> {
        let device_id = device_id.into().trim().to_string();
        if device_id.is_empty() {
            return Err(Error::Config("device id is empty".into()));
        }
        Ok(Self {
            device_id,
            playlist,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn playlist(&self) -> &PlaylistUri {
        &self.playlist
    }
}

/// Playback was seen running on the requested device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub attempts: u32,
}

/// Starts a playlist and keeps checking until Spotify reports it playing.
///
/// A successful play command is not proof of playback, devices can take several seconds to
/// wake up. Every attempt is therefore followed by a fresh read of the player state.
#[derive(Debug)]
pub struct Activator<C> {
    client: C,
    retries: u32,
    delay: Duration,
}

impl<C: Accounts + Player> Activator<C> {
    pub fn new(client: C) -> Self {
        Self::with_policy(client, RETRIES, RETRY_DELAY)
    }

    pub fn with_policy(client: C, retries: u32, delay: Duration) -> Self {
        Self {
            client,
            retries,
            delay,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Refresh the access token if it expired or is about to
    pub async fn refresh(&self, token: Token) -> Result<Token> {
        if !token.is_expired() {
            log::debug!("access token valid until {}", token.expiry);
            return Ok(token);
        }

        log::info!("refreshing access token");
        self.client.refresh_token(token).await
    }

    /// Refresh an expiring token and store the result, a still valid token is returned as is
    async fn renew(&self, cache: &TokenCache, token: Token) -> Result<Token> {
        if !token.is_expired() {
            return Ok(token);
        }

        let token = self.refresh(token).await?;
        cache.save(&token)?;
        Ok(token)
    }

    /// Issue the play command and confirm, sharing one retry budget between both steps.
    ///
    /// The attempts span several retry delays, so the token is checked before every attempt and
    /// renewed through `cache` once it expires. Refresh and store failures end activation.
    pub async fn activate(
        &self,
        cache: &TokenCache,
        mut token: Token,
        request: &PlaybackRequest,
    ) -> Result<Confirmed> {
        let attempts = self.retries + 1;
        let mut attempt = 1;

        loop {
            token = self.renew(cache, token).await?;

            log::info!(
                "playing {} on {} (attempt {attempt}/{attempts})",
                request.playlist(),
                request.device_id()
            );

            let err = match self.attempt(&token, request).await {
                Ok(()) => {
                    log::info!("playback confirmed on {}", request.device_id());
                    return Ok(Confirmed { attempts: attempt });
                }
                Err(err) => err,
            };

            if attempt >= attempts {
                return Err(Error::PlaybackActivationFailed {
                    attempts,
                    last: Box::new(err),
                });
            }

            log::warn!("{err}, retrying in {}s", self.delay.as_secs());
            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, token: &Token, request: &PlaybackRequest) -> Result<()> {
        self.client
            .play(
                token,
                request.device_id(),
                &StartPlayback::context(request.playlist().as_str()),
            )
            .await?;

        match self.client.player_state(token).await? {
            Some(state) if state.is_playing_on(request.device_id()) => Ok(()),
            Some(state) => {
                log::debug!(
                    "player reports device {:?} active={} playing={}",
                    state.device.id,
                    state.device.is_active,
                    state.is_playing
                );
                Err(Error::NotPlaying(request.device_id().to_string()))
            }
            None => Err(Error::NotPlaying(request.device_id().to_string())),
        }
    }

    /// Boot sequence: load the stored token, refresh and store it, then start playback.
    ///
    /// Returns `None` when no token is stored yet, the user has to log in first.
    pub async fn startup(
        &self,
        cache: &TokenCache,
        request: &PlaybackRequest,
    ) -> Result<Option<Confirmed>> {
        let token = match cache.load() {
            Ok(token) => token,
            Err(Error::NotFound(path)) => {
                log::info!("no token at {}, log in to enable playback", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let token = self.refresh(token).await?;
        cache.save(&token)?;

        self.activate(cache, token, request).await.map(Some)
    }
}

pub mod body;
pub mod response;

use std::future::Future;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::logging::ResponseLogger;
use crate::spotify::token::TokenResponse;
use crate::spotify::{Credentials, Token};

use body::{StartPlayback, TokenGrant};
use response::{ApiErrorBody, AuthErrorBody, PlayerState};

pub(crate) static API_BASE_URL: &str = "https://api.spotify.com/v1";
pub(crate) static ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Token endpoint of the Spotify accounts service
pub trait Accounts {
    /// Trade the code handed to `/callback` for a token
    fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<Token>> + Send;

    /// Trade the refresh token for a new access token. A rejected refresh token is
    /// [`Error::AuthExpired`].
    fn refresh_token(&self, token: Token) -> impl Future<Output = Result<Token>> + Send;
}

/// The slice of the player api needed to start and confirm playback
pub trait Player {
    fn play(
        &self,
        token: &Token,
        device_id: &str,
        body: &StartPlayback,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current playback, `None` when Spotify has nothing to report
    fn player_state(&self, token: &Token)
        -> impl Future<Output = Result<Option<PlayerState>>> + Send;
}

/// Small request builder that abstracts the oauth header, api url and json body.
pub struct SpotifyRequest {
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    body: Option<String>,
}

impl SpotifyRequest {
    pub fn new<S: AsRef<str>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: format!("{API_BASE_URL}{}", url.as_ref()),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get<S: AsRef<str>>(url: S) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn put<S: AsRef<str>>(url: S) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn param<S1: ToString, S2: ToString>(mut self, key: S1, value: S2) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Set the body of the request to json
    pub fn with_json<D: Serialize>(mut self, json: &D) -> Result<Self> {
        let json = serde_json::to_string(json).map_err(|err| Error::Decode(err.to_string()))?;
        self.body = Some(json);
        Ok(self)
    }

    pub async fn send(self, client: &reqwest::Client, token: &Token) -> Result<reqwest::Response> {
        let mut request = client
            .request(self.method, self.url)
            .query(&self.params)
            .header("Authorization", token.to_header());

        request = match self.body {
            Some(body) => request.header("Content-Type", "application/json").body(body),
            // Spotify rejects bodyless PUT/POST requests without a length
            None => request.header("Content-Length", 0),
        };

        Ok(request.send().await?)
    }
}

/// Decode a web api response. Empty bodies and `204 No Content` become `None`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<Option<T>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        ResponseLogger::log_error(status, &body);
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|err| err.error.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Ok(None);
    }

    from_json(&body).map(Some).map_err(Error::Decode)
}

/// Strict json decoding: the error names the offending field and trailing input is rejected.
pub(crate) fn from_json<T>(body: &str) -> std::result::Result<T, String>
where
    T: DeserializeOwned,
{
    let mut jd = serde_json::Deserializer::from_str(body);
    let value = serde_path_to_error::deserialize(&mut jd).map_err(|err| err.to_string())?;
    jd.end().map_err(|err| err.to_string())?;
    Ok(value)
}

/// reqwest backed implementation of [`Accounts`] and [`Player`]
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    credentials: Credentials,
    http: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }

    async fn request_token(&self, grant: TokenGrant<'_>) -> Result<(StatusCode, String)> {
        let body = serde_urlencoded::to_string(&grant)
            .map_err(|err| Error::Decode(err.to_string()))?;

        let response = self
            .http
            .post(format!("{ACCOUNTS_URL}/api/token"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Authorization", format!("Basic {}", self.credentials.auth()))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        Ok((status, response.text().await?))
    }
}

fn parse_token(body: &str) -> Result<TokenResponse> {
    from_json(body).map_err(Error::Decode)
}

fn describe_auth_error(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<AuthErrorBody>(body)
        .map(|err| err.to_string())
        .unwrap_or_else(|_| format!("{status}"))
}

impl Accounts for SpotifyClient {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Token> {
        let (status, body) = self
            .request_token(TokenGrant::AuthorizationCode { code, redirect_uri })
            .await?;

        if !status.is_success() {
            ResponseLogger::log_error(status, &body);
            return Err(Error::ExchangeFailed(describe_auth_error(status, &body)));
        }

        Token::from_response(parse_token(&body)?)
            .ok_or_else(|| Error::ExchangeFailed("response carried no refresh token".into()))
    }

    async fn refresh_token(&self, token: Token) -> Result<Token> {
        let (status, body) = self
            .request_token(TokenGrant::RefreshToken {
                refresh_token: &token.refresh_token,
            })
            .await?;

        match status {
            s if s.is_success() => Ok(token.refreshed(parse_token(&body)?)),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                ResponseLogger::log_error(status, &body);
                log::error!("refresh rejected: {}", describe_auth_error(status, &body));
                Err(Error::AuthExpired)
            }
            _ => {
                ResponseLogger::log_error(status, &body);
                Err(Error::Api {
                    status: status.as_u16(),
                    message: describe_auth_error(status, &body),
                })
            }
        }
    }
}

impl Player for SpotifyClient {
    async fn play(&self, token: &Token, device_id: &str, body: &StartPlayback) -> Result<()> {
        let response = SpotifyRequest::put("/me/player/play")
            .param("device_id", device_id)
            .with_json(body)?
            .send(&self.http, token)
            .await?;

        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn player_state(&self, token: &Token) -> Result<Option<PlayerState>> {
        let response = SpotifyRequest::get("/me/player")
            .send(&self.http, token)
            .await?;

        decode(response).await
    }
}

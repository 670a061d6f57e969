use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};
use crate::spotify::api::{Accounts, ACCOUNTS_URL};
use crate::spotify::cache::TokenCache;
use crate::spotify::Token;

pub use callback::Router;

mod callback;

pub mod scopes {
    pub static USER_READ_PLAYBACK_STATE: &str = "user-read-playback-state";
    pub static USER_MODIFY_PLAYBACK_STATE: &str = "user-modify-playback-state";
}

pub mod alphabet {
    pub static STATE: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";
}

/// Anti forgery value binding one `/login` to its `/callback`
#[derive(Clone, PartialEq, Eq)]
pub struct State(String);

impl State {
    pub const LEN: usize = 43;

    pub fn generate() -> Self {
        let mut rng = ChaCha20Rng::from_entropy();
        Self(
            (0..Self::LEN)
                .map(|_| alphabet::STATE[rng.gen_range(0..alphabet::STATE.len())] as char)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare without bailing out on the first differing byte
    fn matches(&self, received: &str) -> bool {
        let (a, b) = (self.0.as_bytes(), received.as_bytes());
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State({}..)", &self.0[..4.min(self.0.len())])
    }
}

/// OAuth2 settings for the authorization request
#[derive(Debug, Clone)]
pub struct OAuth {
    pub client_id: String,
    pub redirect: String,
    pub scopes: Vec<&'static str>,
}

impl OAuth {
    pub fn new<S1: Into<String>, S2: Into<String>>(client_id: S1, redirect: S2) -> Self {
        Self {
            client_id: client_id.into(),
            redirect: redirect.into(),
            scopes: vec![
                scopes::USER_READ_PLAYBACK_STATE,
                scopes::USER_MODIFY_PLAYBACK_STATE,
            ],
        }
    }

    pub fn authorization_url(&self, state: &State) -> String {
        let query = serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect.as_str()),
            ("scope", self.scopes.join(" ").as_str()),
            ("state", state.as_str()),
        ])
        .unwrap_or_default();

        format!("{ACCOUNTS_URL}/authorize?{query}")
    }
}

/// Browser redirect login.
///
/// Only one login can be in flight. Every [`AuthFlow::begin`] replaces the pending state, so a
/// callback for an older login is rejected with [`Error::StateMismatch`].
#[derive(Debug)]
pub struct AuthFlow<A> {
    oauth: OAuth,
    accounts: A,
    cache: TokenCache,
    pending: Mutex<Option<State>>,
}

impl<A: Accounts> AuthFlow<A> {
    pub fn new(oauth: OAuth, accounts: A, cache: TokenCache) -> Self {
        Self {
            oauth,
            accounts,
            cache,
            pending: Mutex::new(None),
        }
    }

    pub fn oauth(&self) -> &OAuth {
        &self.oauth
    }

    /// Start a login, returns the url to send the browser to
    pub fn begin(&self) -> String {
        let state = State::generate();
        let url = self.oauth.authorization_url(&state);
        *self.lock() = Some(state);
        log::info!("login started, waiting for spotify callback");
        url
    }

    /// Finish the login started by the last [`AuthFlow::begin`], exchanging the code for a token
    /// and persisting it. The state is checked before anything else about the callback.
    pub async fn complete(&self, received_state: &str, code: &str) -> Result<Token> {
        self.consume(received_state)?;
        if code.is_empty() {
            return Err(Error::BadCallback("missing code".into()));
        }

        let token = self
            .accounts
            .exchange_code(code, &self.oauth.redirect)
            .await?;
        self.cache.save(&token)?;

        log::info!("logged in, token stored at {}", self.cache.path().display());
        Ok(token)
    }

    /// The user declined on the consent screen
    pub fn deny(&self, received_state: &str, error: &str) -> Result<()> {
        self.consume(received_state)?;
        Err(Error::AuthorizationDenied(error.to_string()))
    }

    /// Compare and clear the pending state under a single lock
    fn consume(&self, received_state: &str) -> Result<()> {
        let mut pending = self.lock();
        if pending
            .as_ref()
            .is_some_and(|state| state.matches(received_state))
        {
            pending.take();
            Ok(())
        } else {
            Err(Error::StateMismatch)
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<State>> {
        // The slot only ever holds a complete value, a poisoned lock is still consistent.
        self.pending.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.as_str().to_string())
    }
}

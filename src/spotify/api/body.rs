use serde::Serialize;

/// `PUT /me/player/play`
///
/// ```json
/// {
///     "context_uri": "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct StartPlayback {
    pub context_uri: String,
}

impl StartPlayback {
    pub fn context<S: Into<String>>(uri: S) -> Self {
        Self {
            context_uri: uri.into(),
        }
    }
}

/// Form fields for `POST https://accounts.spotify.com/api/token`
#[derive(Debug, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum TokenGrant<'a> {
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
    RefreshToken { refresh_token: &'a str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_playback_only_sends_context() {
        let body = serde_json::to_value(StartPlayback::context("spotify:playlist:abc")).unwrap();
        assert_eq!(body, serde_json::json!({ "context_uri": "spotify:playlist:abc" }));
    }

    #[test]
    fn grants_encode_as_forms() {
        let code = serde_urlencoded::to_string(TokenGrant::AuthorizationCode {
            code: "xyz",
            redirect_uri: "http://localhost:3000/callback",
        })
        .unwrap();
        assert_eq!(
            code,
            "grant_type=authorization_code&code=xyz&redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"
        );

        let refresh =
            serde_urlencoded::to_string(TokenGrant::RefreshToken { refresh_token: "r" }).unwrap();
        assert_eq!(refresh, "grant_type=refresh_token&refresh_token=r");
    }
}

use std::convert::Infallible;
use std::sync::Arc;

use html_to_string_macro::html;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

use super::AuthFlow;
use crate::error::{Error, Result};
use crate::spotify::api::Accounts;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

macro_rules! layout {
    ($($html: tt)*) => {
        layout(html! { $($html)*})
    };
}

/// Web front door: `/`, `/login` and `/callback`.
///
/// Login failures are answered per request. Errors that make the process unusable are forwarded
/// on `fatal` so the application can shut down.
pub struct Router<A> {
    flow: Arc<AuthFlow<A>>,
    callback_path: Arc<str>,
    fatal: UnboundedSender<Error>,
}

impl<A> Clone for Router<A> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            callback_path: self.callback_path.clone(),
            fatal: self.fatal.clone(),
        }
    }
}

impl<A: Accounts> Router<A> {
    pub fn new(flow: Arc<AuthFlow<A>>, fatal: UnboundedSender<Error>) -> Self {
        // The callback is served on the path of the registered redirect uri
        let callback_path = flow
            .oauth()
            .redirect
            .parse::<hyper::Uri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|_| String::from("/callback"));

        Self {
            flow,
            callback_path: callback_path.into(),
            fatal,
        }
    }

    pub async fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
    ) -> Response<Full<Bytes>> {
        match (method, path) {
            (&Method::GET, "/") => html_response(StatusCode::OK, index()),
            (&Method::GET, "/login") => redirect(&self.flow.begin()),
            (&Method::GET, path) if path == &*self.callback_path => {
                match self.callback(query).await {
                    Ok(()) => redirect("/"),
                    Err(err) => {
                        log::error!("login failed: {err}");
                        let response = html_response(err.status(), failure(&err));
                        if err.is_fatal() {
                            let _ = self.fatal.send(err);
                        }
                        response
                    }
                }
            }
            _ => html_response(
                StatusCode::NOT_FOUND,
                layout! { <h1>"404 Page not found"</h1> },
            ),
        }
    }

    async fn callback(&self, query: Option<&str>) -> Result<()> {
        let query: CallbackQuery = serde_qs::from_str(query.unwrap_or_default())
            .map_err(|err| Error::BadCallback(err.to_string()))?;
        let state = query.state.unwrap_or_default();

        if let Some(error) = query.error {
            return self.flow.deny(&state, &error);
        }

        let code = query.code.unwrap_or_default();
        self.flow.complete(&state, &code).await.map(|_| ())
    }
}

impl<A> Service<Request<Incoming>> for Router<A>
where
    A: Accounts + Send + Sync + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future =
        futures::future::BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.clone();
        Box::pin(async move {
            let method = req.method().clone();
            let uri = req.uri().clone();
            log::debug!("{method} {}", uri.path());
            Ok(router.route(&method, uri.path(), uri.query()).await)
        })
    }
}

fn redirect(location: &str) -> Response<Full<Bytes>> {
    match HeaderValue::from_str(location) {
        Ok(location) => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(_) => html_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            layout! { <h1>"500 Internal Server Error"</h1> },
        ),
    }
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

fn index() -> String {
    layout! {
        <h1>
            "Start playback with "
            <span class="green">"Spotify"</span>
        </h1>
        <h3><a href="/login">"Log in with Spotify"</a></h3>
    }
}

fn failure(err: &Error) -> String {
    let status = err.status();
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    layout! {
        <h1>{title}</h1>
        <h3><a href="/login">"Try logging in again"</a></h3>
    }
}

fn layout(body: String) -> String {
    html! {
        <html>
            <head>
                <title>"autoplay"</title>
                <style>"
                * {
                    box-sizing: border-box
                }
                html {
                    font-family: Arial;
                    background-color: #191414;
                    color: #FFFFFF
                }
                :is(h1, h3) {
                    text-align: center;
                }
                a {
                    color: #1DB954
                }
                body {
                    padding: 1.5rem;
                }
                .green {
                    color: #1DB954
                }
                "</style>
            </head>
            <body>
                {body}
            </body>
        </html>
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use http_body_util::BodyExt;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    use super::*;
    use crate::spotify::auth::tests::{flow, FakeAccounts};
    use crate::spotify::cache::tests::TempToken;

    fn router(tmp: &TempToken) -> (Router<FakeAccounts>, UnboundedReceiver<Error>) {
        let (tx, rx) = unbounded_channel();
        (Router::new(Arc::new(flow(tmp)), tx), rx)
    }

    fn location(response: &Response<Full<Bytes>>) -> String {
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    async fn get(
        router: &Router<FakeAccounts>,
        path: &str,
        query: Option<&str>,
    ) -> Response<Full<Bytes>> {
        router.route(&Method::GET, path, query).await
    }

    #[tokio::test]
    async fn login_redirects_with_fresh_state() {
        let tmp = TempToken::new();
        let (router, _rx) = router(&tmp);

        let first = get(&router, "/login", None).await;
        assert_eq!(first.status(), StatusCode::TEMPORARY_REDIRECT);
        let first = location(&first);
        assert!(first.starts_with("https://accounts.spotify.com/authorize?"));
        let pending = router.flow.pending().unwrap();
        assert!(first.contains(&format!("state={pending}")));

        let second = location(&get(&router, "/login", None).await);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn mismatched_state_is_not_found_and_persists_nothing() {
        let tmp = TempToken::new();
        let (router, mut rx) = router(&tmp);
        get(&router, "/login", None).await;

        let response = get(&router, "/callback", Some("state=X&code=good-code")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(router.flow.cache.load().is_err());
        assert_eq!(router.flow.accounts.exchanges.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn successful_callback_redirects_home() {
        let tmp = TempToken::new();
        let (router, _rx) = router(&tmp);
        get(&router, "/login", None).await;
        let state = router.flow.pending().unwrap();

        let response = get(
            &router,
            "/callback",
            Some(&format!("state={state}&code=good-code")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/");
        assert!(router.flow.cache.load().is_ok());
    }

    #[tokio::test]
    async fn rejected_code_and_denial_are_forbidden() {
        let tmp = TempToken::new();
        let (router, _rx) = router(&tmp);

        get(&router, "/login", None).await;
        let state = router.flow.pending().unwrap();
        let response = get(&router, "/callback", Some(&format!("state={state}&code=nope"))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        get(&router, "/login", None).await;
        let state = router.flow.pending().unwrap();
        let response = get(
            &router,
            "/callback",
            Some(&format!("state={state}&error=access_denied")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_code_is_forbidden_after_state_check() {
        let tmp = TempToken::new();
        let (router, _rx) = router(&tmp);
        get(&router, "/login", None).await;
        let state = router.flow.pending().unwrap();

        // A forged callback is a mismatch first, whatever else is missing
        let forged = get(&router, "/callback", Some("state=X")).await;
        assert_eq!(forged.status(), StatusCode::NOT_FOUND);
        assert_eq!(router.flow.pending(), Some(state.clone()));

        let response = get(&router, "/callback", Some(&format!("state={state}"))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(router.flow.pending(), None);
        assert_eq!(router.flow.accounts.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn index_links_to_login() {
        let tmp = TempToken::new();
        let (router, _rx) = router(&tmp);
        let response = get(&router, "/", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("href=\"/login\""));

        let missing = get(&router, "/favicon.ico", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_write_is_forwarded_as_fatal() {
        let blocker = TempToken::new();
        blocker.write("not a directory");

        let (tx, mut rx) = unbounded_channel();
        let flow = AuthFlow::new(
            crate::spotify::auth::OAuth::new("client", "http://localhost:3000/callback"),
            FakeAccounts::default(),
            crate::spotify::cache::TokenCache::new(blocker.path().join("token.json")),
        );
        let router = Router::new(Arc::new(flow), tx);

        get(&router, "/login", None).await;
        let state = router.flow.pending().unwrap();
        let response = get(
            &router,
            "/callback",
            Some(&format!("state={state}&code=good-code")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(rx.try_recv(), Ok(Error::WriteError { .. })));
    }
}

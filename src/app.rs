use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::server;
use crate::spotify::{Activator, AuthFlow, OAuth, Router, SpotifyClient, TokenCache};

pub struct App {
    config: Config,
    cache: TokenCache,
    client: SpotifyClient,
    /// Fatal errors raised while serving requests
    fatal: UnboundedSender<Error>,
    errors: UnboundedReceiver<Error>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        Self {
            cache: TokenCache::new(&config.token_file),
            client: SpotifyClient::new(config.credentials.clone()),
            config,
            fatal: tx,
            errors: rx,
        }
    }

    /// Start playback if a token is stored, then serve the login page until a fatal error or
    /// ctrl-c.
    pub async fn run(mut self) -> Result<()> {
        let activator = Activator::new(self.client.clone());
        let started = activator.startup(&self.cache, &self.config.request).await?;

        let listener = TcpListener::bind(self.config.listen).await?;
        log::info!("listening on {}", self.config.listen);

        if started.is_none() {
            let login = self.config.login_url();
            log::info!("log in at {login}");
            if self.config.open_browser {
                if let Err(err) = open::that(&login) {
                    log::warn!("failed to open browser: {err}");
                }
            }
        }

        let flow = AuthFlow::new(
            OAuth::new(
                self.config.credentials.client_id.clone(),
                self.config.redirect_uri.clone(),
            ),
            self.client,
            self.cache,
        );
        let router = Router::new(Arc::new(flow), self.fatal.clone());

        tokio::select! {
            result = server::serve(listener, router) => result,
            Some(err) = self.errors.recv() => Err(err),
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                Ok(())
            }
        }
    }
}

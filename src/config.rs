use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};
use crate::spotify::{Credentials, PlaybackRequest, PlaylistUri};
use crate::CONFIG_PATH;

/// Start a Spotify playlist on a Spotify Connect device.
///
/// Spotify app credentials are read from `AUTOPLAY_CLIENT_ID` and `AUTOPLAY_CLIENT_SECRET`,
/// either from the environment or a `.env` file.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Spotify Connect device id to play on
    #[arg(long, env = "AUTOPLAY_DEVICE_ID")]
    pub device_id: String,

    /// Playlist to play, `spotify:playlist:<id>` or an open.spotify.com link
    #[arg(long, env = "AUTOPLAY_PLAYLIST_URI")]
    pub playlist_uri: PlaylistUri,

    /// Redirect uri registered with the Spotify app
    #[arg(
        long,
        env = "AUTOPLAY_REDIRECT_URI",
        default_value = "http://localhost:3000/callback"
    )]
    pub redirect_uri: String,

    /// Address the login page listens on
    #[arg(long, env = "AUTOPLAY_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Where the Spotify token is stored
    #[arg(long, env = "AUTOPLAY_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Open the login page in the browser when no token is stored
    #[arg(long)]
    pub open: bool,

    /// More logging, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Less logging
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,
}

impl Args {
    pub fn verbosity(&self) -> i8 {
        self.verbose.min(3) as i8 - self.quiet.min(3) as i8
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub request: PlaybackRequest,
    pub redirect_uri: String,
    pub listen: SocketAddr,
    pub token_file: PathBuf,
    pub open_browser: bool,
}

impl Config {
    /// Combine parsed arguments with the credentials from the environment
    pub fn new(args: Args, credentials: Credentials) -> Result<Self> {
        match args.redirect_uri.parse::<hyper::Uri>() {
            Ok(uri) if uri.scheme().is_some() && uri.host().is_some() => {}
            _ => {
                return Err(Error::Config(format!(
                    "redirect uri {:?} is not an absolute url",
                    args.redirect_uri
                )))
            }
        }

        Ok(Self {
            request: PlaybackRequest::new(args.device_id, args.playlist_uri)?,
            credentials,
            redirect_uri: args.redirect_uri,
            listen: args.listen,
            token_file: args
                .token_file
                .unwrap_or_else(|| CONFIG_PATH.join("token.json")),
            open_browser: args.open,
        })
    }

    /// Local page a user visits to log in
    pub fn login_url(&self) -> String {
        let port = self.listen.port();
        match self.listen.ip() {
            ip if ip.is_unspecified() || ip.is_loopback() => {
                format!("http://localhost:{port}/login")
            }
            ip => format!("http://{}/login", SocketAddr::new(ip, port)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> std::result::Result<Args, clap::Error> {
        let base = [
            "autoplay",
            "--device-id",
            "74ASZWbe4lXaubB36ztrGX",
            "--playlist-uri",
            "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M",
        ];
        Args::try_parse_from(base.iter().chain(extra))
    }

    #[test]
    fn defaults() {
        let config = Config::new(args(&[]).unwrap(), Credentials::new("id", "secret")).unwrap();
        assert_eq!(config.redirect_uri, "http://localhost:3000/callback");
        assert_eq!(config.listen, "0.0.0.0:3000".parse().unwrap());
        assert!(config.token_file.ends_with("token.json"));
        assert_eq!(config.login_url(), "http://localhost:3000/login");
        assert!(!config.open_browser);
    }

    #[test]
    fn overrides() {
        let config = Config::new(
            args(&[
                "--listen",
                "192.168.1.20:8080",
                "--token-file",
                "/var/lib/autoplay/token.json",
                "--open",
                "-vv",
            ])
            .unwrap(),
            Credentials::new("id", "secret"),
        )
        .unwrap();
        assert_eq!(config.login_url(), "http://192.168.1.20:8080/login");
        assert_eq!(config.token_file, PathBuf::from("/var/lib/autoplay/token.json"));
        assert!(config.open_browser);
    }

    #[test]
    fn rejects_relative_redirect() {
        let parsed = args(&["--redirect-uri", "/callback"]).unwrap();
        assert!(matches!(
            Config::new(parsed, Credentials::new("id", "secret")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn verbosity() {
        assert_eq!(args(&["-vv"]).unwrap().verbosity(), 2);
        assert_eq!(args(&["-q"]).unwrap().verbosity(), -1);
        assert!(args(&["-v", "-q"]).is_err());
    }

    #[test]
    fn rejects_bad_playlist() {
        let err = Args::try_parse_from([
            "autoplay",
            "--device-id",
            "abc",
            "--playlist-uri",
            "spotify:album:1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_blank_device() {
        let parsed = Args::try_parse_from([
            "autoplay",
            "--device-id",
            " ",
            "--playlist-uri",
            "spotify:playlist:37i9dQZF1DXcBWIGoYBM5M",
        ])
        .unwrap();
        assert!(matches!(
            Config::new(parsed, Credentials::new("id", "secret")),
            Err(Error::Config(_))
        ));
    }
}

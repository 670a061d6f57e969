pub use api::SpotifyClient;
pub use auth::{AuthFlow, OAuth, Router};
pub use cache::TokenCache;
pub use credentials::Credentials;
pub use playback::{Activator, Confirmed, PlaybackRequest, PlaylistUri};
pub use token::Token;

pub mod api;
pub mod auth;
pub mod cache;
mod credentials;
pub mod playback;
mod token;

use clap::Parser;
use color_eyre::Result;

use autoplay::app::App;
use autoplay::config::{Args, Config};
use autoplay::logging;
use autoplay::spotify::Credentials;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // `.env` has to be loaded before clap reads its env fallbacks
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    logging::init(args.verbosity());
    if let Ok(path) = dotenv {
        log::debug!("loaded environment from {}", path.display());
    }

    let config = Config::new(args, Credentials::from_env()?)?;
    App::new(config).run().await?;
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

mod artwork;
mod clock;
mod config;
mod logging;
mod plex;
mod presence;
mod sync;
mod tracker;

use artwork::{ArtworkCache, ArtworkResolver, HttpThumbnails, Imgur};
use clock::SystemClock;
use config::Config;
use plex::PlexAccount;
use presence::DiscordConnector;
use sync::SyncLoop;
use tracker::SessionTracker;

/// Mirror Plex music playback into Discord Rich Presence
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML, or JSON when it ends in .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File holding the Plex token between runs
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Root of the album artwork cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init();

    let args = Args::parse();

    if let Err(e) = install_interrupt_handler() {
        log::warn!("{:#}", e);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C is the normal way to stop, so it exits with success
fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        log::info!("Interrupted, shutting down");
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")
}

/// Returns only on a fatal error
fn run(args: Args) -> Result<()> {
    log::info!("plex-presence {}", env!("CARGO_PKG_VERSION"));

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;
    log::info!("Loaded configuration from {}", config_path.display());

    logging::apply_severity(&config.logging.severity);

    let token_file = match args.token_file {
        Some(path) => path,
        None => config::config_dir()?.join("auth.txt"),
    };
    let cache_dir = match args.cache_dir {
        Some(path) => path,
        None => config::cache_dir()?,
    };
    log::debug!("Caching album artwork in {}", cache_dir.display());

    let account = PlexAccount::login(&config.plex, &token_file)?;
    let tracker = SessionTracker::new(account, config.plex.servers.clone(), config.plex.users.clone());

    let artwork = ArtworkResolver::new(
        ArtworkCache::new(cache_dir),
        HttpThumbnails,
        Imgur::new(config.imgur.client_id.clone()),
    );

    let mut sync = SyncLoop::new(
        tracker,
        artwork,
        DiscordConnector::new(config.discord.app_id.clone()),
        SystemClock,
        Duration::from_secs(config.plex.refresh_rate),
    );

    sync.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_handler_installs() {
        install_interrupt_handler().unwrap();
    }

    #[test]
    fn cli_paths_are_optional() {
        let args = Args::try_parse_from(["plex-presence", "--cache-dir", "/tmp/art"]).unwrap();
        assert!(args.config.is_none());
        assert_eq!(args.cache_dir, Some(PathBuf::from("/tmp/art")));
    }
}

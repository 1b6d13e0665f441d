mod api;
mod app;
mod catalog;
mod config;
mod favorites;
mod logging;
mod models;
mod playback;
mod tasks;
mod tui;

use anyhow::Result;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = config::CliArgs::parse();
    let config = config::AppConfig::from_args(args)?;
    config.ensure_filesystem()?;
    logging::init(&config)?;

    info!(
        country = config.country(),
        limit = config.limit(),
        "starting chartdeck"
    );

    let (msg_tx, msg_rx) = tokio::sync::mpsc::unbounded_channel();

    let client = api::itunes::ItunesClient::new(&config)?;
    let favorites = favorites::FavoritesStore::open(&config)?;
    let artwork = tasks::artwork::spawn(&config, msg_tx.clone())?;
    let preview = tasks::preview::spawn(&config, msg_tx.clone())?;

    let controller = tui::AppController::new(client, artwork, preview, msg_tx);

    let app = tui::App::new(controller, favorites, msg_rx);
    tui::run(app).await
}

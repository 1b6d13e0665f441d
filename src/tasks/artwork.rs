use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, header};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::app::AppMessage;
use crate::config::AppConfig;
use crate::models::{Album, Track};

/// Something whose hi-res artwork can be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkJob {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub url: String,
}

impl ArtworkJob {
    pub fn for_track(track: &Track) -> Option<Self> {
        Some(Self {
            id: track.id.clone(),
            artist: track.artist.clone(),
            title: track.title.clone(),
            url: track.artwork_url.clone()?,
        })
    }

    pub fn for_album(album: &Album) -> Option<Self> {
        Some(Self {
            id: album.id.clone(),
            artist: album.artist.clone(),
            title: album.title.clone(),
            url: album.artwork_url.clone()?,
        })
    }

    pub fn filename(&self) -> String {
        sanitize_filename::sanitize(format!("{} - {}.jpg", self.artist, self.title))
    }
}

#[derive(Clone)]
pub struct ArtworkSaverHandle {
    tx: UnboundedSender<ArtworkJob>,
}

impl ArtworkSaverHandle {
    pub fn enqueue(&self, job: ArtworkJob) -> Result<()> {
        self.tx.send(job).context("failed to enqueue artwork job")
    }
}

pub fn spawn(
    config: &AppConfig,
    message_tx: UnboundedSender<AppMessage>,
) -> Result<ArtworkSaverHandle> {
    let (tx, rx) = mpsc::unbounded_channel();

    let client = build_client(config)?;
    let artwork_dir = PathBuf::from(config.artwork_dir());

    tokio::spawn(async move {
        run_saver(client, message_tx, artwork_dir, rx).await;
    });

    Ok(ArtworkSaverHandle { tx })
}

fn build_client(config: &AppConfig) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(config.user_agent())
            .context("invalid user agent header value for artwork client")?,
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("image/jpeg, image/png"),
    );

    Client::builder()
        .default_headers(headers)
        .timeout(config.request_timeout())
        .build()
        .context("unable to create HTTP client for artwork downloads")
}

async fn run_saver(
    client: Client,
    message_tx: UnboundedSender<AppMessage>,
    artwork_dir: PathBuf,
    mut rx: UnboundedReceiver<ArtworkJob>,
) {
    let mut throttle = interval(Duration::from_secs(1));
    throttle.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while let Some(job) = rx.recv().await {
        throttle.tick().await;

        match download_artwork(&client, &job, &artwork_dir).await {
            Ok(path) => {
                info!(id = %job.id, path = %path.display(), "artwork saved");
                let _ = message_tx.send(AppMessage::ActivityLog(format!(
                    "Saved artwork for {} to {}",
                    job.title,
                    path.display()
                )));
            }
            Err(err) => {
                warn!(id = %job.id, error = %err, "artwork download failed");
                let _ = message_tx.send(AppMessage::ActivityLog(format!(
                    "Artwork unavailable for {}: {err}",
                    job.title
                )));
            }
        }
    }
}

async fn download_artwork(client: &Client, job: &ArtworkJob, artwork_dir: &Path) -> Result<PathBuf> {
    let response = client
        .get(&job.url)
        .send()
        .await
        .context("failed to request artwork")?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!("artwork returned status {}", response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .context("failed to read artwork bytes")?;
    tokio::fs::create_dir_all(artwork_dir)
        .await
        .context("failed to ensure artwork directory exists")?;
    let path = artwork_dir.join(job.filename());
    tokio::fs::write(&path, &bytes)
        .await
        .context("failed to write artwork to disk")?;
    Ok(path)
}

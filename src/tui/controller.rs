use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;

use crate::api::itunes::{FetchOptions, ItunesClient};
use crate::app::AppMessage;
use crate::tasks::artwork::{ArtworkJob, ArtworkSaverHandle};
use crate::tasks::preview::{PreviewCommand, PreviewJob, PreviewPlayerHandle};

/// Issues the background work for the UI and reports back through messages.
///
/// Nothing here checks collection phases; the caller gates on them first.
#[derive(Clone)]
pub struct AppController {
    client: ItunesClient,
    artwork: ArtworkSaverHandle,
    preview: PreviewPlayerHandle,
    options: FetchOptions,
    message_tx: UnboundedSender<AppMessage>,
}

impl AppController {
    pub fn new(
        client: ItunesClient,
        artwork: ArtworkSaverHandle,
        preview: PreviewPlayerHandle,
        message_tx: UnboundedSender<AppMessage>,
    ) -> Self {
        Self {
            client,
            artwork,
            preview,
            options: FetchOptions::default(),
            message_tx,
        }
    }

    pub fn fetch_top_tracks(&self) {
        let client = self.client.clone();
        let options = self.options.clone();
        let tx = self.message_tx.clone();
        task::spawn(async move {
            let message = match client.fetch_top_tracks(&options).await {
                Ok(tracks) => AppMessage::TopTracksLoaded(tracks),
                Err(err) => AppMessage::TopTracksFailed(format!("Top songs failed: {err}")),
            };
            let _ = tx.send(message);
        });
    }

    pub fn fetch_top_albums(&self) {
        let client = self.client.clone();
        let options = self.options.clone();
        let tx = self.message_tx.clone();
        task::spawn(async move {
            let message = match client.fetch_top_albums(&options).await {
                Ok(albums) => AppMessage::TopAlbumsLoaded(albums),
                Err(err) => AppMessage::TopAlbumsFailed(format!("Top albums failed: {err}")),
            };
            let _ = tx.send(message);
        });
    }

    pub fn fetch_album_tracks(&self, album_id: String) {
        let client = self.client.clone();
        let options = self.options.clone();
        let tx = self.message_tx.clone();
        task::spawn(async move {
            let message = match client.fetch_album_tracks(&album_id, &options).await {
                Ok(tracks) => AppMessage::AlbumTracksLoaded { album_id, tracks },
                Err(err) => AppMessage::AlbumTracksFailed {
                    album_id,
                    error: format!("Failed to load tracks: {err}"),
                },
            };
            let _ = tx.send(message);
        });
    }

    pub fn save_artwork(&self, job: ArtworkJob) -> Result<()> {
        let title = job.title.clone();
        self.artwork.enqueue(job)?;
        let _ = self
            .message_tx
            .send(AppMessage::ActivityLog(format!("Queued artwork for {title}")));
        Ok(())
    }

    pub fn play_preview(&self, job: PreviewJob) -> Result<()> {
        self.preview.send(PreviewCommand::Play(job))
    }

    pub fn toggle_preview(&self) -> Result<()> {
        self.preview.send(PreviewCommand::TogglePause)
    }

    pub fn seek_preview(&self, secs: i64) -> Result<()> {
        self.preview.send(PreviewCommand::Seek(secs))
    }

    pub fn stop_preview(&self) -> Result<()> {
        self.preview.send(PreviewCommand::Stop)
    }
}

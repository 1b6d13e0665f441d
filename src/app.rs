use std::time::Duration;

use crate::models::{Album, Track};

#[derive(Debug, Clone)]
pub enum AppMessage {
    TopTracksLoaded(Vec<Track>),
    TopTracksFailed(String),
    TopAlbumsLoaded(Vec<Album>),
    TopAlbumsFailed(String),
    AlbumTracksLoaded { album_id: String, tracks: Vec<Track> },
    AlbumTracksFailed { album_id: String, error: String },
    PreviewStarted { id: String, duration: Duration },
    PreviewProgress { id: String, elapsed: Duration, paused: bool },
    PreviewFinished { id: String },
    PreviewFailed { id: String, error: String },
    ActivityLog(String),
}

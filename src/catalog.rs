//! In-memory results of the feed fetches, one slot per collection.

use std::collections::HashMap;

use crate::models::{Album, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Collection<T> {
    phase: Phase,
    items: Vec<T>,
    error: Option<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            items: Vec::new(),
            error: None,
        }
    }
}

impl<T> Collection<T> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Only an idle slot may start a fetch; a failed one has to be reset first.
    pub fn should_fetch(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn begin(&mut self) {
        self.phase = Phase::Loading;
        self.error = None;
    }

    /// Replaces the items wholesale; the last completed fetch wins.
    pub fn succeed(&mut self, items: Vec<T>) {
        self.phase = Phase::Succeeded;
        self.items = items;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.phase = Phase::Failed;
        self.error = Some(if message.trim().is_empty() {
            String::from("Fetch failed")
        } else {
            message
        });
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    pub top_tracks: Collection<Track>,
    pub top_albums: Collection<Album>,
    album_tracks: HashMap<String, Collection<Track>>,
}

impl Catalog {
    pub fn album_tracks(&self, album_id: &str) -> Option<&Collection<Track>> {
        self.album_tracks.get(album_id)
    }

    /// Creates an idle slot for the album on first use.
    pub fn album_tracks_mut(&mut self, album_id: &str) -> &mut Collection<Track> {
        self.album_tracks.entry(album_id.to_string()).or_default()
    }

    pub fn find_track(&self, id: &str) -> Option<&Track> {
        self.top_tracks
            .items()
            .iter()
            .chain(
                self.album_tracks
                    .values()
                    .flat_map(|collection| collection.items().iter()),
            )
            .find(|track| track.id == id)
    }

    pub fn find_album(&self, id: &str) -> Option<&Album> {
        self.top_albums.items().iter().find(|album| album.id == id)
    }
}

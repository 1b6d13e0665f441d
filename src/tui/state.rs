use std::collections::VecDeque;

use anyhow::Result;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app::AppMessage;
use crate::catalog::{Catalog, Phase};
use crate::favorites::FavoritesStore;
use crate::models::{Album, Track};
use crate::playback::{PreviewPlayback, PreviewStatus};
use crate::tasks::artwork::ArtworkJob;
use crate::tasks::preview::PreviewJob;

use super::controller::AppController;

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Songs,
    Albums,
    Favorites,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Songs, Screen::Albums, Screen::Favorites];

    pub fn next(self) -> Self {
        match self {
            Screen::Songs => Screen::Albums,
            Screen::Albums => Screen::Favorites,
            Screen::Favorites => Screen::Songs,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Screen::Songs => Screen::Favorites,
            Screen::Albums => Screen::Songs,
            Screen::Favorites => Screen::Albums,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::Songs => "Top Songs",
            Screen::Albums => "Top Albums",
            Screen::Favorites => "Favorites",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Screen::Songs => 0,
            Screen::Albums => 1,
            Screen::Favorites => 2,
        }
    }
}

/// A row of the favorites screen. Ids that are not in any loaded collection
/// stay unresolved.
#[derive(Debug, Clone, Copy)]
pub enum FavoriteEntry<'a> {
    Track { id: &'a str, track: Option<&'a Track> },
    Album { id: &'a str, album: Option<&'a Album> },
}

pub struct App {
    pub controller: AppController,
    pub msg_rx: UnboundedReceiver<AppMessage>,
    pub catalog: Catalog,
    pub favorites: FavoritesStore,
    pub screen: Screen,
    pub track_state: ListState,
    pub album_state: ListState,
    pub favorite_state: ListState,
    pub preview: PreviewPlayback,
    pub logs: VecDeque<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        controller: AppController,
        favorites: FavoritesStore,
        msg_rx: UnboundedReceiver<AppMessage>,
    ) -> Self {
        Self {
            controller,
            msg_rx,
            catalog: Catalog::default(),
            favorites,
            screen: Screen::Songs,
            track_state: ListState::default(),
            album_state: ListState::default(),
            favorite_state: ListState::default(),
            preview: PreviewPlayback::default(),
            logs: VecDeque::with_capacity(LOG_CAPACITY),
            should_quit: false,
        }
    }

    /// The songs and albums charts are requested independently and race.
    pub fn bootstrap(&mut self) {
        self.request_top_tracks();
        self.request_top_albums();
    }

    pub fn request_top_tracks(&mut self) {
        if self.catalog.top_tracks.should_fetch() {
            self.catalog.top_tracks.begin();
            self.controller.fetch_top_tracks();
        }
    }

    pub fn request_top_albums(&mut self) {
        if self.catalog.top_albums.should_fetch() {
            self.catalog.top_albums.begin();
            self.controller.fetch_top_albums();
        }
    }

    pub fn request_album_tracks(&mut self, album_id: &str) {
        let slot = self.catalog.album_tracks_mut(album_id);
        if slot.should_fetch() {
            slot.begin();
            self.controller.fetch_album_tracks(album_id.to_string());
        }
    }

    /// Returns the current screen's collections to idle and fetches again.
    ///
    /// On the albums screen a failed track listing for the selected album is
    /// retried on its own and the loaded chart is kept.
    pub fn retry_current(&mut self) {
        match self.screen {
            Screen::Songs => {
                self.catalog.top_tracks.reset();
                self.request_top_tracks();
            }
            Screen::Albums => {
                let failed_album = self.selected_album().map(|album| album.id).filter(|id| {
                    self.catalog
                        .album_tracks(id)
                        .is_some_and(|slot| slot.phase() == Phase::Failed)
                });
                match failed_album {
                    Some(album_id) => {
                        self.catalog.album_tracks_mut(&album_id).reset();
                        self.request_album_tracks(&album_id);
                        self.push_log(format!("Reloading tracks for album {album_id}"));
                        return;
                    }
                    None => {
                        self.catalog.top_albums.reset();
                        self.request_top_albums();
                    }
                }
            }
            Screen::Favorites => {
                self.catalog.top_tracks.reset();
                self.catalog.top_albums.reset();
                self.request_top_tracks();
                self.request_top_albums();
            }
        }
        self.push_log(format!("Reloading {}", self.screen.title()));
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        match message {
            AppMessage::TopTracksLoaded(tracks) => {
                self.push_log(format!("Loaded {} top songs", tracks.len()));
                self.catalog.top_tracks.succeed(tracks);
                clamp_selection(&mut self.track_state, self.catalog.top_tracks.items().len());
            }
            AppMessage::TopTracksFailed(error) => {
                self.push_log(error.clone());
                self.catalog.top_tracks.fail(error);
            }
            AppMessage::TopAlbumsLoaded(albums) => {
                self.push_log(format!("Loaded {} top albums", albums.len()));
                self.catalog.top_albums.succeed(albums);
                clamp_selection(&mut self.album_state, self.catalog.top_albums.items().len());
            }
            AppMessage::TopAlbumsFailed(error) => {
                self.push_log(error.clone());
                self.catalog.top_albums.fail(error);
            }
            AppMessage::AlbumTracksLoaded { album_id, tracks } => {
                self.push_log(format!("Loaded {} tracks for album {album_id}", tracks.len()));
                self.catalog.album_tracks_mut(&album_id).succeed(tracks);
            }
            AppMessage::AlbumTracksFailed { album_id, error } => {
                self.push_log(error.clone());
                self.catalog.album_tracks_mut(&album_id).fail(error);
            }
            AppMessage::PreviewStarted { id, duration } => {
                if self.preview.is_current(&id) {
                    self.push_log(format!("Playing preview of {}", self.preview.title()));
                }
                self.preview.started(&id, duration);
            }
            AppMessage::PreviewProgress { id, elapsed, paused } => {
                self.preview.progress(&id, elapsed, paused);
            }
            AppMessage::PreviewFinished { id } => {
                self.preview.finished(&id);
            }
            AppMessage::PreviewFailed { id, error } => {
                self.push_log(error.clone());
                self.preview.fail(&id, error);
            }
            AppMessage::ActivityLog(entry) => {
                self.push_log(entry);
            }
        }
        let favorites_len = self.favorite_entries().len();
        clamp_selection(&mut self.favorite_state, favorites_len);
    }

    pub fn next_screen(&mut self) {
        self.switch_to(self.screen.next());
    }

    pub fn previous_screen(&mut self) {
        self.switch_to(self.screen.previous());
    }

    fn switch_to(&mut self, screen: Screen) {
        self.screen = screen;
        if screen == Screen::Favorites {
            if !self.favorites.track_ids().is_empty() {
                self.request_top_tracks();
            }
            if !self.favorites.album_ids().is_empty() {
                self.request_top_albums();
            }
            let len = self.favorite_entries().len();
            clamp_selection(&mut self.favorite_state, len);
        }
    }

    pub fn push_log<S: Into<String>>(&mut self, message: S) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(message.into());
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.track_state
            .selected()
            .and_then(|idx| self.catalog.top_tracks.items().get(idx))
    }

    pub fn selected_album(&self) -> Option<Album> {
        self.album_state
            .selected()
            .and_then(|idx| self.catalog.top_albums.items().get(idx).cloned())
    }

    pub fn favorite_entries(&self) -> Vec<FavoriteEntry<'_>> {
        let tracks = self.favorites.track_ids().iter().map(|id| FavoriteEntry::Track {
            id: id.as_str(),
            track: self.catalog.find_track(id),
        });
        let albums = self.favorites.album_ids().iter().map(|id| FavoriteEntry::Album {
            id: id.as_str(),
            album: self.catalog.find_album(id),
        });
        tracks.chain(albums).collect()
    }

    pub fn selected_favorite(&self) -> Option<FavoriteEntry<'_>> {
        let idx = self.favorite_state.selected()?;
        self.favorite_entries().get(idx).copied()
    }

    pub fn open_selected_album(&mut self) {
        if let Some(album) = self.selected_album() {
            self.request_album_tracks(&album.id);
        }
    }

    pub fn toggle_selected_favorite(&mut self) {
        let outcome = match self.screen {
            Screen::Songs => self
                .selected_track()
                .map(|track| (track.id.clone(), track.title.clone(), true)),
            Screen::Albums => self
                .selected_album()
                .map(|album| (album.id, album.title, false)),
            Screen::Favorites => self.selected_favorite().map(|entry| match entry {
                FavoriteEntry::Track { id, track } => (
                    id.to_string(),
                    track.map_or_else(|| id.to_string(), |track| track.title.clone()),
                    true,
                ),
                FavoriteEntry::Album { id, album } => (
                    id.to_string(),
                    album.map_or_else(|| id.to_string(), |album| album.title.clone()),
                    false,
                ),
            }),
        };

        let Some((id, title, is_track)) = outcome else {
            self.push_log("Nothing selected");
            return;
        };

        let now_favorite = if is_track {
            self.favorites.toggle_track_favorite(&id)
        } else {
            self.favorites.toggle_album_favorite(&id)
        };
        self.push_log(if now_favorite {
            format!("Added {title} to favorites")
        } else {
            format!("Removed {title} from favorites")
        });

        let len = self.favorite_entries().len();
        clamp_selection(&mut self.favorite_state, len);
    }

    pub fn save_selected_artwork(&mut self) -> Result<()> {
        let job = match self.screen {
            Screen::Songs => self.selected_track().and_then(ArtworkJob::for_track),
            Screen::Albums => self.selected_album().as_ref().and_then(ArtworkJob::for_album),
            Screen::Favorites => self.selected_favorite().and_then(|entry| match entry {
                FavoriteEntry::Track { track, .. } => track.and_then(ArtworkJob::for_track),
                FavoriteEntry::Album { album, .. } => album.and_then(ArtworkJob::for_album),
            }),
        };

        match job {
            Some(job) => self.controller.save_artwork(job)?,
            None => self.push_log("No artwork available for the selection"),
        }
        Ok(())
    }

    /// The track whose preview the play key acts on.
    pub fn selected_preview_track(&self) -> Option<&Track> {
        match self.screen {
            Screen::Songs => self.selected_track(),
            Screen::Favorites => match self.selected_favorite()? {
                FavoriteEntry::Track { track, .. } => track,
                FavoriteEntry::Album { .. } => None,
            },
            Screen::Albums => None,
        }
    }

    /// Pauses or resumes the selected track's preview, or starts it when a
    /// different clip (or none) is loaded.
    pub fn toggle_selected_preview(&mut self) -> Result<()> {
        let Some((id, title, job)) = self
            .selected_preview_track()
            .map(|track| (track.id.clone(), track.title.clone(), PreviewJob::for_track(track)))
        else {
            self.push_log("Select a song to preview");
            return Ok(());
        };

        if self.preview.is_current(&id) {
            if self.preview.is_active() {
                self.preview.toggle_pause();
                return self.controller.toggle_preview();
            }
            if self.preview.status() == PreviewStatus::Loading {
                return Ok(());
            }
        }

        let Some(job) = job else {
            self.push_log(format!("No preview available for {title}"));
            return Ok(());
        };
        self.preview.begin(&job.id, &job.title);
        self.push_log(format!("Loading preview for {title}"));
        self.controller.play_preview(job)
    }

    pub fn seek_preview(&mut self, secs: i64) -> Result<()> {
        if self.preview.is_active() {
            self.controller.seek_preview(secs)?;
        }
        Ok(())
    }

    pub fn stop_preview(&mut self) -> Result<()> {
        if self.preview.track_id().is_some() {
            self.preview.stop();
            self.controller.stop_preview()?;
        }
        Ok(())
    }

    pub fn move_selection(&mut self, delta: isize) {
        match self.screen {
            Screen::Songs => {
                let len = self.catalog.top_tracks.items().len();
                update_list_state(&mut self.track_state, len, delta);
            }
            Screen::Albums => {
                let len = self.catalog.top_albums.items().len();
                update_list_state(&mut self.album_state, len, delta);
            }
            Screen::Favorites => {
                let len = self.favorite_entries().len();
                update_list_state(&mut self.favorite_state, len, delta);
            }
        }
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let idx = state.selected().unwrap_or(0).min(len - 1);
        state.select(Some(idx));
    }
}

fn update_list_state(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }

    let current = state.selected().unwrap_or(0);
    let step = delta.unsigned_abs();
    let new_index = if delta < 0 {
        current.saturating_sub(step)
    } else {
        (current + step).min(len - 1)
    };
    state.select(Some(new_index));
}

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;

pub const TRACK_FAVORITES_KEY: &str = "fav_song_ids";
pub const ALBUM_FAVORITES_KEY: &str = "fav_album_ids";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("failed to encode favorites: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FavoriteKind {
    Track,
    Album,
}

impl FavoriteKind {
    fn key(self) -> &'static str {
        match self {
            FavoriteKind::Track => TRACK_FAVORITES_KEY,
            FavoriteKind::Album => ALBUM_FAVORITES_KEY,
        }
    }
}

/// Track and album favorites, mirrored to sled after every toggle.
///
/// The two id lists are independent; membership is plain string equality.
pub struct FavoritesStore {
    tree: sled::Tree,
    track_ids: Vec<String>,
    album_ids: Vec<String>,
}

impl FavoritesStore {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let db = sled::open(config.db_path()).with_context(|| {
            format!(
                "Failed to open favorites database at {}",
                config.db_path().display()
            )
        })?;
        let tree = db
            .open_tree("favorites")
            .context("Unable to open favorites tree")?;
        Ok(Self::from_tree(tree))
    }

    /// Loads both sets; anything unreadable counts as empty.
    pub fn from_tree(tree: sled::Tree) -> Self {
        let track_ids = load_ids(&tree, FavoriteKind::Track.key());
        let album_ids = load_ids(&tree, FavoriteKind::Album.key());
        debug!(
            tracks = track_ids.len(),
            albums = album_ids.len(),
            "favorites loaded"
        );
        Self {
            tree,
            track_ids,
            album_ids,
        }
    }

    pub fn track_ids(&self) -> &[String] {
        &self.track_ids
    }

    pub fn album_ids(&self) -> &[String] {
        &self.album_ids
    }

    pub fn is_track_favorite(&self, id: impl ToString) -> bool {
        self.track_ids.contains(&id.to_string())
    }

    pub fn is_album_favorite(&self, id: impl ToString) -> bool {
        self.album_ids.contains(&id.to_string())
    }

    /// Adds the id if absent, removes it if present. Returns the new membership.
    pub fn toggle_track_favorite(&mut self, id: impl ToString) -> bool {
        self.toggle(FavoriteKind::Track, id.to_string())
    }

    pub fn toggle_album_favorite(&mut self, id: impl ToString) -> bool {
        self.toggle(FavoriteKind::Album, id.to_string())
    }

    fn toggle(&mut self, kind: FavoriteKind, id: String) -> bool {
        let ids = match kind {
            FavoriteKind::Track => &mut self.track_ids,
            FavoriteKind::Album => &mut self.album_ids,
        };

        let now_favorite = if let Some(pos) = ids.iter().position(|existing| *existing == id) {
            ids.remove(pos);
            false
        } else {
            ids.push(id);
            true
        };

        // The in-memory set stays authoritative for this session if the write fails.
        if let Err(err) = persist(&self.tree, kind.key(), ids) {
            warn!(key = kind.key(), error = %err, "failed to persist favorites");
        }

        now_favorite
    }
}

fn persist(tree: &sled::Tree, key: &str, ids: &[String]) -> Result<(), StorageError> {
    let value = serde_json::to_vec(ids)?;
    tree.insert(key, value)?;
    tree.flush()?;
    Ok(())
}

fn load_ids(tree: &sled::Tree, key: &str) -> Vec<String> {
    let bytes = match tree.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(key, error = %err, "favorites unreadable, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<String>>(&bytes) {
        Ok(stored) => {
            let mut ids: Vec<String> = Vec::with_capacity(stored.len());
            for id in stored {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        }
        Err(err) => {
            warn!(key, error = %err, "favorites corrupt, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::config::CliArgs;

    fn temp_tree() -> sled::Tree {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("temporary sled db");
        db.open_tree("favorites").expect("favorites tree")
    }

    fn stored_ids(tree: &sled::Tree, key: &str) -> Vec<String> {
        let bytes = tree.get(key).expect("read").expect("value present");
        serde_json::from_slice(&bytes).expect("json array")
    }

    #[test]
    fn toggle_adds_then_removes() {
        let tree = temp_tree();
        let mut store = FavoritesStore::from_tree(tree.clone());

        assert!(store.toggle_track_favorite("909090"));
        assert!(store.is_track_favorite("909090"));
        assert_eq!(stored_ids(&tree, TRACK_FAVORITES_KEY), vec!["909090"]);

        assert!(!store.toggle_track_favorite("909090"));
        assert!(!store.is_track_favorite("909090"));
        assert!(stored_ids(&tree, TRACK_FAVORITES_KEY).is_empty());
    }

    #[test]
    fn even_number_of_toggles_is_a_no_op() {
        let mut store = FavoritesStore::from_tree(temp_tree());
        store.toggle_track_favorite("1");
        store.toggle_track_favorite("2");
        let before = store.track_ids().to_vec();

        for _ in 0..4 {
            store.toggle_track_favorite("3");
        }
        store.toggle_track_favorite("1");
        store.toggle_track_favorite("1");

        let before: HashSet<_> = before.into_iter().collect();
        let after: HashSet<_> = store.track_ids().iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn ids_are_coerced_to_strings() {
        let mut store = FavoritesStore::from_tree(temp_tree());
        store.toggle_album_favorite(1657869377_u64);
        assert!(store.is_album_favorite("1657869377"));
        assert!(store.is_album_favorite(1657869377_u64));
    }

    #[test]
    fn track_and_album_sets_are_independent() {
        let tree = temp_tree();
        let mut store = FavoritesStore::from_tree(tree.clone());
        store.toggle_track_favorite("42");

        assert!(store.is_track_favorite("42"));
        assert!(!store.is_album_favorite("42"));
        assert!(tree.get(ALBUM_FAVORITES_KEY).expect("read").is_none());

        store.toggle_album_favorite("42");
        store.toggle_track_favorite("42");
        assert!(!store.is_track_favorite("42"));
        assert!(store.is_album_favorite("42"));
    }

    #[test]
    fn reload_yields_the_same_sets() {
        let tree = temp_tree();
        let mut store = FavoritesStore::from_tree(tree.clone());
        for id in ["a", "b", "c"] {
            store.toggle_track_favorite(id);
        }
        store.toggle_album_favorite("x");
        store.toggle_track_favorite("b");

        let reloaded = FavoritesStore::from_tree(tree);
        let expected: HashSet<&str> = ["a", "c"].into_iter().collect();
        let actual: HashSet<&str> = reloaded.track_ids().iter().map(String::as_str).collect();
        assert_eq!(actual, expected);
        assert_eq!(reloaded.album_ids(), ["x"]);
    }

    #[test]
    fn corrupt_values_load_as_empty() {
        let tree = temp_tree();
        tree.insert(TRACK_FAVORITES_KEY, "not json").expect("insert");
        tree.insert(ALBUM_FAVORITES_KEY, &[0xff_u8, 0xfe][..]).expect("insert");

        let mut store = FavoritesStore::from_tree(tree.clone());
        assert!(store.track_ids().is_empty());
        assert!(store.album_ids().is_empty());

        assert!(store.toggle_track_favorite("1"));
        assert_eq!(stored_ids(&tree, TRACK_FAVORITES_KEY), vec!["1"]);
    }

    #[test]
    fn duplicate_stored_ids_collapse() {
        let tree = temp_tree();
        tree.insert(TRACK_FAVORITES_KEY, r#"["1","2","1"]"#).expect("insert");
        let mut store = FavoritesStore::from_tree(tree);
        assert_eq!(store.track_ids(), ["1", "2"]);

        assert!(!store.toggle_track_favorite("1"));
        assert!(!store.is_track_favorite("1"));
    }

    #[test]
    fn survives_reopening_the_database() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let config = AppConfig::from_args(CliArgs {
            data_dir: Some(tmp.path().to_path_buf()),
            ..CliArgs::default()
        })?;
        config.ensure_filesystem()?;

        {
            let mut store = FavoritesStore::open(&config)?;
            store.toggle_track_favorite("909090");
            store.toggle_album_favorite("77");
        }

        let store = FavoritesStore::open(&config)?;
        assert!(store.is_track_favorite("909090"));
        assert!(store.is_album_favorite("77"));
        Ok(())
    }
}

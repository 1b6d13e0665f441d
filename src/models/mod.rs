pub mod album;
pub mod track;

pub use album::Album;
pub use track::Track;

/// Output of the feed normalizer: every downstream component sees one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Track(Track),
    Album(Album),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Track(track) => &track.id,
            Record::Album(album) => &album.id,
        }
    }

    pub fn into_track(self) -> Option<Track> {
        match self {
            Record::Track(track) => Some(track),
            Record::Album(_) => None,
        }
    }

    pub fn into_album(self) -> Option<Album> {
        match self {
            Record::Album(album) => Some(album),
            Record::Track(_) => None,
        }
    }
}

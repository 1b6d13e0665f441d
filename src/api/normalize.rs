use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::api::feed::{ChartEntry, ChartFeed, Label, LookupEntry, LookupResponse, TextOrNumber};
use crate::models::{Album, Record, Track};

pub const DEFAULT_ARTWORK_SIZE: u32 = 1000;

/// Link relation that marks the audio preview among an entry's links.
const ENCLOSURE_REL: &str = "enclosure";

static ARTWORK_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\d+x\d+bb\.(?:png|jpg)").expect("artwork resolution pattern must compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("feed entry is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("feed entry is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Songs,
    Albums,
}

impl ChartKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            ChartKind::Songs => "topsongs",
            ChartKind::Albums => "topalbums",
        }
    }
}

/// One upstream record tagged with the feed it came from.
#[derive(Debug, Clone, Copy)]
pub enum RawRecord<'a> {
    Chart {
        kind: ChartKind,
        entry: &'a ChartEntry,
    },
    Lookup {
        entry: &'a LookupEntry,
        position: usize,
    },
}

/// Maps raw feed records onto [`Track`] and [`Album`]. Holds no state besides
/// the artwork resolution it upscales to.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    artwork_size: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_ARTWORK_SIZE)
    }
}

impl Normalizer {
    pub fn new(artwork_size: u32) -> Self {
        Self { artwork_size }
    }

    pub fn normalize(&self, raw: RawRecord<'_>) -> Result<Record, MappingError> {
        match raw {
            RawRecord::Chart { kind, entry } => self.normalize_chart_entry(kind, entry),
            RawRecord::Lookup { entry, position } => self
                .normalize_lookup_entry(entry, position)
                .map(Record::Track),
        }
    }

    pub fn normalize_chart_entry(
        &self,
        kind: ChartKind,
        entry: &ChartEntry,
    ) -> Result<Record, MappingError> {
        let id = required(
            entry
                .id
                .as_ref()
                .and_then(|id| id.attributes.as_ref())
                .and_then(|attrs| attrs.im_id.as_deref()),
            "id",
        )?;
        let title = required(
            label_of(entry.name.as_ref()).or_else(|| label_of(entry.title.as_ref())),
            "im:name",
        )?;
        let artist = required(
            entry.artist.as_ref().map(|artist| artist.label.as_str()),
            "im:artist",
        )?;

        let artwork_url = entry
            .images
            .last()
            .map(|image| image.label.as_str())
            .filter(|url| !url.is_empty())
            .map(|url| self.upscale_artwork(url));

        let category = entry.category.as_ref().and_then(|c| c.attributes.as_ref());
        let release_date = entry.release_date.as_ref();

        let record = match kind {
            ChartKind::Songs => {
                let price = entry.price.as_ref();
                let price_attrs = price.and_then(|price| price.attributes.as_ref());
                Record::Track(Track {
                    id,
                    title,
                    artist,
                    album: entry
                        .collection
                        .as_ref()
                        .and_then(|collection| label_of(collection.name.as_ref()))
                        .map(str::to_owned),
                    artwork_url,
                    preview_url: link_href(entry, |rel| rel == ENCLOSURE_REL),
                    page_url: link_href(entry, |rel| rel != ENCLOSURE_REL),
                    artist_url: entry
                        .artist
                        .as_ref()
                        .and_then(|artist| artist.attributes.as_ref())
                        .and_then(|attrs| non_empty(attrs.href.as_deref())),
                    price_label: price.and_then(|price| non_empty(Some(price.label.as_str()))),
                    price_amount: price_attrs
                        .and_then(|attrs| attrs.amount.clone())
                        .and_then(|amount| amount.into_string().trim().parse::<f64>().ok()),
                    currency: price_attrs.and_then(|attrs| non_empty(attrs.currency.as_deref())),
                    category_id: category.and_then(|c| non_empty(c.id.as_deref())),
                    category: category.and_then(|c| non_empty(c.label.as_deref())),
                    release_date: release_date.and_then(|date| non_empty(Some(date.label.as_str()))),
                    release_date_label: release_date
                        .and_then(|date| label_of(date.attributes.as_ref()))
                        .map(str::to_owned),
                    track_number: None,
                    disc_number: None,
                    duration_ms: None,
                })
            }
            ChartKind::Albums => Record::Album(Album {
                id,
                title,
                artist,
                artwork_url,
                page_url: link_href(entry, |rel| rel != ENCLOSURE_REL),
                release_date: release_date.and_then(|date| non_empty(Some(date.label.as_str()))),
                release_date_label: release_date
                    .and_then(|date| label_of(date.attributes.as_ref()))
                    .map(str::to_owned),
                category_id: category.and_then(|c| non_empty(c.id.as_deref())),
                category: category.and_then(|c| non_empty(c.label.as_deref())),
                item_count: entry
                    .item_count
                    .as_ref()
                    .and_then(|count| count.label.trim().parse::<u32>().ok()),
            }),
        };

        Ok(record)
    }

    /// `position` is the index within the lookup tail (summary already removed)
    /// and stands in for a missing track number.
    pub fn normalize_lookup_entry(
        &self,
        entry: &LookupEntry,
        position: usize,
    ) -> Result<Track, MappingError> {
        let id = required(
            entry
                .track_id
                .clone()
                .map(TextOrNumber::into_string)
                .as_deref(),
            "trackId",
        )?;
        let title = required(entry.track_name.as_deref(), "trackName")?;
        let artist = required(entry.artist_name.as_deref(), "artistName")?;

        Ok(Track {
            id,
            title,
            artist,
            album: non_empty(entry.collection_name.as_deref()),
            artwork_url: entry
                .artwork_url100
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| self.upscale_artwork(url)),
            preview_url: non_empty(entry.preview_url.as_deref()),
            page_url: non_empty(entry.track_view_url.as_deref()),
            category: non_empty(entry.primary_genre_name.as_deref()),
            release_date: non_empty(entry.release_date.as_deref()),
            track_number: entry
                .track_number
                .or_else(|| u32::try_from(position + 1).ok()),
            disc_number: entry.disc_number,
            duration_ms: entry.track_time_millis,
            ..Track::default()
        })
    }

    /// Maps every chart entry, dropping the ones that fail.
    pub fn normalize_chart_feed(&self, kind: ChartKind, feed: ChartFeed) -> Vec<Record> {
        feed.into_entries()
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| {
                let mapped = parse_entry::<ChartEntry>(value)
                    .and_then(|entry| self.normalize(RawRecord::Chart { kind, entry: &entry }));
                skip_failed(mapped, kind.path_segment(), position)
            })
            .collect()
    }

    /// Discards the leading collection summary and maps the remaining tracks.
    pub fn normalize_lookup_results(&self, response: LookupResponse) -> Vec<Track> {
        response
            .results
            .into_iter()
            .skip(1)
            .enumerate()
            .filter_map(|(position, value)| {
                let mapped = parse_entry::<LookupEntry>(value)
                    .and_then(|entry| self.normalize_lookup_entry(&entry, position));
                skip_failed(mapped, "lookup", position)
            })
            .collect()
    }

    /// Rewrites the `/<W>x<H>bb.<ext>` segment to the target size as a jpg.
    /// URLs without such a segment are returned unchanged.
    pub fn upscale_artwork(&self, url: &str) -> String {
        let size = self.artwork_size;
        ARTWORK_RESOLUTION
            .replace(url, format!("/{size}x{size}bb.jpg").as_str())
            .into_owned()
    }
}

fn parse_entry<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, MappingError> {
    serde_json::from_value(value).map_err(|err| MappingError::Malformed(err.to_string()))
}

fn skip_failed<T>(mapped: Result<T, MappingError>, source: &str, position: usize) -> Option<T> {
    match mapped {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(source, position, error = %err, "skipping feed entry");
            None
        }
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, MappingError> {
    non_empty(value).ok_or(MappingError::MissingField(field))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn label_of(label: Option<&Label>) -> Option<&str> {
    label
        .map(|label| label.label.as_str())
        .filter(|value| !value.trim().is_empty())
}

fn link_href(entry: &ChartEntry, matches_rel: impl Fn(&str) -> bool) -> Option<String> {
    entry
        .link
        .as_ref()?
        .as_slice()
        .iter()
        .find(|link| matches_rel(&link.attributes.rel))
        .and_then(|link| non_empty(Some(link.attributes.href.as_str())))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn song_entry() -> Value {
        json!({
            "im:name": { "label": "Golden Hour" },
            "title": { "label": "Golden Hour - JVKE" },
            "im:artist": {
                "label": "JVKE",
                "attributes": { "href": "https://music.apple.com/th/artist/jvke/1" }
            },
            "im:collection": { "im:name": { "label": "this is what ____ feels like" } },
            "im:image": [
                { "label": "https://is1.mzstatic.com/image/thumb/a/55x55bb.png", "attributes": { "height": "55" } },
                { "label": "https://is1.mzstatic.com/image/thumb/a/60x60bb.png", "attributes": { "height": "60" } },
                { "label": "https://is1.mzstatic.com/image/thumb/a/170x170bb.png", "attributes": { "height": "170" } }
            ],
            "im:price": { "label": "฿29.00", "attributes": { "amount": "29.00", "currency": "THB" } },
            "link": [
                { "attributes": { "rel": "alternate", "type": "text/html", "href": "https://music.apple.com/th/album/x?i=909090" } },
                { "attributes": { "rel": "enclosure", "type": "audio/x-m4a", "href": "https://audio.example/preview.m4a" } }
            ],
            "id": { "label": "https://music.apple.com/th/album/x?i=909090", "attributes": { "im:id": "909090" } },
            "category": { "attributes": { "im:id": "14", "term": "Pop", "label": "Pop" } },
            "im:releaseDate": { "label": "2022-09-02T00:00:00-07:00", "attributes": { "label": "September 2, 2022" } }
        })
    }

    fn album_entry() -> Value {
        json!({
            "im:name": { "label": "SOS" },
            "title": { "label": "SOS - SZA" },
            "im:artist": { "label": "SZA" },
            "im:image": [
                { "label": "https://is1.mzstatic.com/image/thumb/b/55x55bb.jpg" },
                { "label": "https://is1.mzstatic.com/image/thumb/b/170x170bb.jpg" }
            ],
            "im:itemCount": { "label": "23" },
            "link": { "attributes": { "rel": "alternate", "href": "https://music.apple.com/th/album/sos/1" } },
            "id": { "attributes": { "im:id": "1657869377" } },
            "category": { "attributes": { "im:id": "15", "label": "R&B/Soul" } },
            "im:releaseDate": { "label": "2022-12-09T00:00:00-07:00", "attributes": { "label": "December 9, 2022" } }
        })
    }

    fn chart_entry(value: Value) -> ChartEntry {
        serde_json::from_value(value).expect("fixture deserializes")
    }

    #[test]
    fn chart_song_maps_every_field() -> anyhow::Result<()> {
        let entry = chart_entry(song_entry());
        let track = Normalizer::default()
            .normalize_chart_entry(ChartKind::Songs, &entry)?
            .into_track()
            .expect("songs chart yields tracks");

        assert_eq!(track.id, "909090");
        assert_eq!(track.title, "Golden Hour");
        assert_eq!(track.artist, "JVKE");
        assert_eq!(track.album.as_deref(), Some("this is what ____ feels like"));
        assert_eq!(
            track.artwork_url.as_deref(),
            Some("https://is1.mzstatic.com/image/thumb/a/1000x1000bb.jpg")
        );
        assert_eq!(track.preview_url.as_deref(), Some("https://audio.example/preview.m4a"));
        assert_eq!(
            track.page_url.as_deref(),
            Some("https://music.apple.com/th/album/x?i=909090")
        );
        assert_eq!(
            track.artist_url.as_deref(),
            Some("https://music.apple.com/th/artist/jvke/1")
        );
        assert_eq!(track.price_amount, Some(29.0));
        assert_eq!(track.currency.as_deref(), Some("THB"));
        assert_eq!(track.category_id.as_deref(), Some("14"));
        assert_eq!(track.category.as_deref(), Some("Pop"));
        assert_eq!(track.release_date_label.as_deref(), Some("September 2, 2022"));
        Ok(())
    }

    #[test]
    fn chart_album_with_single_link_object() -> anyhow::Result<()> {
        let entry = chart_entry(album_entry());
        let album = Normalizer::default()
            .normalize(RawRecord::Chart {
                kind: ChartKind::Albums,
                entry: &entry,
            })?
            .into_album()
            .expect("albums chart yields albums");

        assert_eq!(album.id, "1657869377");
        assert_eq!(album.title, "SOS");
        assert_eq!(album.item_count, Some(23));
        assert_eq!(
            album.page_url.as_deref(),
            Some("https://music.apple.com/th/album/sos/1")
        );
        assert_eq!(
            album.artwork_url.as_deref(),
            Some("https://is1.mzstatic.com/image/thumb/b/1000x1000bb.jpg")
        );
        assert_eq!(album.category.as_deref(), Some("R&B/Soul"));
        Ok(())
    }

    #[test]
    fn single_enclosure_link_is_preview_not_page() -> anyhow::Result<()> {
        let mut value = song_entry();
        value["link"] = json!({ "attributes": { "rel": "enclosure", "href": "https://audio.example/a.m4a" } });
        let track = Normalizer::default()
            .normalize_chart_entry(ChartKind::Songs, &chart_entry(value))?
            .into_track()
            .expect("track");
        assert_eq!(track.preview_url.as_deref(), Some("https://audio.example/a.m4a"));
        assert_eq!(track.page_url, None);
        Ok(())
    }

    #[test]
    fn title_falls_back_to_title_label() -> anyhow::Result<()> {
        let mut value = album_entry();
        value.as_object_mut().expect("object").remove("im:name");
        let record = Normalizer::default().normalize_chart_entry(ChartKind::Albums, &chart_entry(value))?;
        assert_eq!(record.into_album().expect("album").title, "SOS - SZA");
        Ok(())
    }

    #[test]
    fn missing_required_fields_are_mapping_errors() {
        let normalizer = Normalizer::default();

        let mut no_id = song_entry();
        no_id.as_object_mut().expect("object").remove("id");
        assert_eq!(
            normalizer.normalize_chart_entry(ChartKind::Songs, &chart_entry(no_id)),
            Err(MappingError::MissingField("id"))
        );

        let mut no_artist = song_entry();
        no_artist["im:artist"] = json!({ "label": "   " });
        assert_eq!(
            normalizer.normalize_chart_entry(ChartKind::Songs, &chart_entry(no_artist)),
            Err(MappingError::MissingField("im:artist"))
        );

        let mut no_name = song_entry();
        let object = no_name.as_object_mut().expect("object");
        object.remove("im:name");
        object.remove("title");
        assert_eq!(
            normalizer.normalize_chart_entry(ChartKind::Songs, &chart_entry(no_name)),
            Err(MappingError::MissingField("im:name"))
        );
    }

    #[test]
    fn missing_artwork_never_fails_the_record() -> anyhow::Result<()> {
        let mut value = song_entry();
        value.as_object_mut().expect("object").remove("im:image");
        let track = Normalizer::default()
            .normalize_chart_entry(ChartKind::Songs, &chart_entry(value))?
            .into_track()
            .expect("track");
        assert_eq!(track.artwork_url, None);
        Ok(())
    }

    #[test]
    fn null_artwork_never_fails_the_record() -> anyhow::Result<()> {
        let feed: ChartFeed = serde_json::from_value(json!({
            "feed": { "entry": [{
                "im:name": { "label": "Golden Hour" },
                "im:artist": { "label": "JVKE" },
                "id": { "label": "x", "attributes": { "im:id": "909090" } },
                "im:image": null,
                "im:price": { "label": "฿29.00", "attributes": { "amount": 29, "currency": "THB" } }
            }] }
        }))?;

        let records = Normalizer::default().normalize_chart_feed(ChartKind::Songs, feed);
        assert_eq!(records.len(), 1);
        let track = records[0].clone().into_track().expect("track");
        assert_eq!(track.id, "909090");
        assert_eq!(track.artwork_url, None);
        assert_eq!(track.price_amount, Some(29.0));
        Ok(())
    }

    #[test]
    fn upscale_artwork_rewrites_first_resolution_token() {
        let normalizer = Normalizer::new(600);
        assert_eq!(
            normalizer.upscale_artwork("https://x.example/img/100x100bb.png"),
            "https://x.example/img/600x600bb.jpg"
        );
        assert_eq!(
            normalizer.upscale_artwork("https://x.example/img/cover.webp"),
            "https://x.example/img/cover.webp"
        );
        assert_eq!(
            normalizer.upscale_artwork("https://x.example/img/100x100bb.webp"),
            "https://x.example/img/100x100bb.webp"
        );
    }

    #[test]
    fn chart_feed_skips_malformed_entries() -> anyhow::Result<()> {
        let mut broken = song_entry();
        broken.as_object_mut().expect("object").remove("id");
        let feed: ChartFeed = serde_json::from_value(json!({
            "feed": { "entry": [song_entry(), broken, "not an entry", { "im:image": 5 }] }
        }))?;

        let records = Normalizer::default().normalize_chart_feed(ChartKind::Songs, feed);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "909090");
        Ok(())
    }

    #[test]
    fn lookup_results_drop_the_collection_summary() -> anyhow::Result<()> {
        let response: LookupResponse = serde_json::from_value(json!({
            "resultCount": 4,
            "results": [
                { "wrapperType": "collection", "collectionId": 1657869377, "collectionName": "SOS", "artistName": "SZA" },
                { "wrapperType": "track", "trackId": 1657869393, "trackName": "SOS", "artistName": "SZA",
                  "collectionName": "SOS", "artworkUrl100": "https://is1.mzstatic.com/c/100x100bb.jpg",
                  "trackViewUrl": "https://music.apple.com/t/1", "previewUrl": "https://audio.example/1.m4a",
                  "primaryGenreName": "R&B/Soul", "releaseDate": "2022-12-09T12:00:00Z",
                  "trackNumber": 1, "discNumber": 1, "trackTimeMillis": 117776 },
                { "wrapperType": "track", "trackId": 1657869394, "trackName": "Kill Bill", "artistName": "SZA" },
                { "wrapperType": "track", "trackId": "1657869395", "trackName": "Seek & Destroy", "artistName": "SZA", "trackNumber": 3 }
            ]
        }))?;

        let tracks = Normalizer::default().normalize_lookup_results(response);
        assert_eq!(tracks.len(), 3);
        assert!(tracks.iter().all(|track| track.id != "1657869377"));

        let first = &tracks[0];
        assert_eq!(first.id, "1657869393");
        assert_eq!(first.track_number, Some(1));
        assert_eq!(first.duration_ms, Some(117_776));
        assert_eq!(
            first.artwork_url.as_deref(),
            Some("https://is1.mzstatic.com/c/1000x1000bb.jpg")
        );
        assert_eq!(first.category.as_deref(), Some("R&B/Soul"));
        assert_eq!(first.release_date_label, None);

        assert_eq!(tracks[1].track_number, Some(2));
        assert_eq!(tracks[2].id, "1657869395");
        Ok(())
    }

    #[test]
    fn lookup_entry_requires_track_id() {
        let entry: LookupEntry =
            serde_json::from_value(json!({ "trackName": "x", "artistName": "y" })).expect("entry");
        assert_eq!(
            Normalizer::default().normalize_lookup_entry(&entry, 0),
            Err(MappingError::MissingField("trackId"))
        );
    }
}

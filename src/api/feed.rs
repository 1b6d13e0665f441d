//! Wire shapes of the two upstream feeds.
//!
//! Everything here is deliberately loose: fields are optional and defaulted so
//! that a partially filled entry still deserializes, and the normalizer decides
//! which gaps are fatal for a record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// The chart feed encodes a single element as a bare object and several as an
/// array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartFeed {
    pub feed: ChartFeedBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartFeedBody {
    /// Kept as raw values so one malformed entry cannot fail the whole feed.
    pub entry: Option<OneOrMany<Value>>,
}

impl ChartFeed {
    pub fn into_entries(self) -> Vec<Value> {
        self.feed
            .entry
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
    }
}

/// Reads a field that may be `null` or of an unexpected shape, falling back to
/// its default instead of failing the surrounding entry.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Label {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartEntry {
    #[serde(rename = "im:name")]
    pub name: Option<Label>,
    pub title: Option<Label>,
    #[serde(rename = "im:artist")]
    pub artist: Option<ArtistLabel>,
    pub id: Option<EntryId>,
    #[serde(rename = "im:image", deserialize_with = "lenient")]
    pub images: Vec<Label>,
    #[serde(deserialize_with = "lenient")]
    pub link: Option<OneOrMany<LinkRecord>>,
    #[serde(rename = "im:collection", deserialize_with = "lenient")]
    pub collection: Option<CollectionRef>,
    #[serde(rename = "im:price", deserialize_with = "lenient")]
    pub price: Option<Price>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<Category>,
    #[serde(rename = "im:releaseDate", deserialize_with = "lenient")]
    pub release_date: Option<ReleaseDate>,
    #[serde(rename = "im:itemCount", deserialize_with = "lenient")]
    pub item_count: Option<Label>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtistLabel {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub attributes: Option<HrefAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HrefAttributes {
    #[serde(deserialize_with = "lenient")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryId {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    pub attributes: Option<EntryIdAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryIdAttributes {
    #[serde(rename = "im:id")]
    pub im_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkRecord {
    pub attributes: LinkAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkAttributes {
    #[serde(deserialize_with = "lenient")]
    pub rel: String,
    #[serde(deserialize_with = "lenient")]
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionRef {
    #[serde(rename = "im:name")]
    pub name: Option<Label>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Price {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub attributes: Option<PriceAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceAttributes {
    #[serde(deserialize_with = "lenient")]
    pub amount: Option<TextOrNumber>,
    #[serde(deserialize_with = "lenient")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(deserialize_with = "lenient")]
    pub attributes: Option<CategoryAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryAttributes {
    #[serde(rename = "im:id", deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseDate {
    #[serde(deserialize_with = "lenient")]
    pub label: String,
    #[serde(deserialize_with = "lenient")]
    pub attributes: Option<Label>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LookupResponse {
    /// First element is the collection summary, the rest are its tracks.
    #[serde(deserialize_with = "lenient")]
    pub results: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupEntry {
    pub track_id: Option<TextOrNumber>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub collection_name: Option<String>,
    pub artwork_url100: Option<String>,
    pub track_view_url: Option<String>,
    pub preview_url: Option<String>,
    pub primary_genre_name: Option<String>,
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub track_time_millis: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Number(Number),
}

impl TextOrNumber {
    pub fn into_string(self) -> String {
        match self {
            TextOrNumber::Text(value) => value,
            TextOrNumber::Number(value) => value.to_string(),
        }
    }
}

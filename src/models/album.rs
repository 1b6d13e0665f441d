#[derive(Debug, Clone, Default, PartialEq)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub page_url: Option<String>,
    pub release_date: Option<String>,
    pub release_date_label: Option<String>,
    pub category_id: Option<String>,
    pub category: Option<String>,
    pub item_count: Option<u32>,
}

impl Album {
    pub fn display_name(&self) -> String {
        format!("{} — {}", self.title, self.artist)
    }

    pub fn item_count_label(&self) -> String {
        match self.item_count {
            Some(1) => String::from("1 track"),
            Some(count) if count > 0 => format!("{count} tracks"),
            _ => String::from("Unknown track count"),
        }
    }
}

/// A song from the top songs chart or from an album track listing.
///
/// `id` is the only identity; every other field is best-effort and depends on
/// which feed produced the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub preview_url: Option<String>,
    pub page_url: Option<String>,
    pub artist_url: Option<String>,
    pub price_label: Option<String>,
    pub price_amount: Option<f64>,
    pub currency: Option<String>,
    pub category_id: Option<String>,
    pub category: Option<String>,
    pub release_date: Option<String>,
    pub release_date_label: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration_ms: Option<u64>,
}

impl Track {
    pub fn display_name(&self) -> String {
        format!("{} — {}", self.title, self.artist)
    }

    /// `m:ss`, or `-` when the duration is unknown.
    pub fn duration_label(&self) -> String {
        match self.duration_ms {
            Some(ms) if ms > 0 => {
                let total_secs = ms / 1000;
                format!("{}:{:02}", total_secs / 60, total_secs % 60)
            }
            _ => String::from("-"),
        }
    }

    pub fn price_display(&self) -> Option<String> {
        self.price_label.clone().or_else(|| {
            self.price_amount.map(|amount| match &self.currency {
                Some(currency) => format!("{amount:.2} {currency}"),
                None => format!("{amount:.2}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_label_formats_minutes_and_seconds() {
        let track = Track {
            duration_ms: Some(215_432),
            ..Track::default()
        };
        assert_eq!(track.duration_label(), "3:35");
    }

    #[test]
    fn duration_label_without_duration() {
        assert_eq!(Track::default().duration_label(), "-");
        let zero = Track {
            duration_ms: Some(0),
            ..Track::default()
        };
        assert_eq!(zero.duration_label(), "-");
    }

    #[test]
    fn price_display_prefers_feed_label() {
        let track = Track {
            price_label: Some("฿29.00".into()),
            price_amount: Some(29.0),
            currency: Some("THB".into()),
            ..Track::default()
        };
        assert_eq!(track.price_display().as_deref(), Some("฿29.00"));

        let unlabeled = Track {
            price_amount: Some(29.0),
            currency: Some("THB".into()),
            ..Track::default()
        };
        assert_eq!(unlabeled.price_display().as_deref(), Some("29.00 THB"));
    }
}

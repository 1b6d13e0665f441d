use std::time::Duration;

/// How far one seek key press moves the preview.
pub const SEEK_STEP_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewStatus {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
    Failed,
}

/// What the UI knows about the preview clip. The player task owns the audio;
/// this side only mirrors what it reports, so messages for any other track are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct PreviewPlayback {
    track_id: Option<String>,
    title: String,
    status: PreviewStatus,
    elapsed: Duration,
    duration: Duration,
    error: Option<String>,
}

impl PreviewPlayback {
    pub fn status(&self) -> PreviewStatus {
        self.status
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_current(&self, track_id: &str) -> bool {
        self.track_id.as_deref() == Some(track_id)
    }

    /// Playing or paused, i.e. the player holds decoded audio.
    pub fn is_active(&self) -> bool {
        matches!(self.status, PreviewStatus::Playing | PreviewStatus::Paused)
    }

    pub fn begin(&mut self, track_id: &str, title: &str) {
        *self = Self {
            track_id: Some(track_id.to_string()),
            title: title.to_string(),
            status: PreviewStatus::Loading,
            ..Self::default()
        };
    }

    pub fn started(&mut self, track_id: &str, duration: Duration) {
        if self.is_current(track_id) && self.status == PreviewStatus::Loading {
            self.status = PreviewStatus::Playing;
            self.elapsed = Duration::ZERO;
            self.duration = duration;
        }
    }

    pub fn progress(&mut self, track_id: &str, elapsed: Duration, paused: bool) {
        if self.is_current(track_id) && self.is_active() {
            self.elapsed = elapsed.min(self.duration);
            self.status = if paused {
                PreviewStatus::Paused
            } else {
                PreviewStatus::Playing
            };
        }
    }

    /// Flips between playing and paused. Returns false when nothing is loaded.
    pub fn toggle_pause(&mut self) -> bool {
        self.status = match self.status {
            PreviewStatus::Playing => PreviewStatus::Paused,
            PreviewStatus::Paused => PreviewStatus::Playing,
            _ => return false,
        };
        true
    }

    pub fn finished(&mut self, track_id: &str) {
        if self.is_current(track_id) {
            self.status = PreviewStatus::Stopped;
            self.elapsed = Duration::ZERO;
        }
    }

    pub fn fail(&mut self, track_id: &str, error: String) {
        if self.is_current(track_id) {
            self.status = PreviewStatus::Failed;
            self.error = Some(if error.is_empty() {
                String::from("Preview failed")
            } else {
                error
            });
        }
    }

    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// `▶ 0:12 / 0:30` style summary for the detail pane.
    pub fn label(&self) -> String {
        let icon = match self.status {
            PreviewStatus::Stopped => "■",
            PreviewStatus::Loading => "…",
            PreviewStatus::Playing => "▶",
            PreviewStatus::Paused => "⏸",
            PreviewStatus::Failed => "✗",
        };
        match self.status {
            PreviewStatus::Failed => {
                format!("{icon} {}", self.error.as_deref().unwrap_or("Preview failed"))
            }
            PreviewStatus::Loading => format!("{icon} loading preview"),
            _ => format!(
                "{icon} {} / {}",
                clock(self.elapsed),
                clock(self.duration)
            ),
        }
    }
}

fn clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

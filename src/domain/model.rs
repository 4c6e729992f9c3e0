use serde::Deserialize;
use url::Url;

/// Whether a scrape job stream is currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Streaming,
}

/// One status line pushed by the server.
///
/// `success` is absent (or `null`) for informational lines, `true` for the
/// final success line and `false` for a failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressMessage {
    pub message: String,
    #[serde(default)]
    pub success: Option<bool>,
}

impl ProgressMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Identifies one opened progress stream. Events from older streams are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

/// The download button: hidden until a job reports success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadAffordance {
    target: Option<Url>,
}

impl DownloadAffordance {
    pub fn is_visible(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&Url> {
        self.target.as_ref()
    }

    pub fn show(&mut self, target: Url) {
        self.target = Some(target);
    }

    pub fn hide(&mut self) {
        self.target = None;
    }
}

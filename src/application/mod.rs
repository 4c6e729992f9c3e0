pub mod controller;
pub mod download_coordinator;
pub mod progress_stream;

pub use controller::{ProgressView, ScrapeController, StreamEvent, StreamHandle};
pub use download_coordinator::{download_fraction, DownloadCoordinator, DownloadEvent};
pub use progress_stream::progress_events;

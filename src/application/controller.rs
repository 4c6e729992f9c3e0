//! Submission controller: the Idle/Streaming state machine behind the scrape form.
//!
//! The controller owns the single active progress stream and drives an injected
//! [`ProgressView`]. Every way out of `Streaming` goes through `finish`,
//! which closes the stream and restores the trigger.

use tracing::{debug, info, warn};
use url::Url;

use crate::{
    api::ApiClient,
    domain::{AppError, DownloadAffordance, ProgressMessage, StreamId, SubmissionState},
};

pub const IDLE_LABEL: &str = "Start Scraping";
pub const STREAMING_LABEL: &str = "Scraping...";

/// The UI surface the controller manipulates.
pub trait ProgressView {
    fn clear_log(&mut self);
    fn append_line(&mut self, line: &str);
    fn scroll_to_latest(&mut self);
    fn set_download_visible(&mut self, visible: bool);
    fn set_trigger(&mut self, enabled: bool, label: &str);
}

/// Something that can cancel an open progress stream.
pub trait StreamHandle {
    fn close(&mut self);
}

/// What the progress stream reports back to the controller.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Raw `data` payload of one event
    Data(String),
    /// The server refused to open the stream
    Rejected(AppError),
    /// The connection failed after the stream was open
    Failed(AppError),
    /// The server closed the stream
    Ended,
}

struct ActiveStream {
    id: StreamId,
    handle: Box<dyn StreamHandle>,
}

pub struct ScrapeController<V> {
    view: V,
    api_client: ApiClient,
    state: SubmissionState,
    download: DownloadAffordance,
    active: Option<ActiveStream>,
    submitted: Option<String>,
    next_stream_id: u64,
}

impl<V: ProgressView> ScrapeController<V> {
    pub fn new(mut view: V, api_client: ApiClient) -> Self {
        view.set_trigger(true, IDLE_LABEL);
        view.set_download_visible(false);

        Self {
            view,
            api_client,
            state: SubmissionState::Idle,
            download: DownloadAffordance::default(),
            active: None,
            submitted: None,
            next_stream_id: 0,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The URL of the most recent submission that opened a stream
    pub fn submitted_target(&self) -> Option<&str> {
        self.submitted.as_deref()
    }

    fn is_active(&self, id: StreamId) -> bool {
        self.active.as_ref().is_some_and(|active| active.id == id)
    }

    /// Starts a scrape of `input`. `open` receives the stream URL and must start
    /// delivering events tagged with the given id.
    ///
    /// Ignored while another stream is open.
    pub fn on_submit<H, F>(&mut self, input: &str, open: F)
    where
        H: StreamHandle + 'static,
        F: FnOnce(StreamId, Url) -> Result<H, AppError>,
    {
        if self.state == SubmissionState::Streaming {
            debug!("submission ignored, a stream is already open");
            return;
        }

        self.view.clear_log();
        self.download.hide();
        self.view.set_download_visible(false);
        self.view.set_trigger(false, STREAMING_LABEL);

        let url = match self.api_client.progress_url(input) {
            Ok(url) => url,
            Err(e) => return self.on_setup_failure(e.into()),
        };

        let id = StreamId(self.next_stream_id);
        self.next_stream_id += 1;

        match open(id, url) {
            Ok(handle) => {
                info!(stream = id.0, target = input.trim(), "scrape submitted");
                self.active = Some(ActiveStream {
                    id,
                    handle: Box::new(handle),
                });
                self.submitted = Some(input.trim().to_string());
                self.state = SubmissionState::Streaming;
            }
            Err(e) => self.on_setup_failure(e),
        }
    }

    pub fn handle(&mut self, id: StreamId, event: StreamEvent) {
        match event {
            StreamEvent::Data(raw) => self.on_message(id, &raw),
            StreamEvent::Rejected(error) => {
                if self.is_active(id) {
                    self.on_setup_failure(error);
                }
            }
            StreamEvent::Failed(error) => self.on_stream_error(id, error),
            StreamEvent::Ended => self.on_stream_end(id),
        }
    }

    pub fn on_message(&mut self, id: StreamId, raw: &str) {
        if !self.is_active(id) {
            debug!(stream = id.0, "dropping message from closed stream");
            return;
        }

        let message = match ProgressMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                return self.on_stream_error(
                    id,
                    AppError::Transport(format!("malformed progress message: {}", e)),
                );
            }
        };

        self.view.append_line(&message.message);
        self.view.scroll_to_latest();

        match message.success {
            Some(true) if self.download.is_visible() => {}
            Some(true) => match self.api_client.download_url() {
                Ok(target) => {
                    info!(stream = id.0, "scrape succeeded");
                    self.download.show(target);
                    self.view.set_download_visible(true);
                }
                Err(e) => {
                    warn!("cannot offer download: {}", e);
                    self.view.append_line(&format!("Error: {}", e));
                }
            },
            Some(false) => {
                info!(stream = id.0, "scrape failed: {}", message.message);
                self.finish();
            }
            None => {}
        }
    }

    pub fn on_stream_error(&mut self, id: StreamId, error: AppError) {
        if !self.is_active(id) {
            return;
        }
        warn!(stream = id.0, "progress stream error: {}", error);
        self.view.append_line(&error.to_string());
        self.view.scroll_to_latest();
        self.finish();
    }

    pub fn on_stream_end(&mut self, id: StreamId) {
        if !self.is_active(id) {
            return;
        }
        debug!(stream = id.0, "progress stream closed by server");
        self.finish();
    }

    /// Reports a failure to start the stream. Leaves the controller Idle.
    pub fn on_setup_failure(&mut self, error: AppError) {
        warn!("could not start scrape: {}", error);
        self.view.append_line(&format!("Error: {}", error));
        self.view.scroll_to_latest();
        self.finish();
    }

    /// Download target, when the affordance is showing
    pub fn on_download_clicked(&self) -> Option<Url> {
        self.download.target().cloned()
    }

    fn finish(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.close();
        }
        self.state = SubmissionState::Idle;
        self.view.set_trigger(true, IDLE_LABEL);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::api::ApiConfig;

    #[derive(Default)]
    struct FakeView {
        log: Vec<String>,
        scrolls: usize,
        download_visible: bool,
        download_shown_count: usize,
        trigger_enabled: bool,
        trigger_label: String,
    }

    impl ProgressView for FakeView {
        fn clear_log(&mut self) {
            self.log.clear();
        }

        fn append_line(&mut self, line: &str) {
            self.log.push(line.to_string());
        }

        fn scroll_to_latest(&mut self) {
            self.scrolls += 1;
        }

        fn set_download_visible(&mut self, visible: bool) {
            if visible && !self.download_visible {
                self.download_shown_count += 1;
            }
            self.download_visible = visible;
        }

        fn set_trigger(&mut self, enabled: bool, label: &str) {
            self.trigger_enabled = enabled;
            self.trigger_label = label.to_string();
        }
    }

    struct FakeHandle(Rc<Cell<bool>>);

    impl StreamHandle for FakeHandle {
        fn close(&mut self) {
            self.0.set(true);
        }
    }

    fn controller() -> ScrapeController<FakeView> {
        ScrapeController::new(
            FakeView::default(),
            ApiClient::new(ApiConfig::with_base_url("http://localhost:5005")),
        )
    }

    /// Submits `url` and returns the stream id plus its closed flag
    fn submit(
        controller: &mut ScrapeController<FakeView>,
        url: &str,
    ) -> (StreamId, Rc<Cell<bool>>) {
        let closed = Rc::new(Cell::new(false));
        let mut opened = None;
        controller.on_submit(url, |id, _url| {
            opened = Some(id);
            Ok(FakeHandle(closed.clone()))
        });
        (opened.expect("stream opened"), closed)
    }

    #[test]
    fn test_initial_state() {
        let controller = controller();
        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, IDLE_LABEL);
        assert!(!controller.view().download_visible);
        assert_eq!(controller.on_download_clicked(), None);
    }

    #[test]
    fn test_submit_clears_and_disables() {
        let mut controller = controller();
        controller.view_mut().log.push("old line".to_string());
        controller.view_mut().download_visible = true;

        let mut requested = None;
        controller.on_submit("https://example.com", |_, url| {
            requested = Some(url);
            Ok(FakeHandle(Rc::new(Cell::new(false))))
        });

        assert_eq!(controller.state(), SubmissionState::Streaming);
        assert!(controller.view().log.is_empty());
        assert!(!controller.view().download_visible);
        assert!(!controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, STREAMING_LABEL);
        assert_eq!(controller.submitted_target(), Some("https://example.com"));
        assert_eq!(
            requested.unwrap().as_str(),
            "http://localhost:5005/scrape?url=https%3A%2F%2Fexample.com"
        );
    }

    #[test]
    fn test_informational_message_keeps_streaming() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.on_message(id, r#"{"message":"starting"}"#);

        assert_eq!(controller.view().log, vec!["starting"]);
        assert_eq!(controller.view().scrolls, 1);
        assert!(!controller.view().download_visible);
        assert!(!controller.view().trigger_enabled);
        assert_eq!(controller.state(), SubmissionState::Streaming);
        assert!(!closed.get());
    }

    #[test]
    fn test_success_reveals_download_once() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.on_message(id, r#"{"message":"starting"}"#);
        controller.on_message(id, r#"{"message":"done","success":true}"#);
        controller.on_message(id, r#"{"message":"saved","success":true}"#);

        assert_eq!(controller.view().log, vec!["starting", "done", "saved"]);
        assert!(controller.view().download_visible);
        assert_eq!(controller.view().download_shown_count, 1);
        assert!(!controller.view().trigger_enabled);
        assert_eq!(controller.state(), SubmissionState::Streaming);
        assert!(!closed.get());
        assert_eq!(
            controller.on_download_clicked().unwrap().as_str(),
            "http://localhost:5005/download"
        );

        // Server closes the stream after the final line
        controller.handle(id, StreamEvent::Ended);
        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, IDLE_LABEL);
        assert!(controller.view().download_visible);
        assert!(closed.get());
    }

    #[test]
    fn test_explicit_failure_restores_trigger() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.on_message(id, r#"{"message":"bad url","success":false}"#);

        assert_eq!(controller.view().log, vec!["bad url"]);
        assert!(!controller.view().download_visible);
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, IDLE_LABEL);
        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(closed.get());

        controller.on_message(id, r#"{"message":"late"}"#);
        assert_eq!(controller.view().log, vec!["bad url"]);
    }

    #[test]
    fn test_transport_drop_ignores_in_flight_messages() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.on_message(id, r#"{"message":"Progress: 1/3 pages processed","success":null}"#);
        controller.handle(
            id,
            StreamEvent::Failed(AppError::Transport("connection reset".to_string())),
        );
        let lines = controller.view().log.len();

        controller.handle(id, StreamEvent::Data(r#"{"message":"in flight"}"#.to_string()));
        controller.handle(id, StreamEvent::Ended);

        assert_eq!(controller.view().log.len(), lines);
        assert_eq!(controller.view().log[1], "Connection lost: connection reset");
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, IDLE_LABEL);
        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(closed.get());
    }

    #[test]
    fn test_malformed_payload_is_a_transport_failure() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.on_message(id, "{not json");

        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert!(closed.get());
        assert!(controller.view().log[0].starts_with("Connection lost: malformed progress message"));
    }

    #[test]
    fn test_log_preserves_delivery_order() {
        let mut controller = controller();
        let (id, _closed) = submit(&mut controller, "https://example.com");

        for name in ["M1", "M2", "M3"] {
            controller.on_message(id, &format!(r#"{{"message":"{}"}}"#, name));
        }

        assert_eq!(controller.view().log, vec!["M1", "M2", "M3"]);
    }

    #[test]
    fn test_setup_failure_never_streams() {
        let mut controller = controller();
        let mut opened = false;
        controller.on_submit("example.com", |_, _| {
            opened = true;
            Ok(FakeHandle(Rc::new(Cell::new(false))))
        });

        assert!(!opened);
        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().trigger_label, IDLE_LABEL);
        assert_eq!(
            controller.view().log,
            vec!["Error: Invalid URL. Please include http:// or https://"]
        );
    }

    #[test]
    fn test_open_failure_restores_trigger() {
        let mut controller = controller();
        controller.on_submit("https://example.com", |_, _| {
            Err::<FakeHandle, _>(AppError::Api("no executor".to_string()))
        });

        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert_eq!(controller.view().log, vec!["Error: API error: no executor"]);
    }

    #[test]
    fn test_rejected_stream_restores_trigger() {
        let mut controller = controller();
        let (id, closed) = submit(&mut controller, "https://example.com");

        controller.handle(
            id,
            StreamEvent::Rejected(AppError::Api("Please provide a sitemap URL".to_string())),
        );

        assert_eq!(controller.state(), SubmissionState::Idle);
        assert!(controller.view().trigger_enabled);
        assert!(closed.get());
        assert_eq!(
            controller.view().log,
            vec!["Error: API error: Please provide a sitemap URL"]
        );
    }

    #[test]
    fn test_submit_ignored_while_streaming() {
        let mut controller = controller();
        let (id, _closed) = submit(&mut controller, "https://example.com");
        controller.on_message(id, r#"{"message":"starting"}"#);

        let mut opened = false;
        controller.on_submit("https://other.example.com", |_, _| {
            opened = true;
            Ok(FakeHandle(Rc::new(Cell::new(false))))
        });

        assert!(!opened);
        assert_eq!(controller.view().log, vec!["starting"]);
        assert_eq!(controller.submitted_target(), Some("https://example.com"));
    }

    #[test]
    fn test_stale_stream_events_are_dropped() {
        let mut controller = controller();
        let (first, _) = submit(&mut controller, "https://example.com");
        controller.on_message(first, r#"{"message":"bad url","success":false}"#);

        let (second, _) = submit(&mut controller, "https://example.com");
        assert_ne!(first, second);

        controller.on_message(first, r#"{"message":"stale","success":true}"#);
        controller.handle(first, StreamEvent::Ended);

        assert!(controller.view().log.is_empty());
        assert!(!controller.view().download_visible);
        assert_eq!(controller.state(), SubmissionState::Streaming);
    }
}

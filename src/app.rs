use crate::api::{ApiClient, ApiConfig};
use crate::application::{
    download_fraction, progress_events, DownloadCoordinator, DownloadEvent, ProgressView,
    ScrapeController, StreamEvent, StreamHandle,
};
use crate::domain::StreamId;
use crate::ui::{ScrapeMessage, ScrapeView};
use crate::utils::suggested_filename;
use futures::StreamExt;
use iced::Task;
use std::path::PathBuf;
use tracing::info;
use url::Url;

impl StreamHandle for iced::task::Handle {
    fn close(&mut self) {
        self.abort();
    }
}

pub struct ScrapeApp {
    controller: ScrapeController<ScrapeView>,
    api_client: ApiClient,
    coordinator: DownloadCoordinator,
}

impl Default for ScrapeApp {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}

impl ScrapeApp {
    pub fn new(config: ApiConfig) -> Self {
        info!(server = %config.base_url, "scrape console starting");
        let api_client = ApiClient::new(config);

        Self {
            controller: ScrapeController::new(ScrapeView::default(), api_client.clone()),
            coordinator: DownloadCoordinator::new(api_client.clone()),
            api_client,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(ScrapeMessage),
    /// Event from the progress stream with the given id
    Progress(StreamId, StreamEvent),
    /// (Selected Path, Download URL)
    SaveLocationSelected(Option<PathBuf>, Url),
    Download(DownloadEvent),
}

pub fn update(app: &mut ScrapeApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.controller.view_mut().update(ui_msg.clone());

            match ui_msg {
                ScrapeMessage::SubmitPressed => return submit(app),
                ScrapeMessage::DownloadPressed => return start_download(app),
                ScrapeMessage::SitemapUrlChanged(_) => {}
            }
        }
        Message::Progress(id, event) => {
            app.controller.handle(id, event);
        }
        Message::SaveLocationSelected(path_opt, url) => {
            let view = app.controller.view_mut();
            match path_opt {
                Some(path) => {
                    view.download_status = Some(format!("Downloading to: {}", path.display()));
                    return Task::stream(
                        app.coordinator
                            .download_stream(url, path)
                            .map(Message::Download),
                    );
                }
                None => {
                    // User cancelled dialog
                    view.is_downloading = false;
                    view.download_status = Some("Download cancelled".to_string());
                }
            }
        }
        Message::Download(event) => {
            let view = app.controller.view_mut();
            match event {
                DownloadEvent::Progress { downloaded, total } => {
                    view.download_status = Some(match download_fraction(downloaded, total) {
                        Some(fraction) => format!("Downloading: {:.1}%", fraction * 100.0),
                        None => format!("Downloading: {} bytes", downloaded),
                    });
                }
                DownloadEvent::Completed(path) => {
                    view.is_downloading = false;
                    view.download_status = None;
                    view.append_line(&format!("Saved: {}", path.display()));
                    view.scroll_to_latest();
                }
                DownloadEvent::Failed(e) => {
                    view.is_downloading = false;
                    view.download_status = None;
                    view.append_line(&format!("Download failed: {}", e));
                    view.scroll_to_latest();
                }
            }
        }
    }
    Task::none()
}

fn submit(app: &mut ScrapeApp) -> Task<Message> {
    let input = app.controller.view().sitemap_url.clone();
    let api_client = app.api_client.clone();
    let mut task = Task::none();

    app.controller.on_submit(&input, |id, url| {
        // iced runs the stream on its tokio executor; the handle aborts it
        let (stream_task, handle) = Task::stream(
            progress_events(api_client, url).map(move |event| Message::Progress(id, event)),
        )
        .abortable();
        task = stream_task;
        Ok(handle)
    });

    task
}

fn start_download(app: &mut ScrapeApp) -> Task<Message> {
    let Some(url) = app.controller.on_download_clicked() else {
        return Task::none();
    };
    let filename = suggested_filename(app.controller.submitted_target());
    let coordinator = app.coordinator.clone();

    let view = app.controller.view_mut();
    if view.is_downloading {
        return Task::none();
    }
    view.is_downloading = true;
    view.download_status = Some("Please select save location...".to_string());

    Task::perform(
        async move {
            let path = coordinator.choose_save_path(filename).await;
            (path, url)
        },
        |(path, url)| Message::SaveLocationSelected(path, url),
    )
}

pub fn view(app: &ScrapeApp) -> iced::Element<'_, Message> {
    app.controller.view().view().map(Message::UiMessage)
}

use std::path::PathBuf;

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::{api::ApiClient, domain::AppError};

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Bytes written so far, and the expected total when the server sent one
    Progress { downloaded: u64, total: Option<u64> },
    Completed(PathBuf),
    Failed(AppError),
}

impl DownloadEvent {
    fn failed_io(context: &str, err: std::io::Error) -> Self {
        DownloadEvent::Failed(AppError::Io(format!("{}: {}", context, err)))
    }
}

/// Saves the results file the download affordance points at.
#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub async fn choose_save_path(&self, suggested_filename: String) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name(&suggested_filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Streams `url` into `path`, reporting progress after every chunk.
    pub fn download_stream(&self, url: Url, path: PathBuf) -> BoxStream<'static, DownloadEvent> {
        futures::stream::unfold(
            SaveState::Start {
                client: self.api_client.clone(),
                url,
                path,
            },
            |state| async move {
                match state {
                    SaveState::Start { client, url, path } => {
                        let body = match client.download_file_stream(url).await {
                            Ok((total, stream)) => (total, stream.boxed()),
                            Err(e) => {
                                return Some((
                                    DownloadEvent::Failed(e.into()),
                                    SaveState::Finished,
                                ));
                            }
                        };

                        let file = match tokio::fs::File::create(&path).await {
                            Ok(file) => file,
                            Err(e) => {
                                return Some((
                                    DownloadEvent::failed_io("Failed to create file", e),
                                    SaveState::Finished,
                                ));
                            }
                        };

                        debug!(path = %path.display(), total = ?body.0, "saving results file");
                        Some((
                            DownloadEvent::Progress {
                                downloaded: 0,
                                total: body.0,
                            },
                            SaveState::Writing {
                                file,
                                stream: body.1,
                                downloaded: 0,
                                total: body.0,
                                path,
                            },
                        ))
                    }
                    SaveState::Writing {
                        mut file,
                        mut stream,
                        mut downloaded,
                        total,
                        path,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                return Some((
                                    DownloadEvent::failed_io("Write error", e),
                                    SaveState::Finished,
                                ));
                            }
                            downloaded += chunk.len() as u64;

                            Some((
                                DownloadEvent::Progress { downloaded, total },
                                SaveState::Writing {
                                    file,
                                    stream,
                                    downloaded,
                                    total,
                                    path,
                                },
                            ))
                        }
                        Some(Err(e)) => Some((
                            DownloadEvent::Failed(AppError::Transport(e.to_string())),
                            SaveState::Finished,
                        )),
                        None => {
                            if let Err(e) = file.sync_all().await {
                                return Some((
                                    DownloadEvent::failed_io("Failed to sync file", e),
                                    SaveState::Finished,
                                ));
                            }

                            info!(path = %path.display(), bytes = downloaded, "results file saved");
                            Some((DownloadEvent::Completed(path), SaveState::Finished))
                        }
                    },
                    SaveState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

enum SaveState {
    Start {
        client: ApiClient,
        url: Url,
        path: PathBuf,
    },
    Writing {
        file: tokio::fs::File,
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        downloaded: u64,
        total: Option<u64>,
        path: PathBuf,
    },
    Finished,
}

/// Fraction of the download written, when the total size is known
pub fn download_fraction(downloaded: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((downloaded as f32 / total as f32).min(1.0)),
        _ => None,
    }
}

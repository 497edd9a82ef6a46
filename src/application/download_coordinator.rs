use std::path::{Path, PathBuf};

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::{
    api::{ApiClient, ApiError},
    application::download_flow::{CatalogTicket, LinkTicket},
    domain::{AppError, FormatCatalog, IssuedLink},
    utils::sanitize_filename,
};

#[derive(Debug, Clone)]
pub enum SaveEvent {
    Progress(f32),
    Completed(PathBuf),
    Failed(AppError),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err.to_string())
    }
}

/// Runs flow tickets against the backend and streams issued links to disk.
#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub async fn fetch_catalog(&self, ticket: &CatalogTicket) -> Result<FormatCatalog, AppError> {
        Ok(self.api_client.fetch_catalog(&ticket.content_id).await?)
    }

    pub async fn issue_link(&self, ticket: &LinkTicket) -> Result<IssuedLink, AppError> {
        let response = self.api_client.issue_link(&ticket.request).await?;

        let quality_label = if response.quality.trim().is_empty() {
            ticket.quality_label.clone()
        } else {
            response.quality
        };

        Ok(IssuedLink {
            url: response.url,
            quality_label,
            approximate_size: response.file_size,
            container: response.container,
        })
    }

    pub fn suggested_filename(title: &str, link: &IssuedLink) -> String {
        let stem = sanitize_filename(title);
        let stem = stem.trim_matches(|c| c == '.' || c == ' ');
        let stem = if stem.is_empty() { "download" } else { stem };

        if link.container.is_empty() {
            stem.to_string()
        } else {
            format!("{}.{}", stem, link.container)
        }
    }

    pub async fn choose_save_path(&self, suggested_filename: String) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_file_name(&suggested_filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    pub fn save_stream(&self, url: String, path: PathBuf) -> BoxStream<'static, SaveEvent> {
        futures::stream::unfold(
            SaveRuntimeState::Start {
                client: self.api_client.clone(),
                url,
                path,
            },
            |state| async move {
                match state {
                    SaveRuntimeState::Start { client, url, path } => {
                        // The destination is only touched once the link answers.
                        let (total_size, stream) = match client.download_file_stream(&url).await {
                            Ok(response) => response,
                            Err(e) => {
                                warn!(error = %e, "issued link did not answer");
                                return Some((
                                    SaveEvent::Failed(e.into()),
                                    SaveRuntimeState::Finished,
                                ));
                            }
                        };

                        let file = match tokio::fs::File::create(&path).await {
                            Ok(file) => file,
                            Err(e) => {
                                warn!(path = %path.display(), error = %e, "cannot create file");
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Failed to create file: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }
                        };

                        info!(path = %path.display(), "saving issued link");
                        Some((
                            SaveEvent::Progress(0.0),
                            SaveRuntimeState::Downloading {
                                file,
                                stream: stream.boxed(),
                                downloaded: 0,
                                total: total_size,
                                path,
                            },
                        ))
                    }
                    SaveRuntimeState::Downloading {
                        mut file,
                        mut stream,
                        mut downloaded,
                        total,
                        path,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                discard_partial(file, &path).await;
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Write error: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }

                            downloaded += chunk.len() as u64;

                            let progress = match total {
                                Some(total_size) if total_size > 0 => {
                                    downloaded as f32 / total_size as f32
                                }
                                _ => 0.0,
                            };

                            Some((
                                SaveEvent::Progress(progress),
                                SaveRuntimeState::Downloading {
                                    file,
                                    stream,
                                    downloaded,
                                    total,
                                    path,
                                },
                            ))
                        }
                        Some(Err(e)) => {
                            discard_partial(file, &path).await;
                            Some((SaveEvent::Failed(e.into()), SaveRuntimeState::Finished))
                        }
                        None => {
                            if let Err(e) = file.sync_all().await {
                                discard_partial(file, &path).await;
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Failed to sync file: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }

                            info!(path = %path.display(), bytes = downloaded, "save complete");
                            Some((SaveEvent::Completed(path), SaveRuntimeState::Finished))
                        }
                    },
                    SaveRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

async fn discard_partial(file: tokio::fs::File, path: &Path) {
    drop(file);
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "could not remove partial download");
    }
}

enum SaveRuntimeState {
    Start {
        client: ApiClient,
        url: String,
        path: PathBuf,
    },
    Downloading {
        file: tokio::fs::File,
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        downloaded: u64,
        total: Option<u64>,
        path: PathBuf,
    },
    Finished,
}

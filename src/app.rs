use std::path::PathBuf;

use futures::StreamExt;
use iced::Task;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiConfig};
use crate::application::{
    CatalogTicket, DownloadCoordinator, DownloadFlow, HostChannel, LinkTicket, SaveEvent,
};
use crate::domain::{AppError, FormatCatalog, IssuedLink};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::extract_video_id;

pub struct DownloadApp {
    view: DownloadView,
    flow: Option<DownloadFlow>,
    coordinator: DownloadCoordinator,
    host: HostChannel,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}

impl DownloadApp {
    pub fn new(config: ApiConfig) -> Self {
        let host = HostChannel::new(config.embedded);
        let api_client = ApiClient::new(config);

        Self {
            view: DownloadView::default(),
            flow: None,
            coordinator: DownloadCoordinator::new(api_client),
            host,
        }
    }

    /// Reads the config from the environment and, when a video was passed
    /// on the command line, starts fetching its catalog immediately.
    pub fn boot() -> (Self, Task<Message>) {
        let config = ApiConfig::from_env();
        info!(base_url = %config.base_url, embedded = config.embedded, "starting download dialog");

        let mut app = Self::new(config);
        let task = match std::env::args().nth(1) {
            Some(arg) => {
                app.view.video_input = arg;
                app.load_from_input()
            }
            None => Task::none(),
        };
        (app, task)
    }

    fn load_from_input(&mut self) -> Task<Message> {
        match self.begin_load() {
            Some(ticket) => self.fetch_catalog(ticket),
            None => Task::none(),
        }
    }

    /// Points the dialog at the video in the input box. A different video
    /// replaces the flow; the same one is refetched.
    fn begin_load(&mut self) -> Option<CatalogTicket> {
        let Some(video_id) = extract_video_id(&self.view.video_input) else {
            self.view.status_message = AppError::InvalidInput.to_string();
            return None;
        };

        let reload = match self.flow.as_mut() {
            Some(flow) if flow.content_id() == video_id => Some(flow.load_catalog()),
            _ => None,
        };
        let ticket = match reload {
            Some(ticket) => ticket,
            None => {
                let (flow, ticket) = DownloadFlow::new(video_id);
                self.flow = Some(flow);
                ticket
            }
        };
        self.view.status_message = format!("Fetching formats for: {}", ticket.content_id);
        Some(ticket)
    }

    fn begin_retry(&mut self) -> Option<CatalogTicket> {
        let ticket = self.flow.as_mut()?.load_catalog();
        self.view.status_message = "Retrying...".to_string();
        Some(ticket)
    }

    fn fetch_catalog(&self, ticket: CatalogTicket) -> Task<Message> {
        let coordinator = self.coordinator.clone();
        Task::perform(
            async move {
                let result = coordinator.fetch_catalog(&ticket).await;
                (ticket, result)
            },
            |(ticket, result)| Message::CatalogLoaded(ticket, result),
        )
    }

    fn issue_link(&self, ticket: LinkTicket) -> Task<Message> {
        let coordinator = self.coordinator.clone();
        Task::perform(
            async move {
                let result = coordinator.issue_link(&ticket).await;
                (ticket, result)
            },
            |(ticket, result)| Message::LinkIssued(ticket, result),
        )
    }

    fn current_link(&self) -> Option<&IssuedLink> {
        self.flow.as_ref().and_then(|f| f.issued_link())
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    CatalogLoaded(CatalogTicket, Result<FormatCatalog, AppError>),
    LinkIssued(LinkTicket, Result<IssuedLink, AppError>),
    /// (Selected Path, Download URL)
    SavePathSelected(Option<PathBuf>, String),
    Save(SaveEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(&ui_msg);
            return handle_ui(app, ui_msg);
        }
        Message::CatalogLoaded(ticket, result) => {
            if let Some(flow) = app.flow.as_mut() {
                if flow.apply_catalog(&ticket, result) {
                    app.view.status_message = match flow.catalog_error() {
                        Some(_) => "Could not load formats".to_string(),
                        None => String::new(),
                    };
                }
            }
        }
        Message::LinkIssued(ticket, result) => {
            if let Some(flow) = app.flow.as_mut() {
                if flow.apply_link(&ticket, result) {
                    app.view.status_message = match flow.issued_link() {
                        Some(_) => "Download link ready".to_string(),
                        None => "Could not generate link".to_string(),
                    };
                }
            }
        }
        Message::SavePathSelected(path_opt, url) => match path_opt {
            Some(path) => {
                app.view.status_message = format!("Downloading to: {}", path.display());
                app.view.save_progress = Some(0.0);
                return Task::stream(app.coordinator.save_stream(url, path).map(Message::Save));
            }
            None => {
                app.view.status_message = "Save cancelled".to_string();
            }
        },
        Message::Save(event) => match event {
            SaveEvent::Progress(progress) => {
                app.view.save_progress = Some(progress);
                app.view.status_message = if progress >= 1.0 {
                    "Download complete, finalizing...".to_string()
                } else {
                    format!("Downloading: {:.1}%", progress * 100.0)
                };
            }
            SaveEvent::Completed(path) => {
                app.view.save_progress = None;
                app.view.status_message = format!("Saved: {}", path.display());
            }
            SaveEvent::Failed(err) => {
                app.view.save_progress = None;
                app.view.status_message = format!("Download failed: {}", err.user_message());
            }
        },
    }
    Task::none()
}

fn handle_ui(app: &mut DownloadApp, message: DownloadMessage) -> Task<Message> {
    match message {
        DownloadMessage::VideoInputChanged(_) => Task::none(),
        DownloadMessage::LoadPressed => app.load_from_input(),
        DownloadMessage::RetryCatalog => match app.begin_retry() {
            Some(ticket) => app.fetch_catalog(ticket),
            None => Task::none(),
        },
        DownloadMessage::MediaKindSelected(kind) => {
            if let Some(flow) = app.flow.as_mut() {
                flow.select_media_kind(kind);
                app.view.status_message.clear();
            }
            Task::none()
        }
        DownloadMessage::QualitySelected(label) => {
            if let Some(flow) = app.flow.as_mut() {
                flow.select_quality(label);
                app.view.status_message.clear();
            }
            Task::none()
        }
        DownloadMessage::GetLinkPressed => match app.flow.as_mut().and_then(|f| f.request_link()) {
            Some(ticket) => {
                app.view.status_message = format!("Requesting {} link...", ticket.quality_label);
                app.issue_link(ticket)
            }
            None => Task::none(),
        },
        DownloadMessage::ResetLink => {
            if let Some(flow) = app.flow.as_mut() {
                flow.reset_link();
                app.view.status_message.clear();
            }
            Task::none()
        }
        DownloadMessage::CopyLink => match app.current_link() {
            Some(link) => {
                let url = link.url.clone();
                app.view.status_message = "Link copied to clipboard".to_string();
                iced::clipboard::write(url)
            }
            None => Task::none(),
        },
        DownloadMessage::OpenLink => {
            if let Some(link) = app.current_link() {
                let url = link.url.clone();
                app.view.status_message = match app.host.open_external_url(&url) {
                    Ok(()) if app.host.is_embedded() => "Link sent to host".to_string(),
                    Ok(()) => "Opening link in browser".to_string(),
                    Err(e) => {
                        warn!(error = %e, "failed to open link");
                        e.user_message()
                    }
                };
            }
            Task::none()
        }
        DownloadMessage::SaveLink => {
            let Some(link) = app.current_link() else {
                return Task::none();
            };
            let title = app
                .flow
                .as_ref()
                .and_then(|f| f.catalog())
                .map(|c| c.title.clone())
                .unwrap_or_default();
            let filename = DownloadCoordinator::suggested_filename(&title, link);
            let url = link.url.clone();
            let coordinator = app.coordinator.clone();

            app.view.status_message = "Please select save location...".to_string();
            Task::perform(
                async move { coordinator.choose_save_path(filename).await },
                move |path| Message::SavePathSelected(path, url.clone()),
            )
        }
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view(app.flow.as_ref()).map(Message::UiMessage)
}

use iced::{
    widget::{button, column, pick_list, progress_bar, row, text, text_input, Column, Space},
    Element, Length, Theme,
};

use crate::application::DownloadFlow;
use crate::domain::{FlowState, IssuedLink, MediaKind};

/// Main view state
pub struct DownloadView {
    pub video_input: String,
    pub status_message: String,
    /// `Some` while an issued link is being written to disk.
    pub save_progress: Option<f32>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            video_input: String::new(),
            status_message: "Enter a video URL or ID".to_string(),
            save_progress: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    VideoInputChanged(String),
    LoadPressed,
    RetryCatalog,
    MediaKindSelected(MediaKind),
    QualitySelected(String),
    GetLinkPressed,
    ResetLink,
    CopyLink,
    OpenLink,
    SaveLink,
}

impl DownloadView {
    pub fn update(&mut self, message: &DownloadMessage) {
        if let DownloadMessage::VideoInputChanged(input) = message {
            self.video_input = input.clone();
        }
    }

    pub fn view<'a>(&'a self, flow: Option<&'a DownloadFlow>) -> Element<'a, DownloadMessage> {
        let mut content = column![
            text("Download").size(32),
            Space::new().height(Length::Fixed(10.0)),
            row![
                text_input("Video URL or ID...", &self.video_input)
                    .on_input(DownloadMessage::VideoInputChanged)
                    .on_submit(DownloadMessage::LoadPressed)
                    .padding(10),
                button("Load")
                    .on_press(DownloadMessage::LoadPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
        ]
        .padding(20)
        .spacing(10);

        if let Some(flow) = flow {
            content = content.push(flow_section(flow));
        }

        if let Some(progress) = self.save_progress {
            content = content.push(progress_bar(0.0..=1.0, progress));
        }

        content.push(text(&self.status_message).size(14)).into()
    }
}

fn flow_section(flow: &DownloadFlow) -> Element<'_, DownloadMessage> {
    match flow.state() {
        FlowState::FetchingCatalog => text("Loading available formats...").into(),
        FlowState::CatalogError(message) => column![
            text(message.as_str()),
            button("Retry")
                .on_press(DownloadMessage::RetryCatalog)
                .padding([8, 16]),
        ]
        .spacing(10)
        .into(),
        state => {
            let mut section = catalog_section(flow);
            section = match state {
                FlowState::IssuingLink => section.push(text("Generating download link...")),
                FlowState::LinkError(message) => section.push(
                    row![
                        text(message.as_str()),
                        button("Try again")
                            .on_press_maybe(
                                flow.can_request_link()
                                    .then_some(DownloadMessage::GetLinkPressed)
                            ),
                    ]
                    .spacing(10),
                ),
                FlowState::LinkReady(link) => section.push(link_section(link)),
                _ => section,
            };
            section.into()
        }
    }
}

fn catalog_section(flow: &DownloadFlow) -> Column<'_, DownloadMessage> {
    let mut section = Column::new().spacing(10);

    if let Some(catalog) = flow.catalog() {
        section = section.push(text(catalog.title.as_str()).size(20));
        if let Some(duration) = &catalog.duration {
            section = section.push(text(format!("Duration: {}", duration)).size(14));
        }
    }

    let active = flow.selection().media_kind;
    let kinds = MediaKind::ALL.iter().fold(row![].spacing(10), |r, kind| {
        let style: fn(&Theme, button::Status) -> button::Style = if *kind == active {
            button::primary
        } else {
            button::secondary
        };
        r.push(
            button(text(kind.to_string()))
                .style(style)
                .on_press(DownloadMessage::MediaKindSelected(*kind)),
        )
    });
    section = section.push(kinds);

    if flow.is_empty_listing() {
        return section.push(text(format!(
            "No {} formats available for this video",
            active.as_str()
        )));
    }

    let labels: Vec<String> = flow
        .active_formats()
        .iter()
        .map(|f| f.quality.clone())
        .collect();
    let selected = Some(flow.selection().quality_label.clone()).filter(|l| !l.is_empty());
    section = section.push(
        row![
            pick_list(labels, selected, DownloadMessage::QualitySelected).placeholder("Quality"),
            button("Get link")
                .on_press_maybe(
                    flow.can_request_link()
                        .then_some(DownloadMessage::GetLinkPressed)
                )
                .padding([8, 16]),
        ]
        .spacing(10),
    );

    if let Some(format) = flow
        .active_formats()
        .iter()
        .find(|f| f.quality == flow.selection().quality_label)
    {
        section = section.push(
            text(format!("{} · {}", format.container, format.approximate_size)).size(14),
        );
    }

    section
}

fn link_section(link: &IssuedLink) -> Element<'_, DownloadMessage> {
    column![
        text(format!(
            "{} {} ({})",
            link.quality_label, link.container, link.approximate_size
        )),
        text(link.url.as_str()).size(12),
        row![
            button("Copy link").on_press(DownloadMessage::CopyLink),
            button("Open").on_press(DownloadMessage::OpenLink),
            button("Save as...").on_press(DownloadMessage::SaveLink),
            button("New link").on_press(DownloadMessage::ResetLink),
        ]
        .spacing(10),
    ]
    .spacing(8)
    .into()
}

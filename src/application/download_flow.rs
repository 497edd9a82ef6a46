//! State machine behind the download dialog.
//!
//! The flow never performs I/O. Operations that need the network hand back a
//! ticket; the caller runs it and feeds the outcome back together with the
//! ticket. Every ticket carries a sequence number and outcomes for a
//! superseded ticket are dropped, so a slow response can never overwrite
//! newer state. Sequence numbers come from one process-wide counter, so a
//! ticket issued by an earlier flow never matches a later one.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::{
    api::LinkRequest,
    domain::{AppError, DownloadSelection, FlowState, Format, FormatCatalog, IssuedLink, MediaKind},
    utils::normalize_quality,
};

const PREFERRED_QUALITY: &str = "720";

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    NEXT_SEQ.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTicket {
    pub seq: u64,
    pub content_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTicket {
    pub seq: u64,
    /// Label as shown in the dialog, e.g. "720p".
    pub quality_label: String,
    pub request: LinkRequest,
}

#[derive(Debug, Clone)]
pub struct DownloadFlow {
    content_id: String,
    state: FlowState,
    catalog: Option<FormatCatalog>,
    selection: DownloadSelection,
    catalog_seq: u64,
    link_seq: u64,
}

impl DownloadFlow {
    /// Starts in `FetchingCatalog`; run the returned ticket right away.
    pub fn new(content_id: impl Into<String>) -> (Self, CatalogTicket) {
        let mut flow = Self {
            content_id: content_id.into(),
            state: FlowState::FetchingCatalog,
            catalog: None,
            selection: DownloadSelection::default(),
            catalog_seq: 0,
            link_seq: 0,
        };
        let ticket = flow.load_catalog();
        (flow, ticket)
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn catalog(&self) -> Option<&FormatCatalog> {
        self.catalog.as_ref()
    }

    pub fn selection(&self) -> &DownloadSelection {
        &self.selection
    }

    /// Formats of the active media kind; empty until a catalog arrives.
    pub fn active_formats(&self) -> &[Format] {
        self.catalog
            .as_ref()
            .map(|c| c.formats(self.selection.media_kind))
            .unwrap_or(&[])
    }

    pub fn issued_link(&self) -> Option<&IssuedLink> {
        match &self.state {
            FlowState::LinkReady(link) => Some(link),
            _ => None,
        }
    }

    pub fn catalog_error(&self) -> Option<&str> {
        match &self.state {
            FlowState::CatalogError(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn link_error(&self) -> Option<&str> {
        match &self.state {
            FlowState::LinkError(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// A loaded catalog with nothing to offer for the active media kind.
    /// This is an empty state, not an error.
    pub fn is_empty_listing(&self) -> bool {
        self.catalog.is_some() && self.active_formats().is_empty()
    }

    fn has_settled_catalog(&self) -> bool {
        self.catalog.is_some()
            && !matches!(
                self.state,
                FlowState::FetchingCatalog | FlowState::CatalogError(_)
            )
    }

    pub fn can_request_link(&self) -> bool {
        self.has_settled_catalog()
            && !self.selection.quality_label.is_empty()
            && self.state != FlowState::IssuingLink
    }

    /// (Re)fetch the catalog. Also the retry action after `CatalogError`.
    pub fn load_catalog(&mut self) -> CatalogTicket {
        self.catalog_seq = next_seq();
        // Any outstanding link belongs to the catalog being replaced.
        self.link_seq = next_seq();
        self.state = FlowState::FetchingCatalog;
        info!(content_id = %self.content_id, seq = self.catalog_seq, "loading catalog");
        CatalogTicket {
            seq: self.catalog_seq,
            content_id: self.content_id.clone(),
        }
    }

    /// Returns `false` when the outcome belongs to a superseded request.
    pub fn apply_catalog(
        &mut self,
        ticket: &CatalogTicket,
        outcome: Result<FormatCatalog, AppError>,
    ) -> bool {
        if ticket.seq != self.catalog_seq
            || ticket.content_id != self.content_id
            || self.state != FlowState::FetchingCatalog
        {
            debug!(seq = ticket.seq, current = self.catalog_seq, "dropping stale catalog response");
            return false;
        }

        match outcome {
            Ok(catalog) => {
                info!(
                    title = %catalog.title,
                    video = catalog.video_formats.len(),
                    audio = catalog.audio_formats.len(),
                    "catalog ready"
                );
                self.catalog = Some(catalog);
                self.apply_default_quality();
                self.state = FlowState::Ready;
            }
            Err(err) => {
                warn!(error = %err, "catalog fetch failed");
                self.state = FlowState::CatalogError(err.user_message());
            }
        }
        true
    }

    /// Ignored until a catalog has been loaded.
    pub fn select_media_kind(&mut self, kind: MediaKind) {
        if self.catalog.is_none() {
            return;
        }
        self.selection.media_kind = kind;
        self.apply_default_quality();
        self.clear_link();
    }

    pub fn select_quality(&mut self, quality_label: impl Into<String>) {
        self.selection.quality_label = quality_label.into();
        self.clear_link();
    }

    /// `None` when there is nothing to request: no catalog yet or an empty
    /// quality selection.
    pub fn request_link(&mut self) -> Option<LinkTicket> {
        if !self.has_settled_catalog() || self.selection.quality_label.is_empty() {
            return None;
        }

        self.link_seq = next_seq();
        self.state = FlowState::IssuingLink;
        let ticket = LinkTicket {
            seq: self.link_seq,
            quality_label: self.selection.quality_label.clone(),
            request: LinkRequest {
                video_id: self.content_id.clone(),
                quality: normalize_quality(&self.selection.quality_label),
                media_kind: self.selection.media_kind,
            },
        };
        info!(
            seq = ticket.seq,
            quality = %ticket.request.quality,
            kind = ticket.request.media_kind.as_str(),
            "issuing link"
        );
        Some(ticket)
    }

    /// Returns `false` when the outcome belongs to a superseded request.
    pub fn apply_link(&mut self, ticket: &LinkTicket, outcome: Result<IssuedLink, AppError>) -> bool {
        if ticket.seq != self.link_seq
            || ticket.request.video_id != self.content_id
            || self.state != FlowState::IssuingLink
        {
            debug!(seq = ticket.seq, current = self.link_seq, "dropping stale link response");
            return false;
        }

        self.state = match outcome {
            Ok(link) => FlowState::LinkReady(link),
            Err(err) => {
                warn!(error = %err, "link issuance failed");
                FlowState::LinkError(err.user_message())
            }
        };
        true
    }

    /// Discard the issued link and go back to `Ready`, keeping the catalog.
    pub fn reset_link(&mut self) {
        self.clear_link();
    }

    fn clear_link(&mut self) {
        self.link_seq = next_seq();
        if matches!(
            self.state,
            FlowState::IssuingLink | FlowState::LinkReady(_) | FlowState::LinkError(_)
        ) {
            self.state = FlowState::Ready;
        }
    }

    fn apply_default_quality(&mut self) {
        let formats = self.active_formats();
        let label = formats
            .iter()
            .find(|f| f.quality.contains(PREFERRED_QUALITY))
            .or_else(|| formats.first())
            .map(|f| f.quality.clone())
            .unwrap_or_default();
        self.selection.quality_label = label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(id: &str, quality: &str, container: &str) -> Format {
        Format {
            id: id.into(),
            quality: quality.into(),
            container: container.into(),
            approximate_size: "10 MB".into(),
        }
    }

    fn catalog() -> FormatCatalog {
        FormatCatalog {
            title: "Clip".into(),
            duration: None,
            thumbnail: None,
            video_formats: vec![
                format("18", "360p", "mp4"),
                format("22", "720p", "mp4"),
                format("137", "1080p", "mp4"),
            ],
            audio_formats: vec![format("140", "128kbps", "m4a"), format("251", "160kbps", "webm")],
        }
    }

    fn link(label: &str) -> IssuedLink {
        IssuedLink {
            url: format!("https://cdn.example/{}", label),
            quality_label: label.into(),
            approximate_size: "10 MB".into(),
            container: "mp4".into(),
        }
    }

    fn ready_flow() -> DownloadFlow {
        let (mut flow, ticket) = DownloadFlow::new("abc");
        assert!(flow.apply_catalog(&ticket, Ok(catalog())));
        flow
    }

    #[test]
    fn test_initial_state_is_fetching() {
        let (flow, ticket) = DownloadFlow::new("abc");
        assert_eq!(flow.state(), &FlowState::FetchingCatalog);
        assert_eq!(ticket.content_id, "abc");
        assert!(!flow.can_request_link());
    }

    #[test]
    fn test_catalog_selects_720_by_default() {
        let flow = ready_flow();
        assert_eq!(flow.state(), &FlowState::Ready);
        assert_eq!(flow.selection().quality_label, "720p");
        assert_eq!(flow.selection().media_kind, MediaKind::Video);
    }

    #[test]
    fn test_media_kind_without_720_falls_back_to_first() {
        let mut flow = ready_flow();
        flow.select_media_kind(MediaKind::Audio);
        assert_eq!(flow.selection().quality_label, "128kbps");
        assert_eq!(flow.active_formats().len(), 2);
    }

    #[test]
    fn test_changing_quality_clears_link() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        assert!(flow.apply_link(&ticket, Ok(link("720p"))));
        assert!(flow.issued_link().is_some());

        flow.select_quality("1080p");
        assert!(flow.issued_link().is_none());
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_changing_media_kind_clears_link_error() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        flow.apply_link(&ticket, Err(AppError::Api("boom".into())));
        assert_eq!(flow.link_error(), Some("boom"));

        flow.select_media_kind(MediaKind::Audio);
        assert_eq!(flow.link_error(), None);
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_request_link_with_empty_quality_is_noop() {
        let mut flow = ready_flow();
        flow.select_quality("");
        assert!(flow.request_link().is_none());
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_request_link_before_catalog_is_noop() {
        let (mut flow, _ticket) = DownloadFlow::new("abc");
        flow.select_quality("720p");
        assert!(flow.request_link().is_none());
        assert_eq!(flow.state(), &FlowState::FetchingCatalog);
    }

    #[test]
    fn test_request_link_normalizes_quality() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        assert_eq!(flow.state(), &FlowState::IssuingLink);
        assert_eq!(ticket.request.quality, "720");
        assert_eq!(ticket.request.video_id, "abc");
        assert_eq!(ticket.request.media_kind, MediaKind::Video);
        assert_eq!(ticket.quality_label, "720p");
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        let (mut flow, ticket) = DownloadFlow::new("abc");
        let mut empty = catalog();
        empty.audio_formats.clear();
        flow.apply_catalog(&ticket, Ok(empty));
        flow.select_media_kind(MediaKind::Audio);

        assert!(flow.is_empty_listing());
        assert_eq!(flow.state(), &FlowState::Ready);
        assert_eq!(flow.catalog_error(), None);
        assert!(flow.request_link().is_none());
    }

    #[test]
    fn test_retry_after_catalog_error() {
        let (mut flow, ticket) = DownloadFlow::new("abc");
        flow.apply_catalog(&ticket, Err(AppError::Api("HTTP 500".into())));
        assert_eq!(flow.catalog_error(), Some("HTTP 500"));

        let retry = flow.load_catalog();
        assert_eq!(retry.content_id, ticket.content_id);
        assert_eq!(flow.state(), &FlowState::FetchingCatalog);
        assert!(flow.apply_catalog(&retry, Ok(catalog())));
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_stale_catalog_response_is_dropped() {
        let (mut flow, first) = DownloadFlow::new("abc");
        let second = flow.load_catalog();

        assert!(!flow.apply_catalog(&first, Err(AppError::Api("late".into()))));
        assert_eq!(flow.state(), &FlowState::FetchingCatalog);
        assert!(flow.apply_catalog(&second, Ok(catalog())));
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_link_result_after_selection_change_is_dropped() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        flow.select_quality("1080p");

        assert!(!flow.apply_link(&ticket, Ok(link("720p"))));
        assert!(flow.issued_link().is_none());
        assert_eq!(flow.state(), &FlowState::Ready);
    }

    #[test]
    fn test_newer_link_request_supersedes_older() {
        let mut flow = ready_flow();
        let first = flow.request_link().unwrap();
        let second = flow.request_link().unwrap();

        assert!(!flow.apply_link(&first, Ok(link("old"))));
        assert!(flow.apply_link(&second, Ok(link("720p"))));
        assert_eq!(flow.issued_link().unwrap().quality_label, "720p");
    }

    #[test]
    fn test_link_error_is_retryable() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        flow.apply_link(&ticket, Err(AppError::Api("".into())));
        assert_eq!(flow.link_error(), Some(crate::domain::error::UNEXPECTED_ERROR));

        let retry = flow.request_link().unwrap();
        assert!(flow.apply_link(&retry, Ok(link("720p"))));
        assert!(flow.issued_link().is_some());
    }

    #[test]
    fn test_reset_link_keeps_catalog() {
        let mut flow = ready_flow();
        let ticket = flow.request_link().unwrap();
        flow.apply_link(&ticket, Ok(link("720p")));

        flow.reset_link();
        assert_eq!(flow.state(), &FlowState::Ready);
        assert!(flow.catalog().is_some());
        assert_eq!(flow.selection().quality_label, "720p");
    }

    #[test]
    fn test_ticket_from_previous_flow_is_dropped() {
        let (_first, first_ticket) = DownloadFlow::new("aaa");
        let (mut second, second_ticket) = DownloadFlow::new("bbb");
        assert_ne!(first_ticket.seq, second_ticket.seq);

        let mut other = catalog();
        other.title = "Video A".into();
        assert!(!second.apply_catalog(&first_ticket, Ok(other)));
        assert_eq!(second.state(), &FlowState::FetchingCatalog);

        assert!(second.apply_catalog(&second_ticket, Ok(catalog())));
        assert_eq!(second.catalog().unwrap().title, "Clip");
    }

    #[test]
    fn test_ticket_for_other_content_is_dropped() {
        let (mut flow, ticket) = DownloadFlow::new("abc");
        let foreign = CatalogTicket {
            seq: ticket.seq,
            content_id: "xyz".into(),
        };
        assert!(!flow.apply_catalog(&foreign, Ok(catalog())));

        flow.apply_catalog(&ticket, Ok(catalog()));
        let mut link_ticket = flow.request_link().unwrap();
        link_ticket.request.video_id = "xyz".into();
        assert!(!flow.apply_link(&link_ticket, Ok(link("720p"))));
        assert_eq!(flow.state(), &FlowState::IssuingLink);
    }

    #[test]
    fn test_media_kind_ignored_before_catalog() {
        let (mut flow, ticket) = DownloadFlow::new("abc");
        flow.select_media_kind(MediaKind::Audio);
        assert_eq!(flow.selection().media_kind, MediaKind::Video);

        assert!(flow.apply_catalog(&ticket, Ok(catalog())));
        assert_eq!(flow.selection().quality_label, "720p");
    }

    #[test]
    fn test_refetch_replaces_catalog_wholesale() {
        let mut flow = ready_flow();
        let ticket = flow.load_catalog();
        let mut next = catalog();
        next.title = "Renamed".into();
        next.video_formats.truncate(1);
        flow.apply_catalog(&ticket, Ok(next));

        assert_eq!(flow.catalog().unwrap().title, "Renamed");
        assert_eq!(flow.selection().quality_label, "360p");
    }
}

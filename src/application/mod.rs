pub mod download_coordinator;
pub mod download_flow;
pub mod host;

pub use download_coordinator::{DownloadCoordinator, SaveEvent};
pub use download_flow::{CatalogTicket, DownloadFlow, LinkTicket};
pub use host::HostChannel;

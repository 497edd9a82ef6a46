pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{DownloadSelection, FlowState, Format, FormatCatalog, IssuedLink, MediaKind};

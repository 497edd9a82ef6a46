use std::io::Write;
use std::process::Command;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::AppError;

/// Messages handed to an embedding host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    OpenExternalUrl { url: String },
}

/// How an issued link leaves the dialog: posted to the parent process as a
/// JSON line on stdout when embedded, or handed to the OS opener.
#[derive(Debug, Clone, Copy)]
pub struct HostChannel {
    embedded: bool,
}

impl HostChannel {
    pub fn new(embedded: bool) -> Self {
        Self { embedded }
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn open_external_url(&self, url: &str) -> Result<(), AppError> {
        if self.embedded {
            let message = HostMessage::OpenExternalUrl {
                url: url.to_string(),
            };
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            return post_message(&mut handle, &message);
        }

        open_url_in_os(url)
    }
}

pub fn post_message<W: Write>(writer: &mut W, message: &HostMessage) -> Result<(), AppError> {
    let line = serde_json::to_string(message)
        .map_err(|e| AppError::Io(format!("Failed to encode host message: {}", e)))?;
    writeln!(writer, "{}", line)
        .and_then(|_| writer.flush())
        .map_err(|e| AppError::Io(format!("Failed to post host message: {}", e)))?;
    info!("posted {} to host", line);
    Ok(())
}

fn open_url_in_os(url: &str) -> Result<(), AppError> {
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(url);
        c
    };
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command.spawn().map(|_| ()).map_err(|e| {
        warn!(error = %e, "could not launch system opener");
        AppError::Io(format!("Could not open link: {}", e))
    })
}

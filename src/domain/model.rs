use std::fmt;

use serde::{Deserialize, Serialize};

/// A selectable encoding of one content item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Format {
    #[serde(
        default,
        alias = "formatId",
        alias = "itag",
        deserialize_with = "id_as_string"
    )]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality: String,
    #[serde(default, alias = "ext", deserialize_with = "null_as_default")]
    pub container: String,
    #[serde(
        default,
        rename = "approximateSize",
        alias = "fileSize",
        alias = "filesize",
        deserialize_with = "null_as_default"
    )]
    pub approximate_size: String,
}

/// Duration as reported by the catalog service: either seconds or a
/// preformatted label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CatalogDuration {
    Seconds(u64),
    Label(String),
}

impl fmt::Display for CatalogDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogDuration::Seconds(secs) => {
                f.write_str(&crate::utils::format_duration(*secs))
            }
            CatalogDuration::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCatalog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub duration: Option<CatalogDuration>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub video_formats: Vec<Format>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio_formats: Vec<Format>,
}

impl FormatCatalog {
    pub fn formats(&self, kind: MediaKind) -> &[Format] {
        match kind {
            MediaKind::Video => &self.video_formats,
            MediaKind::Audio => &self.audio_formats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Audio];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("Video"),
            MediaKind::Audio => f.write_str("Audio"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSelection {
    pub media_kind: MediaKind,
    pub quality_label: String,
}

/// A concrete, time-bound download URL for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLink {
    pub url: String,
    pub quality_label: String,
    pub approximate_size: String,
    pub container: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    FetchingCatalog,
    CatalogError(String),
    Ready,
    IssuingLink,
    LinkError(String),
    LinkReady(IssuedLink),
}

/// Backends send `null` for fields they could not determine; treat it like a
/// missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => s,
        Some(RawId::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

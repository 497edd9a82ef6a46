use regex::Regex;

/// Pull a video ID out of a watch/share/embed URL, or accept a bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let re = Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{6,})",
    )
    .ok()?;
    if let Some(caps) = re.captures(input) {
        return Some(caps[1].to_string());
    }

    let bare = Regex::new(r"^[A-Za-z0-9_-]+$").ok()?;
    if bare.is_match(input) {
        return Some(input.to_string());
    }
    None
}

/// The link service expects the numeric part of a quality label only.
pub fn normalize_quality(label: &str) -> String {
    label.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

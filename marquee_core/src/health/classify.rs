//! Verdict classification from a probe response.
//!
//! Pure: no I/O, no clock other than the verdict timestamp.

use super::probe::ProbeResponse;
use super::{HealthStatus, HealthVerdict, RawLink};
use std::time::Duration;

const STREAMING_HOSTS: &[&str] = &[
    "streamlare", "vcdnlare", "slmaxed", "sltube", "netutv", "uperbox", "streamtape", "droplare",
    "streamwish", "filelions", "mixdrop", "doodstream", "upstream",
];

const SHORTLINK_HOSTS: &[&str] = &[
    "shortlinkto.onl", "shortlinkto.biz", "uptobhai.blog", "shortlink.to", "short.link",
    "unlock.link", "linkvertise.com", "adf.ly", "bit.ly", "tinyurl.com", "ow.ly", "goo.gl",
];

const STREAM_ERROR_MARKERS: &[&str] = &[
    "file not found", "video not found", "expired", "deleted", "removed", "unavailable",
    "error 404", "access denied", "forbidden",
];

const STREAM_PLAYER_MARKERS: &[&str] = &[
    "video", "player", "stream", "jwplayer", "videojs", "plyr", "hls", "m3u8",
];

const DEAD_PAGE_MARKERS: &[&str] = &[
    "page not found", "404 not found", "file not found", "link expired", "link not found",
    "invalid link", "broken link", "access denied", "this link has expired",
    "link has been removed", "file has been deleted",
];

const FILE_CONTENT_TYPES: &[&str] = &["video/", "application/octet-stream", "application/zip"];

/// Bodies at least this large count as a file whatever their content type
pub const FILE_SIZE_THRESHOLD: u64 = 1_000_000;

const DIRECT_DOWNLOAD_MARKERS: &[&str] = &[
    "drive.google.com/file", "mega.nz", "mediafire.com/file", "dropbox.com", "onedrive.live.com",
    ".zip", ".rar", ".mp4", ".mkv", ".avi",
];

const LOCKED_MARKERS: &[&str] = &[
    "click to unlock download link", "unlock download links", "click here to unlock",
    "verify you are human", "complete captcha", "human verification", "get link",
    "continue to link", "generating link", "unlock now", "unlock link",
];

const UNLOCKED_MARKERS: &[&str] = &[
    "links unlocked now", "google drive", "mega.nz", "mediafire", "dropbox", "onedrive",
    "download link:", "download links:", "direct download", "file download", "download now",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn is_streaming_host(url: &str) -> bool {
    contains_any(&url.to_lowercase(), STREAMING_HOSTS)
}

pub fn is_shortlink_host(url: &str) -> bool {
    contains_any(&url.to_lowercase(), SHORTLINK_HOSTS)
}

/// Hosts whose page body decides the verdict.
pub fn needs_content(url: &str) -> bool {
    is_streaming_host(url) || is_shortlink_host(url)
}

/// A 200 that declares a non-file content type and no large body is a
/// landing page rather than the download itself.
fn serves_page(response: &ProbeResponse) -> bool {
    let Some(content_type) = response.content_type.as_deref() else {
        return false;
    };
    let content_type = content_type.to_lowercase();
    !contains_any(&content_type, FILE_CONTENT_TYPES)
        && response.content_length.map_or(true, |len| len <= FILE_SIZE_THRESHOLD)
}

/// Classify one probe response.
///
/// `trusted` hosts skip the file-versus-page check. `priority` is always
/// false here; the engine decides promotion.
pub fn classify(
    link: &RawLink,
    response: &ProbeResponse,
    slow_threshold: Duration,
    trusted: bool,
) -> HealthVerdict {
    let status = response.status;
    let body = response.body.as_deref().unwrap_or_default().to_lowercase();

    let (health, reason) = match status {
        200..=299 if is_streaming_host(&link.url) => classify_stream(&body),
        200..=299 if is_shortlink_host(&link.url) => {
            let final_url = response.final_url.as_deref().unwrap_or_default().to_lowercase();
            classify_shortlink(&body, &final_url)
        }
        200 if !trusted && serves_page(response) => {
            (HealthStatus::Warning, "page, not a file".to_string())
        }
        200 | 204 => (HealthStatus::Healthy, "active".to_string()),
        206 => (HealthStatus::Warning, "partial content".to_string()),
        200..=299 => (HealthStatus::Warning, format!("unexpected status {}", status)),
        300..=399 => {
            let target = response.location.as_deref().unwrap_or("unknown location");
            (HealthStatus::Locked, format!("redirects to {}", target))
        }
        403 => (HealthStatus::Dead, "access denied".to_string()),
        404 => (HealthStatus::Dead, "not found".to_string()),
        410 => (HealthStatus::Dead, "gone".to_string()),
        400..=499 => (HealthStatus::Dead, format!("client error {}", status)),
        500..=599 => (HealthStatus::Dead, format!("server error {}", status)),
        _ => (HealthStatus::Warning, format!("unexpected status {}", status)),
    };

    let elapsed_ms = response.elapsed.as_millis() as u64;
    let (health, reason) = if health == HealthStatus::Healthy && response.elapsed > slow_threshold {
        (HealthStatus::Warning, format!("slow response ({}ms)", elapsed_ms))
    } else {
        (health, reason)
    };

    let mut verdict = HealthVerdict::new(health, reason).with_code(status);
    verdict.response_time_ms = Some(elapsed_ms);
    verdict.final_url = response.final_url.clone();
    verdict
}

fn classify_stream(body: &str) -> (HealthStatus, String) {
    if contains_any(body, STREAM_ERROR_MARKERS) {
        (HealthStatus::Dead, "stream unavailable or expired".to_string())
    } else if contains_any(body, STREAM_PLAYER_MARKERS) {
        (HealthStatus::Healthy, "stream playable".to_string())
    } else {
        (HealthStatus::Warning, "stream status unclear".to_string())
    }
}

fn classify_shortlink(body: &str, final_url: &str) -> (HealthStatus, String) {
    if contains_any(body, DEAD_PAGE_MARKERS) {
        (HealthStatus::Dead, "dead link page".to_string())
    } else if contains_any(final_url, DIRECT_DOWNLOAD_MARKERS) {
        (HealthStatus::Healthy, "unlocked, direct link".to_string())
    } else if contains_any(body, LOCKED_MARKERS) {
        (HealthStatus::Locked, "click to unlock".to_string())
    } else if contains_any(body, UNLOCKED_MARKERS) {
        (HealthStatus::Healthy, "download links available".to_string())
    } else {
        (HealthStatus::Warning, "shortlink active".to_string())
    }
}

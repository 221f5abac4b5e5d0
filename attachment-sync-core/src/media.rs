//! Pure helpers for classifying and naming media: size policy, display-name
//! truncation, and the extension lookup table.

use serde::{Deserialize, Serialize};

use crate::contract::Placement;

/// Largest payload embedded into destination storage. Anything bigger is linked.
pub const EMBED_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Destination systems reject display names longer than this (in characters).
pub const MAX_NAME_CHARS: usize = 100;

const ELLIPSIS: char = '…';

/// Block types the crawler treats as media.
pub const MEDIA_BLOCK_TYPES: [&str; 5] = ["image", "video", "file", "pdf", "audio"];

/// How a file is previewed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    /// Block type name used when previewing a file of this kind.
    pub fn block_type(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }
}

/// extension → (mime type, preview kind). Unknown extensions fall back to
/// `application/octet-stream` / [`MediaKind::File`].
const EXTENSION_TABLE: &[(&str, &str, MediaKind)] = &[
    ("mp4", "video/mp4", MediaKind::Video),
    ("jpg", "image/jpeg", MediaKind::Image),
    ("jpeg", "image/jpeg", MediaKind::Image),
    ("png", "image/png", MediaKind::Image),
    ("gif", "image/gif", MediaKind::Image),
    ("webp", "image/webp", MediaKind::Image),
    ("tif", "image/tiff", MediaKind::Image),
    ("tiff", "image/tiff", MediaKind::Image),
    ("pdf", "application/pdf", MediaKind::File),
    ("mov", "video/quicktime", MediaKind::File),
    ("mp3", "audio/mpeg", MediaKind::File),
    ("wav", "audio/wav", MediaKind::File),
    ("txt", "text/plain", MediaKind::File),
    ("csv", "text/csv", MediaKind::File),
    ("zip", "application/zip", MediaKind::File),
    ("doc", "application/msword", MediaKind::File),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        MediaKind::File,
    ),
    ("xls", "application/vnd.ms-excel", MediaKind::File),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        MediaKind::File,
    ),
];

pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Lowercased extension of a file name, ignoring any query string.
pub fn extension(name: &str) -> Option<String> {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn lookup(name: &str) -> Option<&'static (&'static str, &'static str, MediaKind)> {
    let ext = extension(name)?;
    EXTENSION_TABLE.iter().find(|(e, _, _)| *e == ext)
}

/// Preview kind for a file name.
pub fn kind_for(name: &str) -> MediaKind {
    lookup(name).map(|(_, _, kind)| *kind).unwrap_or(MediaKind::File)
}

/// Mime type for a file name.
pub fn mime_for(name: &str) -> &'static str {
    lookup(name).map(|(_, mime, _)| *mime).unwrap_or(FALLBACK_MIME)
}

/// Size policy: embed up to and including [`EMBED_LIMIT_BYTES`], link above it.
pub fn placement_for(len: usize) -> Placement {
    if len <= EMBED_LIMIT_BYTES {
        Placement::Embedded
    } else {
        Placement::Linked
    }
}

/// Truncate to at most [`MAX_NAME_CHARS`] characters, ending in `…` when cut.
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        return name.to_string();
    }
    let mut out: String = name.chars().take(MAX_NAME_CHARS - 1).collect();
    out.push(ELLIPSIS);
    out
}

pub fn is_media_block(block_type: &str) -> bool {
    MEDIA_BLOCK_TYPES.contains(&block_type)
}

/// Last path segment of a URL, used when a source reports no file name.
pub fn name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("file")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_policy_boundary() {
        assert_eq!(placement_for(EMBED_LIMIT_BYTES), Placement::Embedded);
        assert_eq!(placement_for(EMBED_LIMIT_BYTES + 1), Placement::Linked);
        assert_eq!(placement_for(0), Placement::Embedded);
    }

    #[test]
    fn truncation_is_idempotent() {
        let short = "a".repeat(MAX_NAME_CHARS);
        assert_eq!(truncate_name(&short), short);

        let long = "b".repeat(150);
        let cut = truncate_name(&long);
        assert_eq!(cut.chars().count(), MAX_NAME_CHARS);
        assert!(cut.ends_with(ELLIPSIS));
        assert_eq!(truncate_name(&cut), cut);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = "é".repeat(120);
        let cut = truncate_name(&name);
        assert_eq!(cut.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn every_table_entry_resolves() {
        for (ext, mime, kind) in EXTENSION_TABLE {
            let name = format!("clip.{}", ext.to_uppercase());
            assert_eq!(mime_for(&name), *mime, "{name}");
            assert_eq!(kind_for(&name), *kind, "{name}");
        }
    }

    #[test]
    fn preview_kinds_follow_extension_rule() {
        assert_eq!(kind_for("a.mp4"), MediaKind::Video);
        for ext in ["jpg", "jpeg", "png", "gif", "webp", "tif", "tiff"] {
            assert_eq!(kind_for(&format!("a.{ext}")), MediaKind::Image);
        }
        assert_eq!(kind_for("a.mov"), MediaKind::File);
        assert_eq!(kind_for("README"), MediaKind::File);
    }

    #[test]
    fn unknown_extension_falls_back_to_binary() {
        assert_eq!(mime_for("archive.xyz"), FALLBACK_MIME);
        assert_eq!(mime_for("noext"), FALLBACK_MIME);
        assert_eq!(mime_for(".hidden"), FALLBACK_MIME);
    }

    #[test]
    fn extension_ignores_query_string() {
        assert_eq!(extension("photo.PNG?X-Amz-Expires=3600").as_deref(), Some("png"));
        assert_eq!(extension("https://host/a.b/file"), None);
    }

    #[test]
    fn name_from_url_takes_last_segment() {
        assert_eq!(
            name_from_url("https://cdn.example.com/x/y/report.pdf?sig=1"),
            "report.pdf"
        );
        assert_eq!(name_from_url("https://cdn.example.com/"), "cdn.example.com");
        assert_eq!(name_from_url(""), "file");
    }
}

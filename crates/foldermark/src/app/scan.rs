//! Folder marker scanning.
//!
//! A marker is `||` followed by one or more `/`-terminated path segments and a closing `||`,
//! e.g. `||Projects/||` or `||Areas/Health/||`. A leading `/` anchors the folder at the vault
//! root. Segments may not contain `|`, `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>` or line breaks, and
//! must hold at least one non-blank character; anything that does not fit stays literal text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::Marker;

static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\|\|(/?(?:[^|/\\:*?"<>\r\n]*[^|/\\:*?"<>\s][^|/\\:*?"<>\r\n]*/)+)\|\|"#)
        .expect("marker pattern compiles")
});

/// A piece of scanned text: either literal content or a recognised marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<'a> {
    Text(&'a str),
    Marker(Marker),
}

/// Find every folder marker in `text`, left to right and non-overlapping.
pub fn scan(text: &str) -> Vec<Marker> {
    let markers: Vec<Marker> = MARKER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            let folder_name = normalize_folder_name(inner.as_str())?;
            Some(Marker {
                span: whole.range(),
                raw: whole.as_str().to_owned(),
                folder_name,
            })
        })
        .collect();

    tracing::trace!(count = markers.len(), "scanned text for folder markers");
    markers
}

/// Split `text` into literal and marker fragments.
///
/// Concatenating the fragments (markers by their `raw` text) reproduces the input, so callers can
/// substitute rendered output per marker without tracking offsets.
pub fn fragments(text: &str) -> Vec<Fragment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for marker in scan(text) {
        if marker.span.start > cursor {
            out.push(Fragment::Text(&text[cursor..marker.span.start]));
        }
        cursor = marker.span.end;
        out.push(Fragment::Marker(marker));
    }

    if cursor < text.len() {
        out.push(Fragment::Text(&text[cursor..]));
    }
    out
}

/// Normalize a folder name: trim each segment and drop the trailing separator.
///
/// Returns `None` when the name is empty or contains an empty segment. A leading `/` is kept.
pub fn normalize_folder_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let rooted = trimmed.starts_with('/');
    let body = trimmed.trim_start_matches('/');
    let body = body.strip_suffix('/').unwrap_or(body);

    let mut segments = Vec::new();
    for segment in body.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            return None;
        }
        segments.push(segment);
    }

    let joined = segments.join("/");
    Some(if rooted { format!("/{joined}") } else { joined })
}

use std::{collections::HashSet, path::Path};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Markdown comment wrapper the header line opens with.
pub const HEADER_PREFIX: &str = "[//]: # (";
/// Closing character of the header line, right before the first newline.
pub const HEADER_SUFFIX: u8 = b')';
/// Separates the preview of a long-form snippet from the rest of it.
pub const BREAK_MARKER: &str = "[//]: # (break)";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("no line break found, the metadata header cannot be closed")]
    MissingLineBreak,
    #[error("first line does not start with \"[//]: # (\"")]
    MissingPrefix,
    #[error("first line does not end with ')'")]
    MissingSuffix,
    #[error("invalid metadata header: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct Header {
    // `Name` is ignored: the file name wins
    date: String,
    #[serde(default)]
    long_snip: bool,
    #[serde(default)]
    published: bool,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetMetadata {
    pub name: String,
    pub date: String,
    pub long_snip: bool,
    pub published: bool,
    pub tags: Vec<String>,
}

/// Parses the header line of `content`. `name` is the snippet identity derived
/// from its location and overrides anything the header says.
pub fn extract(name: &str, content: &[u8]) -> Result<SnippetMetadata, MetadataError> {
    let newline = content
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(MetadataError::MissingLineBreak)?;
    let line = &content[..newline];

    if line.len() < HEADER_PREFIX.len() + 1 || !line.starts_with(HEADER_PREFIX.as_bytes()) {
        return Err(MetadataError::MissingPrefix);
    }
    if line[line.len() - 1] != HEADER_SUFFIX {
        return Err(MetadataError::MissingSuffix);
    }

    let header: Header = serde_json::from_slice(&line[HEADER_PREFIX.len()..line.len() - 1])?;

    let mut seen = HashSet::new();
    let tags = header
        .tags
        .into_iter()
        .filter(|tag| {
            let first = seen.insert(tag.clone());
            if !first {
                debug!("{name}: dropping repeated tag {tag:?}");
            }
            first
        })
        .collect();

    Ok(SnippetMetadata {
        name: name.to_string(),
        date: header.date,
        long_snip: header.long_snip,
        published: header.published,
        tags,
    })
}

/// Snippet identity: the file name without its extension.
pub fn snippet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Text before the first break marker, or all of `body` without one.
pub fn preview_of(body: &str) -> &str {
    body.split(BREAK_MARKER).next().unwrap_or(body)
}

/// Drops the header line so it never reaches the markdown renderer.
pub fn body_without_header(markdown: &str) -> &str {
    match markdown.split_once('\n') {
        Some((first, rest)) if first.starts_with(HEADER_PREFIX) => rest,
        _ => markdown,
    }
}

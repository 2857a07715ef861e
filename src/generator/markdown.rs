use std::sync::OnceLock;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::Regex;

use crate::metadata::{self, BREAK_MARKER};

use super::page::PageDepth;

fn raw_html_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\b(src|href)="\./"#).unwrap())
}

/// Markdown that is safe to hand to the parser: no header line, no break marker.
pub(super) fn renderable(markdown: &str) -> String {
    metadata::body_without_header(markdown).replace(BREAK_MARKER, "")
}

fn relocate<'a>(url: CowStr<'a>, prefix: &str) -> CowStr<'a> {
    if let Some(rest) = url.strip_prefix("./") {
        return format!("{prefix}{rest}").into();
    }
    url
}

/// Points `./`-relative destinations at the page's root.
fn relocate_event<'a>(event: Event<'a>, prefix: &str) -> Event<'a> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: relocate(dest_url, prefix),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: relocate(dest_url, prefix),
            title,
            id,
        }),
        Event::Html(raw) => Event::Html(relocate_raw(raw, prefix)),
        Event::InlineHtml(raw) => Event::InlineHtml(relocate_raw(raw, prefix)),
        _ => event,
    }
}

fn relocate_raw<'a>(raw: CowStr<'a>, prefix: &str) -> CowStr<'a> {
    let pattern = raw_html_link_pattern();
    if !pattern.is_match(&raw) {
        return raw;
    }
    pattern
        .replace_all(&raw, format!("${{1}}=\"{prefix}"))
        .into_owned()
        .into()
}

pub(super) fn to_html(markdown: &str, depth: PageDepth) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let prefix = depth.prefix();
    let parser = Parser::new_ext(markdown, options).map(|event| relocate_event(event, prefix));

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use handlebars::Handlebars;
use log::debug;
use maud::html;
use serde::Serialize;

use crate::{
    renderer::generate_renderer,
    store::{ContentStore, PublishedSnippet},
};

use super::{
    data::{FragmentData, HomePageData, LongFormPageData, TagPageData},
    markdown,
};

/// Directory holding tag pages, relative to the output directory.
pub const TAG_DIR: &str = "tag";

/// How deep below the output directory a page is written. Relative links in
/// templates and markdown are generated against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDepth {
    /// `output/*.html`
    Root,
    /// `output/tag/*.html`
    Nested,
}

impl PageDepth {
    pub fn prefix(self) -> &'static str {
        match self {
            PageDepth::Root => "./",
            PageDepth::Nested => "../",
        }
    }
}

fn tags_html(tags: &[String], depth: PageDepth) -> String {
    let prefix = depth.prefix();
    html! {
        @for tag in tags {
            span class="tag" {
                " " a href={ (prefix) (TAG_DIR) "/" (urlencoding::encode(tag)) ".html" } { (tag) }
            }
        }
    }
    .into_string()
}

fn continue_html(name: &str, depth: PageDepth) -> String {
    html! {
        p {
            a class="continue" href={ (depth.prefix()) (urlencoding::encode(name)) ".html" } {
                "Continue reading..."
            }
        }
    }
    .into_string()
}

fn tag_header_html(tag: &str) -> String {
    html! {
        p class="innerHtml" id="tagheader" { "Posts with tag: " strong { (tag) } }
    }
    .into_string()
}

/// Rejects tags that would escape `output/tag/` or not name a file at all.
fn tag_file_name(tag: &str) -> anyhow::Result<String> {
    if tag.is_empty() || tag == "." || tag == ".." || tag.contains(['/', '\\']) {
        bail!("tag {tag:?} cannot be used as a file name");
    }
    Ok(format!("{tag}.html"))
}

pub struct PageRenderer {
    handlebars: Handlebars<'static>,
    out_dir: PathBuf,
}

impl PageRenderer {
    pub fn new(template_dir: &Path, out_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            handlebars: generate_renderer(template_dir)?,
            out_dir: out_dir.to_owned(),
        })
    }

    fn fill<T: Serialize>(&self, template: &str, data: &T) -> anyhow::Result<String> {
        self.handlebars
            .render(template, data)
            .with_context(|| format!("while filling template {template:?}"))
    }

    fn write_page(&self, path: &Path, content: &str) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            fs_extra::dir::create_all(parent, false)
                .with_context(|| format!("while creating {parent:?}"))?;
        }
        std::fs::write(path, content).with_context(|| format!("while writing {path:?}"))?;
        debug!("Wrote {path:?}");
        Ok(())
    }

    /// One snippet's preview as embedded in the home feed and tag pages.
    pub fn render_fragment(
        &self,
        snippet: &PublishedSnippet,
        tags: &[String],
        depth: PageDepth,
    ) -> anyhow::Result<String> {
        let data = FragmentData {
            root: depth.prefix(),
            name: &snippet.name,
            date: &snippet.date,
            inner_html: markdown::to_html(&markdown::renderable(&snippet.body), depth),
            tags_html: tags_html(tags, depth),
            continue_html: if snippet.long_snip {
                continue_html(&snippet.name, depth)
            } else {
                String::new()
            },
        };
        self.fill("snip", &data)
            .with_context(|| format!("while rendering fragment of {:?}", snippet.name))
    }

    /// Writes `output/{name}.html` with the whole body of a long-form snippet.
    pub fn render_long_form_page(
        &self,
        snippet: &PublishedSnippet,
        full_body: &str,
        tags: &[String],
    ) -> anyhow::Result<PathBuf> {
        let depth = PageDepth::Root;
        let data = LongFormPageData {
            root: depth.prefix(),
            name: &snippet.name,
            date: &snippet.date,
            inner_html: markdown::to_html(&markdown::renderable(full_body), depth),
            tags_html: tags_html(tags, depth),
        };
        let page = self
            .fill("longsnip", &data)
            .with_context(|| format!("while rendering long-form page of {:?}", snippet.name))?;

        let path = self.out_dir.join(format!("{}.html", snippet.name));
        self.write_page(&path, &page)?;
        Ok(path)
    }

    fn render_feed(
        &self,
        store: &ContentStore,
        snippets: &[PublishedSnippet],
        depth: PageDepth,
    ) -> anyhow::Result<String> {
        let mut fragments = Vec::with_capacity(snippets.len());
        for snippet in snippets.iter() {
            let tags = store.query_tags(&snippet.name)?;
            fragments.push(self.render_fragment(snippet, &tags, depth)?);
        }
        Ok(fragments.join("\n"))
    }

    /// Writes `output/index.html` from `published`, kept in the given order.
    pub fn render_home_page(
        &self,
        store: &ContentStore,
        published: &[PublishedSnippet],
    ) -> anyhow::Result<PathBuf> {
        let depth = PageDepth::Root;
        let data = HomePageData {
            root: depth.prefix(),
            body: self.render_feed(store, published, depth)?,
        };
        let page = self
            .fill("home", &data)
            .context("while generating index.html")?;

        let path = self.out_dir.join("index.html");
        self.write_page(&path, &page)?;
        Ok(path)
    }

    /// Writes `output/tag/{tag}.html` listing `matching`.
    pub fn render_tag_page(
        &self,
        store: &ContentStore,
        tag: &str,
        matching: &[PublishedSnippet],
    ) -> anyhow::Result<PathBuf> {
        let path = self.out_dir.join(TAG_DIR).join(tag_file_name(tag)?);

        let depth = PageDepth::Nested;
        let data = TagPageData {
            root: depth.prefix(),
            tag,
            tag_header: tag_header_html(tag),
            body: self.render_feed(store, matching, depth)?,
        };
        let page = self
            .fill("tag", &data)
            .with_context(|| format!("while generating tag page for {tag:?}"))?;

        self.write_page(&path, &page)?;
        Ok(path)
    }
}

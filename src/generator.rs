use anyhow::Context;
use log::{debug, info, log_enabled, warn, Level};

use crate::{config::Config, store::ContentStore, validate};

pub use page::{PageDepth, PageRenderer};

mod data;
mod markdown;
mod page;

/// Home feed plus one page per published long-form snippet.
pub fn render_main(store: &ContentStore, renderer: &PageRenderer) -> anyhow::Result<()> {
    let published = store.query_published()?;

    for snippet in published.iter().filter(|s| s.long_snip) {
        let full_body = store.query_full_body(&snippet.name)?;
        let tags = store.query_tags(&snippet.name)?;
        renderer.render_long_form_page(snippet, &full_body, &tags)?;
    }

    renderer.render_home_page(store, &published)?;
    info!("Rendered home page with {} snippets", published.len());
    Ok(())
}

/// One index page per tag found on a published snippet.
pub fn render_all_tags(store: &ContentStore, renderer: &PageRenderer) -> anyhow::Result<()> {
    let tags = store.query_distinct_published_tags()?;
    for tag in tags.iter() {
        let matching = store.query_published_by_tag(tag)?;
        renderer.render_tag_page(store, tag, &matching)?;
    }
    info!("Rendered {} tag pages", tags.len());
    Ok(())
}

pub fn generate(config: &Config) -> anyhow::Result<()> {
    let mut store = ContentStore::create(&config.store_path)
        .with_context(|| format!("while creating store {:?}", config.store_path))?;
    store
        .populate(&config.source_dir)
        .with_context(|| format!("while loading snippets from {:?}", config.source_dir))?;
    if log_enabled!(Level::Debug) {
        for record in store.records()? {
            debug!("{record:?}");
        }
    }

    let renderer = PageRenderer::new(&config.template_dir, &config.out_dir)?;
    render_main(&store, &renderer)?;
    render_all_tags(&store, &renderer)?;
    drop(store);

    match validate::validate(&config.out_dir) {
        Ok(report) if report.is_consistent() => info!("{report}"),
        Ok(report) => warn!("{report}"),
        Err(e) => warn!("Image check skipped: {e:#}"),
    }

    Ok(())
}

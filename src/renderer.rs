use std::path::Path;

use anyhow::Context;
use handlebars::Handlebars;

/// Registered template names and the files they are loaded from.
pub(crate) const TEMPLATES: [(&str, &str); 4] = [
    ("home", "index.hbs"),
    ("snip", "snip.hbs"),
    ("longsnip", "longsnip.hbs"),
    ("tag", "tag.hbs"),
];

pub(crate) fn generate_renderer(template_dir: &Path) -> anyhow::Result<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();
    // a slot the template names but the page data lacks is a bug, not an empty string
    handlebars.set_strict_mode(true);
    for (name, file) in TEMPLATES {
        handlebars
            .register_template_file(name, template_dir.join(file))
            .with_context(|| format!("while loading template {:?}", template_dir.join(file)))?;
    }

    Ok(handlebars)
}

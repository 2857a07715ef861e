use serde::Serialize;

/// Slots of `snip.hbs`.
#[derive(Serialize, Debug)]
pub(super) struct FragmentData<'a> {
    pub root: &'static str,
    pub name: &'a str,
    pub date: &'a str,
    pub inner_html: String,
    pub tags_html: String,
    pub continue_html: String,
}

/// Slots of `longsnip.hbs`.
#[derive(Serialize, Debug)]
pub(super) struct LongFormPageData<'a> {
    pub root: &'static str,
    pub name: &'a str,
    pub date: &'a str,
    pub inner_html: String,
    pub tags_html: String,
}

/// Slots of `index.hbs`.
#[derive(Serialize, Debug)]
pub(super) struct HomePageData {
    pub root: &'static str,
    pub body: String,
}

/// Slots of `tag.hbs`.
#[derive(Serialize, Debug)]
pub(super) struct TagPageData<'a> {
    pub root: &'static str,
    pub tag: &'a str,
    pub tag_header: String,
    pub body: String,
}

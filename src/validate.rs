//! Post-build check that the images referenced by the rendered pages and the
//! files in `output/images` agree.
//!
//! Only pages directly under the output directory are scanned; tag pages live
//! in a subdirectory and are not looked at.

use std::{collections::BTreeSet, fmt, path::Path, sync::OnceLock};

use anyhow::Context;
use log::{debug, warn};
use regex::Regex;

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<img\b[^>]*?\ssrc="\./images/([^"]*)""#).unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReport {
    /// Referenced by a page but absent from the images directory.
    Missing(BTreeSet<String>),
    /// Present in the images directory but never referenced.
    Unused(BTreeSet<String>),
    Consistent,
}

impl ImageReport {
    pub fn is_consistent(&self) -> bool {
        matches!(self, ImageReport::Consistent)
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ImageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReport::Missing(names) => write!(
                f,
                "The following images are referenced but not in the images folder: {}",
                join(names)
            ),
            ImageReport::Unused(names) => write!(
                f,
                "The following images are in the images folder but not used: {}",
                join(names)
            ),
            ImageReport::Consistent => write!(f, "Linked and saved images match!"),
        }
    }
}

/// File names referenced as `./images/NAME` by `<img>` tags in `html`.
pub fn referenced_images(html: &str) -> BTreeSet<String> {
    image_pattern()
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

pub fn reconcile(linked: &BTreeSet<String>, saved: &BTreeSet<String>) -> ImageReport {
    let missing: BTreeSet<String> = linked.difference(saved).cloned().collect();
    if !missing.is_empty() {
        return ImageReport::Missing(missing);
    }
    let unused: BTreeSet<String> = saved.difference(linked).cloned().collect();
    if !unused.is_empty() {
        return ImageReport::Unused(unused);
    }
    ImageReport::Consistent
}

pub fn validate(out_dir: &Path) -> anyhow::Result<ImageReport> {
    let mut linked = BTreeSet::new();
    for entry in std::fs::read_dir(out_dir).with_context(|| format!("while reading {out_dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "html") {
            continue;
        }
        debug!("Scanning {path:?} for images");
        let html = std::fs::read_to_string(&path).with_context(|| format!("while reading {path:?}"))?;
        linked.extend(referenced_images(&html));
    }

    let image_dir = out_dir.join("images");
    let mut saved = BTreeSet::new();
    if image_dir.is_dir() {
        for entry in std::fs::read_dir(&image_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                saved.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
    } else {
        warn!("{image_dir:?} does not exist, treating it as empty");
    }

    Ok(reconcile(&linked, &saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn finds_image_references() {
        let html = r#"<p><img src="./images/a.png" alt="a" /> <img alt="b" src="./images/b.jpg"></p>
<img src="https://example.com/images/c.png"><img src="../images/d.png"><a src="./images/e.png">"#;
        assert_eq!(referenced_images(html), set(&["a.png", "b.jpg"]));
    }

    #[test]
    fn missing_wins_over_unused() {
        let report = reconcile(&set(&["a.png", "x.png"]), &set(&["a.png", "z.png"]));
        assert_eq!(report, ImageReport::Missing(set(&["x.png"])));
    }

    #[test]
    fn unused_when_nothing_missing() {
        let report = reconcile(&set(&["a.png"]), &set(&["a.png", "z.png"]));
        assert_eq!(report, ImageReport::Unused(set(&["z.png"])));
        assert_eq!(
            report.to_string(),
            "The following images are in the images folder but not used: z.png"
        );
    }

    #[test]
    fn consistent() {
        let report = reconcile(&set(&["a.png"]), &set(&["a.png"]));
        assert!(report.is_consistent());
    }

    #[test]
    fn scans_top_level_pages_only() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        std::fs::create_dir_all(out.join("images")).unwrap();
        std::fs::create_dir_all(out.join("tag")).unwrap();
        std::fs::write(out.join("images").join("a.png"), b"png").unwrap();
        std::fs::write(out.join("index.html"), r#"<img src="./images/a.png">"#).unwrap();
        std::fs::write(out.join("notes.txt"), r#"<img src="./images/n.png">"#).unwrap();
        std::fs::write(out.join("tag").join("t.html"), r#"<img src="./images/t.png">"#).unwrap();

        assert_eq!(validate(out).unwrap(), ImageReport::Consistent);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_images_count_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        std::fs::create_dir_all(out.join("images")).unwrap();
        let real = dir.path().join("x-original.png");
        std::fs::write(&real, b"png").unwrap();
        std::os::unix::fs::symlink(&real, out.join("images").join("x.png")).unwrap();
        std::fs::write(out.join("index.html"), r#"<img src="./images/x.png">"#).unwrap();

        assert_eq!(validate(&out).unwrap(), ImageReport::Consistent);
    }

    #[test]
    fn missing_image_directory_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), r#"<img src="./images/x.png">"#).unwrap();
        assert_eq!(
            validate(dir.path()).unwrap(),
            ImageReport::Missing(set(&["x.png"]))
        );
    }
}

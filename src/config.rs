use std::path::{Path, PathBuf};

/// Where a build reads from and writes to. The layout is fixed; only the root
/// it hangs off can move.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub store_path: PathBuf,
    pub template_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Config {
    pub fn rooted(root: &Path) -> Self {
        Self {
            source_dir: root.join("md"),
            store_path: root.join("snips.db"),
            template_dir: root.join("html"),
            out_dir: root.join("output"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("md"),
            store_path: PathBuf::from("snips.db"),
            template_dir: PathBuf::from("html"),
            out_dir: PathBuf::from("output"),
        }
    }
}

use anyhow::bail;
use clap::command;
use snipgen::{config::Config, generator::generate};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // no options besides --help and --version: the directory layout is fixed
    command!().get_matches();

    let config = Config::default();
    if !config.source_dir.is_dir() {
        bail!("{:?} must be a directory.", config.source_dir);
    }
    if !config.template_dir.is_dir() {
        bail!("{:?} must be a directory.", config.template_dir);
    }
    if config.out_dir.exists() && !config.out_dir.is_dir() {
        bail!("if {:?} exists, it must be a directory.", config.out_dir);
    }

    generate(&config)
}

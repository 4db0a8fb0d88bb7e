use std::path::PathBuf;

use flatfs::{fs::config::DEFAULT_IMAGE_PATH, FsConfig};

use crate::shell::start_shell;

mod shell;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let image = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_PATH));

    start_shell(FsConfig::new(image));
}

//! CLI commands for tagvfs
//!
//! Each command opens the repository, performs one path operation and
//! prints a table (or JSON with `--json`).

pub mod admin;
pub mod error;
pub mod objects;
pub mod output;
pub mod tags;

use error::HelpfulError;
use tagvfs::{Config, TagFs, TagvfsError};

/// Open the repository described by `config`.
pub fn open_repository(config: Config) -> anyhow::Result<TagFs> {
    let repository = config.repository.clone();
    TagFs::open(config).map_err(|err| {
        HelpfulError::new(format!("Failed to open repository: {}", err))
            .with_context(format!("Repository: {}", repository.display()))
            .with_suggestion("TRY: tagvfs init")
            .into()
    })
}

/// Map a core error on `path` to a [`HelpfulError`].
pub fn at_path(path: &str) -> impl FnOnce(TagvfsError) -> anyhow::Error + '_ {
    move |err| HelpfulError::from_core(err, path).into()
}

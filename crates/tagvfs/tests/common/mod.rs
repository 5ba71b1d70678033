#![allow(dead_code)]

use tagvfs::config::{DedupMode, IntersectStrategy};
use tagvfs::{Config, TagFs};
use tempfile::TempDir;

/// A repository in a temp dir with an in-memory store. Keep the `TempDir`
/// alive for as long as the `TagFs`.
pub struct Fixture {
    pub fs: TagFs,
    pub dir: TempDir,
}

pub fn config(dir: &TempDir, strategy: IntersectStrategy, mode: DedupMode) -> Config {
    let mut config = Config::for_repository(dir.path());
    config.store.in_memory = true;
    config.store.intersect = strategy;
    config.dedup.mode = mode;
    config
}

pub fn fixture_with(strategy: IntersectStrategy, mode: DedupMode) -> Fixture {
    let dir = TempDir::new().unwrap();
    let fs = TagFs::open(config(&dir, strategy, mode)).unwrap();
    Fixture { fs, dir }
}

/// Inline dedup, automatic set builder.
pub fn fixture() -> Fixture {
    fixture_with(IntersectStrategy::Auto, DedupMode::Inline)
}

pub const STRATEGIES: [IntersectStrategy; 2] = [IntersectStrategy::Native, IntersectStrategy::Nested];

/// Create an object at `path` holding `data`; returns its inode.
pub fn put(fs: &TagFs, path: &str, data: &[u8]) -> i64 {
    fs.create(path).unwrap();
    fs.write(path, data).unwrap().inode
}

/// Names listed at `path`.
pub fn names(fs: &TagFs, path: &str) -> Vec<String> {
    fs.readdir(path)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

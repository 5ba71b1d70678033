//! Repository administration commands

use super::output::{print_json, print_table};
use super::{at_path, open_repository};
use anyhow::{Context, Result};
use std::path::Path;
use tagvfs::stats::StatsSnapshot;
use tagvfs::{Config, DedupOutcome};

/// `tagvfs init`
pub fn init(config: &Config, config_path: &Path, force: bool) -> Result<()> {
    std::fs::create_dir_all(&config.repository).with_context(|| {
        format!(
            "Failed to create repository {}",
            config.repository.display()
        )
    })?;

    if config_path.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config
            .save(config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote config to {}", config_path.display());
    }

    let fs = open_repository(config.clone())?;
    fs.shutdown();
    println!("Repository ready at {}", config.repository.display());
    println!("  store:   {}", config.database_url());
    println!("  archive: {}", config.archive_dir().display());
    Ok(())
}

/// `tagvfs config`
pub fn show_config(config: &Config, config_path: &Path, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }

    let rows = vec![
        vec![
            "config file".to_string(),
            format!(
                "{}{}",
                config_path.display(),
                if config_path.exists() { "" } else { " (defaults)" }
            ),
        ],
        vec![
            "repository".to_string(),
            config.repository.display().to_string(),
        ],
        vec!["store".to_string(), config.database_url()],
        vec![
            "store.read_only".to_string(),
            config.store.read_only.to_string(),
        ],
        vec![
            "store.intersect".to_string(),
            format!("{:?}", config.store.intersect).to_lowercase(),
        ],
        vec![
            "reasoner.enabled".to_string(),
            config.reasoner.enabled.to_string(),
        ],
        vec!["cache.enabled".to_string(), config.cache.enabled.to_string()],
        vec![
            "dedup.mode".to_string(),
            format!("{:?}", config.dedup.mode).to_lowercase(),
        ],
        vec![
            "dedup.queue_capacity".to_string(),
            config.dedup.queue_capacity.to_string(),
        ],
        vec![
            "dedup.chunk_size".to_string(),
            config.dedup.chunk_size.to_string(),
        ],
        vec![
            "archive".to_string(),
            config.archive_dir().display().to_string(),
        ],
        vec!["logs".to_string(), config.logs_dir().display().to_string()],
    ];
    print_table(&["SETTING", "VALUE"], rows);
    Ok(())
}

fn snapshot_rows(snapshot: &StatsSnapshot) -> Vec<Vec<String>> {
    StatsSnapshot::COUNTER_NAMES
        .iter()
        .map(|name| {
            vec![
                name.to_string(),
                snapshot.get(name).unwrap_or_default(),
            ]
        })
        .collect()
}

/// `tagvfs stats`
pub fn stats(config: Config, json: bool) -> Result<()> {
    let fs = open_repository(config)?;
    let snapshot = fs.stats().map_err(at_path("/stats"))?;
    if json {
        return print_json(&snapshot);
    }
    println!("Set builder: {}", fs.strategy());
    print_table(&["COUNTER", "VALUE"], snapshot_rows(&snapshot));
    Ok(())
}

pub struct DedupArgs {
    pub inode: Option<i64>,
    pub all: bool,
    pub json: bool,
}

/// `tagvfs dedup <inode> | --all`
pub fn dedup(config: Config, args: DedupArgs) -> Result<()> {
    let fs = open_repository(config)?;
    let outcomes = match (args.all, args.inode) {
        (true, _) => fs.deduplicate_all().map_err(at_path("/archive"))?,
        (false, Some(inode)) => vec![fs.deduplicate(inode)],
        (false, None) => anyhow::bail!("give an inode or --all"),
    };

    if args.json {
        return print_json(&outcomes);
    }

    let rows = outcomes
        .iter()
        .map(|outcome| {
            let (result, detail) = match outcome {
                DedupOutcome::Canonical { merged, .. } => (
                    "canonical",
                    merged
                        .iter()
                        .map(|i| i.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                DedupOutcome::Merged { canonical, .. } => ("merged", canonical.to_string()),
                DedupOutcome::Skipped { reason, .. } => ("skipped", reason.clone()),
            };
            vec![outcome.inode().to_string(), result.to_string(), detail]
        })
        .collect();
    print_table(&["INODE", "RESULT", "DETAIL"], rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_counter_gets_a_row() {
        let snapshot = StatsSnapshot {
            resolved_queries: 3,
            reasoner_cache_hits: 0,
            reasoner_cache_misses: 0,
            and_set_cache_hits: 0,
            and_set_cache_misses: 0,
            dedup_passes: 0,
            merged_objects: 0,
            dedup_queue_depth: 0,
            tags: 2,
            objects: 1,
            taggings: 2,
            relations: 0,
        };
        let rows = snapshot_rows(&snapshot);
        assert_eq!(rows.len(), StatsSnapshot::COUNTER_NAMES.len());
        assert_eq!(rows[0], vec!["resolved_queries".to_string(), "3".to_string()]);
    }
}

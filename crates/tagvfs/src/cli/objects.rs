//! Listing and object commands

use super::output::{format_inode, print_json, print_table};
use super::{at_path, open_repository};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tagvfs::engine::EntryKind;
use tagvfs::query::QueryTree;
use tagvfs::reasoner::ReasonedQuery;
use tagvfs::{Config, DedupOutcome, FileHandle, TagvfsError};

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "dir",
        EntryKind::Object => "object",
        EntryKind::Counter => "counter",
    }
}

/// `tagvfs ls <path>`
pub fn ls(config: Config, path: &str, json: bool) -> Result<()> {
    let fs = open_repository(config)?;
    let entries = fs.readdir(path).map_err(at_path(path))?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("(empty)");
        return Ok(());
    }

    let rows = entries
        .into_iter()
        .map(|entry| {
            vec![
                entry.name,
                kind_label(entry.kind).to_string(),
                format_inode(entry.inode),
            ]
        })
        .collect();
    print_table(&["NAME", "KIND", "INODE"], rows);
    Ok(())
}

#[derive(Serialize)]
struct ResolveReport<'a> {
    tree: &'a QueryTree,
    reasoned: Option<ReasonedQuery>,
    objects: Vec<FileHandle>,
}

/// `tagvfs resolve <path>`
pub fn resolve(config: Config, path: &str, json: bool) -> Result<()> {
    let fs = open_repository(config)?;
    let tree = fs.parse(path);
    let reasoned = tree.tag_query().map(|query| fs.reason(query));
    let objects = if reasoned.is_some() {
        fs.resolve(&tree).map_err(at_path(path))?
    } else {
        Vec::new()
    };

    let report = ResolveReport {
        tree: &tree,
        reasoned,
        objects,
    };
    if json {
        return print_json(&report);
    }

    let Some(reasoned) = &report.reasoned else {
        println!("{} is not a tag query", path);
        return print_json(&report.tree);
    };

    println!(
        "Reasoning: {}",
        if tree.do_reasoning() { "on" } else { "off" }
    );
    let mut rows = Vec::new();
    for (index, branch) in reasoned.branches.iter().enumerate() {
        for slot in branch {
            let related: Vec<String> = slot.related.iter().map(|t| t.to_string()).collect();
            rows.push(vec![
                (index + 1).to_string(),
                slot.term.to_string(),
                if related.is_empty() {
                    "-".to_string()
                } else {
                    related.join(", ")
                },
            ]);
        }
    }
    print_table(&["BRANCH", "TERM", "ALSO MATCHES"], rows);

    if report.objects.is_empty() {
        println!("No matching objects");
    } else {
        let rows = report
            .objects
            .iter()
            .map(|handle| vec![handle.inode.to_string(), handle.name.clone()])
            .collect();
        print_table(&["INODE", "NAME"], rows);
    }
    Ok(())
}

fn describe_outcome(outcome: &DedupOutcome) -> String {
    match outcome {
        DedupOutcome::Canonical { merged, .. } if merged.is_empty() => "unique content".to_string(),
        DedupOutcome::Canonical { merged, .. } => format!("absorbed {} duplicate(s)", merged.len()),
        DedupOutcome::Merged { canonical, .. } => {
            format!("identical to inode {}, merged into it", canonical)
        }
        DedupOutcome::Skipped { reason, .. } => format!("skipped: {}", reason),
    }
}

/// `tagvfs add <path> <file>`
pub fn add(config: Config, path: &str, file: &Path) -> Result<()> {
    let data =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let fs = open_repository(config)?;

    match fs.create(path) {
        Ok(_) | Err(TagvfsError::AlreadyExists(_)) => {}
        Err(err) => return Err(at_path(path)(err)),
    }
    let outcome = fs.write(path, &data).map_err(at_path(path))?;
    fs.flush().context("Failed to wait for deduplication")?;

    println!(
        "Stored {} bytes from {} as inode {}",
        data.len(),
        file.display(),
        outcome.inode
    );
    match &outcome.dedup {
        Some(dedup) => println!("Dedup: {}", describe_outcome(dedup)),
        None => {
            if fs.store().get_object(outcome.inode)?.is_none() {
                let canonical = fs.lookup(path).map_err(at_path(path))?;
                println!(
                    "Dedup: identical to inode {}, merged into it",
                    canonical.inode
                );
            }
        }
    }
    Ok(())
}

/// `tagvfs cat <path>`
pub fn cat(config: Config, path: &str) -> Result<()> {
    let fs = open_repository(config)?;
    let data = fs.read(path).map_err(at_path(path))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

/// `tagvfs rm <path>`
pub fn rm(config: Config, path: &str) -> Result<()> {
    let fs = open_repository(config)?;
    fs.unlink(path).map_err(at_path(path))?;
    println!("Removed {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_descriptions() {
        let unique = DedupOutcome::Canonical {
            inode: 1,
            merged: vec![],
        };
        assert_eq!(describe_outcome(&unique), "unique content");

        let merged = DedupOutcome::Merged {
            inode: 4,
            canonical: 2,
        };
        assert_eq!(
            describe_outcome(&merged),
            "identical to inode 2, merged into it"
        );
    }
}

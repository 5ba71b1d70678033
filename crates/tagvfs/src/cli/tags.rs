//! Tag and relation commands

use super::output::{print_json, print_table};
use super::{at_path, open_repository};
use anyhow::Result;
use tagvfs::query::QueryKind;
use tagvfs::Config;

fn describe(kind: &QueryKind) -> &'static str {
    match kind {
        QueryKind::Relations(_) => "relation",
        _ => "tag",
    }
}

fn or_dash(field: &str) -> String {
    if field.is_empty() {
        "-".to_string()
    } else {
        field.to_string()
    }
}

/// `tagvfs mkdir <path>`
pub fn mkdir(config: Config, path: &str) -> Result<()> {
    let fs = open_repository(config)?;
    fs.mkdir(path).map_err(at_path(path))?;
    println!("Created {} {}", describe(&fs.parse(path).kind), path);
    Ok(())
}

/// `tagvfs rmdir <path>`
pub fn rmdir(config: Config, path: &str) -> Result<()> {
    let fs = open_repository(config)?;
    fs.rmdir(path).map_err(at_path(path))?;
    println!("Removed {} {}", describe(&fs.parse(path).kind), path);
    Ok(())
}

/// `tagvfs tags <path>`
pub fn show(config: Config, path: &str, json: bool) -> Result<()> {
    let fs = open_repository(config)?;
    let tags = fs.object_tags(path).map_err(at_path(path))?;

    if json {
        return print_json(&tags);
    }
    if tags.is_empty() {
        println!("{} has no tags", path);
        return Ok(());
    }

    let rows = tags
        .iter()
        .map(|tag| {
            vec![
                tag.id.to_string(),
                tag.to_string(),
                or_dash(&tag.key),
                or_dash(&tag.value),
            ]
        })
        .collect();
    print_table(&["ID", "TAG", "KEY", "VALUE"], rows);
    Ok(())
}

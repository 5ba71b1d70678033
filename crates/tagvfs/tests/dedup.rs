mod common;

use common::{fixture, fixture_with, names, put};
use std::io::Write;
use std::path::Path;
use std::thread;
use tagvfs::config::{DedupMode, IntersectStrategy};
use tagvfs::DedupOutcome;

fn tag_names(fx: &common::Fixture, inode: i64) -> Vec<String> {
    fx.fs
        .store()
        .object_tags(inode)
        .unwrap()
        .into_iter()
        .map(|tag| tag.to_string())
        .collect()
}

#[test]
fn duplicate_merges_into_lower_inode() {
    let fx = fixture();
    let first = put(&fx.fs, "/tags/a/=/one.txt", b"same bytes");
    let first_path = fx.fs.store().require_object(first).unwrap().path;

    let second_path = fx.fs.create("/tags/b/=/two.txt").unwrap().path;
    let outcome = fx.fs.write("/tags/b/=/two.txt", b"same bytes").unwrap();
    let second = outcome.inode;

    assert_eq!(
        outcome.dedup,
        Some(DedupOutcome::Merged {
            inode: second,
            canonical: first
        })
    );
    assert!(fx.fs.store().get_object(second).unwrap().is_none());
    assert!(!Path::new(&second_path).exists());
    assert!(Path::new(&first_path).exists());

    // the canonical object carries the union of tags
    assert_eq!(tag_names(&fx, first), vec!["a", "b"]);
    assert_eq!(names(&fx.fs, "/tags/b/="), vec!["one.txt"]);

    // the old path keeps resolving to the canonical object
    assert_eq!(fx.fs.read("/tags/b/=/two.txt").unwrap(), b"same bytes");
    assert_eq!(fx.fs.stats().unwrap().merged_objects, 1);
}

#[test]
fn merge_refreshes_cached_intersections() {
    let fx = fixture();
    let first = put(&fx.fs, "/tags/t1/=/one.txt", b"x");
    put(&fx.fs, "/tags/t2/=/two.txt", b"y");
    assert!(names(&fx.fs, "/tags/t1/t2/=").is_empty());
    assert!(fx.fs.read("/tags/t1/t2/=/one.txt").is_err());

    fx.fs.write("/tags/t2/=/two.txt", b"x").unwrap();

    assert_eq!(tag_names(&fx, first), vec!["t1", "t2"]);
    assert_eq!(names(&fx.fs, "/tags/t1/t2/="), vec!["one.txt"]);
    assert_eq!(names(&fx.fs, "/tags/t2/t1/="), vec!["one.txt"]);
    assert_eq!(fx.fs.read("/tags/t1/t2/=/one.txt").unwrap(), b"x");
}

#[test]
fn distinct_content_is_left_alone() {
    let fx = fixture();
    let first = put(&fx.fs, "/tags/a/=/one.txt", b"one");
    let second = put(&fx.fs, "/tags/a/=/two.txt", b"two");

    assert!(fx.fs.store().get_object(first).unwrap().is_some());
    assert!(fx.fs.store().get_object(second).unwrap().is_some());
    assert_eq!(names(&fx.fs, "/tags/a/="), vec!["one.txt", "two.txt"]);
}

#[test]
fn lower_inode_wins_regardless_of_write_order() {
    let fx = fixture();
    let low = fx.fs.create("/tags/a/=/low.txt").unwrap().inode;
    let high = fx.fs.create("/tags/b/=/high.txt").unwrap().inode;
    assert!(low < high);

    let outcome = fx.fs.write("/tags/b/=/high.txt", b"payload").unwrap();
    assert_eq!(
        outcome.dedup,
        Some(DedupOutcome::Canonical {
            inode: high,
            merged: vec![]
        })
    );

    let outcome = fx.fs.write("/tags/a/=/low.txt", b"payload").unwrap();
    assert_eq!(
        outcome.dedup,
        Some(DedupOutcome::Canonical {
            inode: low,
            merged: vec![high]
        })
    );
    assert!(fx.fs.store().get_object(high).unwrap().is_none());
    assert_eq!(tag_names(&fx, low), vec!["a", "b"]);
}

#[test]
fn rewriting_an_object_rehashes_it() {
    let fx = fixture();
    let first = put(&fx.fs, "/tags/a/=/one.txt", b"v1");
    let second = put(&fx.fs, "/tags/a/=/two.txt", b"v2");

    let outcome = fx.fs.write("/tags/a/=/two.txt", b"v1").unwrap();
    assert_eq!(
        outcome.dedup,
        Some(DedupOutcome::Merged {
            inode: second,
            canonical: first
        })
    );
    assert_eq!(names(&fx.fs, "/tags/a/="), vec!["one.txt"]);
}

#[test]
fn deduplicate_all_skips_nothing_dirty() {
    let fx = fixture();
    let mut inodes = Vec::new();
    for (name, data) in [("a.txt", b"dup"), ("b.txt", b"dup"), ("c.txt", b"odd")] {
        let record = fx.fs.create(&format!("/archive/{}", name)).unwrap();
        let mut file = fx.fs.open_for_write(record.inode).unwrap();
        file.write_all(data).unwrap();
        inodes.push(record.inode);
    }

    let outcomes = fx.fs.deduplicate_all().unwrap();
    assert_eq!(
        outcomes,
        vec![
            DedupOutcome::Canonical {
                inode: inodes[0],
                merged: vec![]
            },
            DedupOutcome::Merged {
                inode: inodes[1],
                canonical: inodes[0]
            },
            DedupOutcome::Canonical {
                inode: inodes[2],
                merged: vec![]
            },
        ]
    );
    assert_eq!(names(&fx.fs, "/archive").len(), 2);
}

#[test]
fn missing_objects_are_skipped() {
    let fx = fixture();
    assert!(matches!(
        fx.fs.deduplicate(999),
        DedupOutcome::Skipped { inode: 999, .. }
    ));
}

#[test]
fn background_worker_merges_after_flush() {
    let fx = fixture_with(IntersectStrategy::Auto, DedupMode::Background);
    let first = put(&fx.fs, "/tags/a/=/one.txt", b"queued");

    fx.fs.create("/tags/b/=/two.txt").unwrap();
    let outcome = fx.fs.write("/tags/b/=/two.txt", b"queued").unwrap();
    assert_eq!(outcome.dedup, None);

    fx.fs.flush().unwrap();
    assert!(fx.fs.store().get_object(outcome.inode).unwrap().is_none());
    assert_eq!(tag_names(&fx, first), vec!["a", "b"]);

    let stats = fx.fs.stats().unwrap();
    assert_eq!(stats.dedup_queue_depth, 0);
    assert_eq!(stats.merged_objects, 1);
}

#[test]
fn background_writers_and_flushes_interleave() {
    let fx = fixture_with(IntersectStrategy::Auto, DedupMode::Background);
    let paths: Vec<String> = (0..4).map(|i| format!("/tags/w{}/=/blob.bin", i)).collect();
    let inodes: Vec<i64> = paths
        .iter()
        .map(|path| fx.fs.create(path).unwrap().inode)
        .collect();
    let lowest = *inodes.iter().min().unwrap();

    let fs = &fx.fs;
    thread::scope(|scope| {
        for path in &paths {
            scope.spawn(move || {
                fs.write(path, &[9u8; 2048]).unwrap();
                fs.flush().unwrap();
            });
        }
    });
    fx.fs.flush().unwrap();

    let survivors: Vec<i64> = fx
        .fs
        .store()
        .list_objects()
        .unwrap()
        .into_iter()
        .map(|record| record.inode)
        .collect();
    assert_eq!(survivors, vec![lowest]);
    assert_eq!(fx.fs.stats().unwrap().dedup_queue_depth, 0);
}

#[test]
fn writes_after_shutdown_deduplicate_inline() {
    let fx = fixture_with(IntersectStrategy::Auto, DedupMode::Background);
    let first = put(&fx.fs, "/tags/a/=/one.txt", b"late");
    fx.fs.shutdown();

    fx.fs.create("/tags/a/=/two.txt").unwrap();
    let outcome = fx.fs.write("/tags/a/=/two.txt", b"late").unwrap();
    assert_eq!(
        outcome.dedup,
        Some(DedupOutcome::Merged {
            inode: outcome.inode,
            canonical: first
        })
    );
}

#[test]
fn concurrent_writers_converge_on_lowest_inode() {
    let fx = fixture();
    let paths: Vec<String> = (0..6).map(|i| format!("/tags/t{}/=/copy.bin", i)).collect();
    let inodes: Vec<i64> = paths
        .iter()
        .map(|path| fx.fs.create(path).unwrap().inode)
        .collect();
    let lowest = *inodes.iter().min().unwrap();

    let fs = &fx.fs;
    thread::scope(|scope| {
        for path in &paths {
            scope.spawn(move || {
                fs.write(path, &[42u8; 4096]).unwrap();
            });
        }
    });

    let survivors: Vec<i64> = fx
        .fs
        .store()
        .list_objects()
        .unwrap()
        .into_iter()
        .map(|record| record.inode)
        .collect();
    assert_eq!(survivors, vec![lowest]);
    assert_eq!(tag_names(&fx, lowest).len(), 6);
}

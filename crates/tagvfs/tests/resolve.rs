mod common;

use common::{fixture, fixture_with, names, put, STRATEGIES};
use tagvfs::config::DedupMode;
use tagvfs::{EntryKind, FileHandle};

#[test]
fn and_branch_requires_every_tag() {
    for strategy in STRATEGIES {
        let fx = fixture_with(strategy, DedupMode::Inline);
        put(&fx.fs, "/tags/a/b/=/both.txt", b"both");
        put(&fx.fs, "/tags/a/=/only_a.txt", b"a");
        put(&fx.fs, "/tags/b/=/only_b.txt", b"b");

        assert_eq!(names(&fx.fs, "/tags/a/b/="), vec!["both.txt"], "{:?}", strategy);
        assert_eq!(
            names(&fx.fs, "/tags/a/="),
            vec!["both.txt", "only_a.txt"],
            "{:?}",
            strategy
        );
    }
}

#[test]
fn or_branches_union_by_inode() {
    for strategy in STRATEGIES {
        let fx = fixture_with(strategy, DedupMode::Inline);
        put(&fx.fs, "/tags/a/b/=/both.txt", b"both");
        put(&fx.fs, "/tags/a/=/only_a.txt", b"a");
        put(&fx.fs, "/tags/c/=/only_c.txt", b"c");

        assert_eq!(
            names(&fx.fs, "/tags/a/b/+/c/="),
            vec!["both.txt", "only_c.txt"]
        );
        // an object in two branches is listed once
        assert_eq!(
            names(&fx.fs, "/tags/a/+/b/="),
            vec!["both.txt", "only_a.txt"]
        );
    }
}

#[test]
fn shared_names_are_prefixed_with_inode() {
    let fx = fixture();
    let first = put(&fx.fs, "/tags/a/=/photo.jpg", b"first");
    let second = put(&fx.fs, "/tags/b/=/photo.jpg", b"second");

    let handles = fx.fs.resolve(&fx.fs.parse("/tags/a/+/b/=")).unwrap();
    assert_eq!(
        handles,
        vec![
            FileHandle::new(format!("{}___photo.jpg", first), first),
            FileHandle::new(format!("{}___photo.jpg", second), second),
        ]
    );

    let explicit = format!("/tags/a/+/b/=/{}___photo.jpg", second);
    assert_eq!(fx.fs.read(&explicit).unwrap(), b"second");
    // without a prefix the lowest inode wins
    assert_eq!(fx.fs.read("/tags/a/+/b/=/photo.jpg").unwrap(), b"first");
    // single-branch listings stay unprefixed
    assert_eq!(names(&fx.fs, "/tags/b/="), vec!["photo.jpg"]);
}

#[test]
fn triple_operators() {
    for strategy in STRATEGIES {
        let fx = fixture_with(strategy, DedupMode::Inline);
        put(&fx.fs, "/tags/geo:/city/=/rome/=/colosseum.jpg", b"c");
        put(&fx.fs, "/tags/geo:/city/=/roma_nord/=/station.jpg", b"s");
        put(&fx.fs, "/tags/geo:/city/=/milan/=/duomo.jpg", b"d");

        assert_eq!(
            names(&fx.fs, "/tags/geo:/city/=/rome/="),
            vec!["colosseum.jpg"]
        );
        assert_eq!(
            names(&fx.fs, "/tags/geo:/city/~=/rom/="),
            vec!["colosseum.jpg", "station.jpg"]
        );
        assert_eq!(
            names(&fx.fs, "/tags/geo:/city/>/n/="),
            vec!["colosseum.jpg", "station.jpg"]
        );
        assert_eq!(names(&fx.fs, "/tags/geo:/city/</n/="), vec!["duomo.jpg"]);
        // compact form
        assert_eq!(
            names(&fx.fs, "/tags/geo:city/=/milan/="),
            vec!["duomo.jpg"]
        );
    }
}

#[test]
fn triples_combine_with_flat_tags() {
    let fx = fixture();
    put(&fx.fs, "/tags/holiday/geo:/city/=/rome/=/a.jpg", b"a");
    put(&fx.fs, "/tags/geo:/city/=/rome/=/b.jpg", b"b");

    assert_eq!(
        names(&fx.fs, "/tags/holiday/geo:/city/=/rome/="),
        vec!["a.jpg"]
    );
}

#[test]
fn partial_triples_list_keys_operators_and_values() {
    let fx = fixture();
    put(&fx.fs, "/tags/geo:/city/=/rome/=/a.jpg", b"a");
    put(&fx.fs, "/tags/geo:/country/=/italy/=/b.jpg", b"b");

    assert_eq!(names(&fx.fs, "/tags/geo:"), vec!["city", "country"]);
    assert_eq!(names(&fx.fs, "/tags/geo:/city"), vec!["=", "~=", ">", "<"]);
    assert_eq!(names(&fx.fs, "/tags/geo:/city/="), vec!["rome"]);
}

#[test]
fn empty_and_unknown_queries() {
    let fx = fixture();
    put(&fx.fs, "/tags/a/=/x.txt", b"x");

    assert!(names(&fx.fs, "/tags/missing/=").is_empty());
    assert!(fx.fs.readdir("/tags/geo:/city/!!/rome/=").is_err());
    assert!(fx.fs.readdir("/nowhere").is_err());
}

#[test]
fn tag_directory_lists_tags_and_markers() {
    let fx = fixture();
    put(&fx.fs, "/tags/a/b/=/x.txt", b"x");

    assert_eq!(names(&fx.fs, "/tags"), vec!["a", "b"]);
    assert_eq!(
        names(&fx.fs, "/tags/a"),
        vec!["a", "b", "+", "@", "@@", "="]
    );
    assert_eq!(fx.fs.stat("/tags/a").unwrap(), EntryKind::Directory);
    assert!(fx.fs.stat("/tags/zzz").is_err());
}

#[test]
fn and_set_cache_serves_repeat_listings() {
    let fx = fixture();
    put(&fx.fs, "/tags/a/=/x.txt", b"x");

    names(&fx.fs, "/tags/a/@@/=");
    let before = fx.fs.stats().unwrap();
    names(&fx.fs, "/tags/a/@@/=");
    let after = fx.fs.stats().unwrap();
    assert_eq!(after.and_set_cache_hits, before.and_set_cache_hits + 1);

    // tagging another object invalidates the cached set
    put(&fx.fs, "/tags/a/=/y.txt", b"y");
    assert_eq!(names(&fx.fs, "/tags/a/@@/="), vec!["x.txt", "y.txt"]);
}

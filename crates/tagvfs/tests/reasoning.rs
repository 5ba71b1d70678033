mod common;

use common::{fixture, names, put};
use tagvfs::{TagTerm, TagvfsError};

#[test]
fn inclusion_travels_forward_only() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    put(&fx.fs, "/tags/summer/=/sun.jpg", b"sun");
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    assert_eq!(names(&fx.fs, "/tags/summer/@/="), vec!["beach.jpg", "sun.jpg"]);
    assert_eq!(names(&fx.fs, "/tags/trip2020/@/="), vec!["beach.jpg"]);
}

#[test]
fn reasoning_markers_override_the_default() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    // reasoning is on by default for a bare end marker
    assert_eq!(names(&fx.fs, "/tags/summer/="), vec!["beach.jpg"]);
    assert!(names(&fx.fs, "/tags/summer/@@/=").is_empty());
    assert_eq!(names(&fx.fs, "/tags/summer/@"), vec!["beach.jpg"]);
}

#[test]
fn equivalence_travels_both_ways() {
    let fx = fixture();
    put(&fx.fs, "/tags/car/=/red.jpg", b"red");
    put(&fx.fs, "/tags/automobile/=/blue.jpg", b"blue");
    fx.fs
        .mkdir("/relations/car/is_equivalent/automobile")
        .unwrap();

    assert_eq!(names(&fx.fs, "/tags/car/@/="), vec!["blue.jpg", "red.jpg"]);
    assert_eq!(
        names(&fx.fs, "/tags/automobile/@/="),
        vec!["blue.jpg", "red.jpg"]
    );
}

#[test]
fn expansion_is_transitive() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    fx.fs.mkdir("/relations/holiday/includes/summer").unwrap();
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    assert_eq!(
        fx.fs.expand(&TagTerm::flat("holiday")),
        vec![TagTerm::flat("summer"), TagTerm::flat("trip2020")]
    );
    assert_eq!(names(&fx.fs, "/tags/holiday/@/="), vec!["beach.jpg"]);
}

#[test]
fn cycles_terminate() {
    let fx = fixture();
    put(&fx.fs, "/tags/a/=/x.txt", b"x");
    fx.fs.mkdir("/relations/a/includes/b").unwrap();
    fx.fs.mkdir("/relations/b/includes/c").unwrap();
    fx.fs.mkdir("/relations/c/includes/a").unwrap();

    let related = fx.fs.expand(&TagTerm::flat("b"));
    assert_eq!(related, vec![TagTerm::flat("c"), TagTerm::flat("a")]);
    assert_eq!(names(&fx.fs, "/tags/c/@/="), vec!["x.txt"]);
}

#[test]
fn triple_relations() {
    let fx = fixture();
    put(&fx.fs, "/tags/geo:/city/=/rome/=/colosseum.jpg", b"c");
    fx.fs
        .mkdir("/relations/geo:/country/italy/includes/geo:/city/rome")
        .unwrap();

    assert_eq!(
        names(&fx.fs, "/tags/geo:/country/=/italy/@/="),
        vec!["colosseum.jpg"]
    );
    // comparisons are never expanded
    assert!(fx
        .fs
        .expand(&TagTerm::triple(
            "geo",
            "country",
            tagvfs::query::TagOperator::Contains,
            "ital"
        ))
        .is_empty());
}

#[test]
fn new_relations_invalidate_cached_expansions() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    put(&fx.fs, "/tags/hike/=/peak.jpg", b"peak");
    fx.fs.mkdir("/relations/holiday/includes/summer").unwrap();

    assert!(names(&fx.fs, "/tags/holiday/@/=").is_empty());

    // a relation further down the chain must reach the cached head
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();
    assert_eq!(names(&fx.fs, "/tags/holiday/@/="), vec!["beach.jpg"]);

    fx.fs.mkdir("/relations/holiday/includes/hike").unwrap();
    assert_eq!(
        names(&fx.fs, "/tags/holiday/@/="),
        vec!["beach.jpg", "peak.jpg"]
    );

    fx.fs.rmdir("/relations/summer/includes/trip2020").unwrap();
    assert_eq!(names(&fx.fs, "/tags/holiday/@/="), vec!["peak.jpg"]);
}

#[test]
fn cached_lookups_follow_relation_changes() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    assert_eq!(fx.fs.read("/tags/summer/@/=/beach.jpg").unwrap(), b"beach");
    fx.fs.rmdir("/relations/summer/includes/trip2020").unwrap();
    assert!(fx.fs.read("/tags/summer/@/=/beach.jpg").is_err());
}

#[test]
fn reasoner_cache_hits_are_counted() {
    let fx = fixture();
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    fx.fs.expand(&TagTerm::flat("summer"));
    let before = fx.fs.stats().unwrap();
    fx.fs.expand(&TagTerm::flat("summer"));
    let after = fx.fs.stats().unwrap();

    assert_eq!(after.reasoner_cache_hits, before.reasoner_cache_hits + 1);
    assert_eq!(after.reasoner_cache_misses, before.reasoner_cache_misses);
}

#[test]
fn relation_listing() {
    let fx = fixture();
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();
    fx.fs.mkdir("/relations/summer/includes/beach").unwrap();
    fx.fs.mkdir("/relations/car/is_equivalent/automobile").unwrap();

    assert_eq!(names(&fx.fs, "/relations"), vec!["car", "summer"]);
    assert_eq!(
        names(&fx.fs, "/relations/summer"),
        vec!["includes", "is_equivalent"]
    );
    assert_eq!(
        names(&fx.fs, "/relations/summer/includes"),
        vec!["beach", "trip2020"]
    );
    assert!(fx.fs.readdir("/relations/summer/includes/beach").is_ok());
    assert!(fx.fs.readdir("/relations/summer/includes/car").is_err());
    assert!(fx.fs.mkdir("/relations/summer/likes/beach").is_err());
    assert!(fx.fs.mkdir("/relations/summer/includes/summer").is_err());
    assert!(fx.fs.mkdir("/relations/summer/includes/beach").is_err());
}

#[test]
fn unlink_through_an_inferred_tag_is_rejected() {
    let fx = fixture();
    put(&fx.fs, "/tags/trip2020/=/beach.jpg", b"beach");
    fx.fs.mkdir("/relations/summer/includes/trip2020").unwrap();

    assert!(matches!(
        fx.fs.unlink("/tags/summer/@/=/beach.jpg"),
        Err(TagvfsError::InvalidOperation(_))
    ));
    assert_eq!(names(&fx.fs, "/tags/summer/@/="), vec!["beach.jpg"]);

    fx.fs.unlink("/tags/trip2020/=/beach.jpg").unwrap();
    assert!(names(&fx.fs, "/tags/summer/@/=").is_empty());
}

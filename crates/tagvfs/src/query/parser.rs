//! Path parser.
//!
//! Turns a slash-separated path into a [`QueryTree`]. Parsing never fails:
//! anything that cannot be understood becomes [`QueryKind::Malformed`],
//! which every operation reports as "not found".
//!
//! ```text
//! /tags/<term>[/+/<term>]*[/@|/@@][/=]/<object-path>
//! /tags/<ns>:/<key>/<op>/<value>/...
//! /archive/<object-path>
//! /relations[/<tag>[/<kind>[/<tag>]]]
//! /stats[/<counter>]
//! ```

use super::term::{TagOperator, TagTerm};
use serde::Serialize;

/// Joins an explicit inode to an object name, and disambiguates listings.
pub const INODE_DELIMITER: &str = "___";

pub const ROOT_TAGS: &str = "tags";
pub const ROOT_ARCHIVE: &str = "archive";
pub const ROOT_RELATIONS: &str = "relations";
pub const ROOT_STATS: &str = "stats";

pub const OR_MARKER: &str = "+";
pub const REASONING_MARKER: &str = "@";
pub const NO_REASONING_MARKER: &str = "@@";
pub const END_MARKER: &str = "=";

/// A triple the path stopped in the middle of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialTriple {
    pub namespace: String,
    pub key: Option<String>,
    pub operator: Option<TagOperator>,
}

/// Parsed `/tags` path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagQuery {
    /// OR-branches, each an AND-list of terms. Empty branches are dropped.
    pub branches: Vec<Vec<TagTerm>>,
    /// The end marker was reached.
    pub complete: bool,
    pub do_reasoning: bool,
    /// Segments after the end marker, joined with `/`.
    pub object_path: String,
    pub partial: Option<PartialTriple>,
}

/// Parsed `/relations` path. Each part is present only if the path reaches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationPath {
    pub source: Option<TagTerm>,
    /// Unvalidated; checked where relations are created or used.
    pub kind: Option<String>,
    pub target: Option<TagTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum QueryKind {
    Root,
    Tags(TagQuery),
    Archive { object_path: String },
    Relations(RelationPath),
    Stats { counter: Option<String> },
    Malformed { reason: String },
}

/// A parsed path. Owned by the operation that parsed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTree {
    pub path: String,
    pub kind: QueryKind,
}

/// Parse `path`. A bare `=` end marker applies `default_reasoning`.
pub fn parse(path: &str, default_reasoning: bool) -> QueryTree {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let kind = match segments.split_first() {
        None => QueryKind::Root,
        Some((&ROOT_TAGS, rest)) => parse_tags(rest, default_reasoning),
        Some((&ROOT_ARCHIVE, rest)) => QueryKind::Archive {
            object_path: rest.join("/"),
        },
        Some((&ROOT_RELATIONS, rest)) => parse_relations(rest),
        Some((&ROOT_STATS, rest)) => match rest {
            [] => QueryKind::Stats { counter: None },
            [counter] => QueryKind::Stats {
                counter: Some((*counter).to_string()),
            },
            _ => malformed("stats paths take at most one counter"),
        },
        Some((other, _)) => malformed(format!("unknown root '{}'", other)),
    };

    QueryTree {
        path: path.to_string(),
        kind,
    }
}

fn malformed(reason: impl Into<String>) -> QueryKind {
    QueryKind::Malformed {
        reason: reason.into(),
    }
}

/// Outcome of reading a structured term starting at some segment.
enum TripleScan {
    Done(TagTerm, usize),
    Partial(PartialTriple),
    BadOperator(String),
}

/// Read `ns:/key/op/value` or the compact `ns:key/op/value`.
/// Relation endpoints have no operator segment.
fn scan_triple(segments: &[&str], with_operator: bool) -> Option<TripleScan> {
    let first = *segments.first()?;
    let colon = first.find(':')?;

    let (namespace, key, mut used) = if colon + 1 == first.len() {
        (first.to_string(), segments.get(1).map(|s| s.to_string()), 2)
    } else {
        (
            first[..=colon].to_string(),
            Some(first[colon + 1..].to_string()),
            1,
        )
    };

    let Some(key) = key else {
        return Some(TripleScan::Partial(PartialTriple {
            namespace,
            key: None,
            operator: None,
        }));
    };

    let operator = if with_operator {
        let Some(token) = segments.get(used) else {
            return Some(TripleScan::Partial(PartialTriple {
                namespace,
                key: Some(key),
                operator: None,
            }));
        };
        used += 1;
        match TagOperator::parse(token) {
            Some(op) => op,
            None => return Some(TripleScan::BadOperator((*token).to_string())),
        }
    } else {
        TagOperator::Equal
    };

    match segments.get(used) {
        Some(value) => Some(TripleScan::Done(
            TagTerm::triple(namespace, key, operator, *value),
            used + 1,
        )),
        None => Some(TripleScan::Partial(PartialTriple {
            namespace,
            key: Some(key),
            operator: Some(operator),
        })),
    }
}

fn parse_tags(segments: &[&str], default_reasoning: bool) -> QueryKind {
    let mut query = TagQuery {
        branches: vec![Vec::new()],
        do_reasoning: default_reasoning,
        ..TagQuery::default()
    };

    let mut i = 0;
    while i < segments.len() {
        let segment = segments[i];
        match segment {
            OR_MARKER => {
                if query.branches.last().is_some_and(|b| !b.is_empty()) {
                    query.branches.push(Vec::new());
                }
                i += 1;
            }
            REASONING_MARKER | NO_REASONING_MARKER => {
                query.do_reasoning = segment == REASONING_MARKER;
                query.complete = true;
                i += 1;
                if segments.get(i) == Some(&END_MARKER) {
                    i += 1;
                }
                break;
            }
            END_MARKER => {
                query.complete = true;
                i += 1;
                break;
            }
            _ => match scan_triple(&segments[i..], true) {
                Some(TripleScan::Done(term, used)) => {
                    push_term(&mut query, term);
                    i += used;
                }
                Some(TripleScan::Partial(partial)) => {
                    query.partial = Some(partial);
                    i = segments.len();
                }
                Some(TripleScan::BadOperator(op)) => {
                    return malformed(format!("unknown operator '{}'", op));
                }
                None => {
                    push_term(&mut query, TagTerm::flat(segment));
                    i += 1;
                }
            },
        }
    }

    query.object_path = segments[i.min(segments.len())..].join("/");
    query.branches.retain(|branch| !branch.is_empty());
    QueryKind::Tags(query)
}

fn push_term(query: &mut TagQuery, term: TagTerm) {
    if let Some(branch) = query.branches.last_mut() {
        branch.push(term);
    }
}

fn parse_relations(segments: &[&str]) -> QueryKind {
    let mut relation = RelationPath::default();
    let mut i = 0;

    match scan_endpoint(&segments[i..]) {
        Ok(Some((term, used))) => {
            relation.source = Some(term);
            i += used;
        }
        Ok(None) => return QueryKind::Relations(relation),
        Err(reason) => return malformed(reason),
    }

    match segments.get(i) {
        Some(kind) => {
            relation.kind = Some((*kind).to_string());
            i += 1;
        }
        None => return QueryKind::Relations(relation),
    }

    match scan_endpoint(&segments[i..]) {
        Ok(Some((term, used))) => {
            relation.target = Some(term);
            i += used;
        }
        Ok(None) => return QueryKind::Relations(relation),
        Err(reason) => return malformed(reason),
    }

    if i < segments.len() {
        return malformed("trailing segments after relation target");
    }
    QueryKind::Relations(relation)
}

fn scan_endpoint(segments: &[&str]) -> Result<Option<(TagTerm, usize)>, String> {
    let Some(first) = segments.first() else {
        return Ok(None);
    };
    match scan_triple(segments, false) {
        Some(TripleScan::Done(term, used)) => Ok(Some((term, used))),
        Some(TripleScan::Partial(partial)) => Err(format!(
            "incomplete relation endpoint in namespace '{}'",
            partial.namespace
        )),
        Some(TripleScan::BadOperator(op)) => Err(format!("unknown operator '{}'", op)),
        None => Ok(Some((TagTerm::flat(*first), 1))),
    }
}

/// Split `<inode>___<name>` into its parts. Names without a numeric prefix
/// come back unchanged.
pub fn split_inode_prefix(name: &str) -> (Option<i64>, &str) {
    if let Some((prefix, rest)) = name.split_once(INODE_DELIMITER) {
        if let Ok(inode) = prefix.parse::<i64>() {
            if inode > 0 && !rest.is_empty() {
                return (Some(inode), rest);
            }
        }
    }
    (None, name)
}

pub fn with_inode_prefix(inode: i64, name: &str) -> String {
    format!("{}{}{}", inode, INODE_DELIMITER, name)
}

impl QueryTree {
    pub fn tag_query(&self) -> Option<&TagQuery> {
        match &self.kind {
            QueryKind::Tags(query) => Some(query),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, QueryKind::Malformed { .. })
    }

    /// The path reached an object context: past the end marker of a tag
    /// query, or anywhere under `/archive`.
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            QueryKind::Tags(query) => query.complete,
            QueryKind::Archive { .. } => true,
            _ => false,
        }
    }

    pub fn object_path(&self) -> &str {
        match &self.kind {
            QueryKind::Tags(query) => &query.object_path,
            QueryKind::Archive { object_path } => object_path,
            _ => "",
        }
    }

    pub fn points_to_object(&self) -> bool {
        self.is_complete() && !self.object_path().is_empty()
    }

    /// A complete tag query whose object path is a single name: objects
    /// created or linked here receive the query's tags directly.
    pub fn is_taggable(&self) -> bool {
        match &self.kind {
            QueryKind::Tags(query) => {
                query.complete
                    && !query.branches.is_empty()
                    && !query.object_path.is_empty()
                    && !query.object_path.contains('/')
            }
            _ => false,
        }
    }

    /// Final object path segment with any inode prefix stripped.
    pub fn object_name(&self) -> Option<&str> {
        let last = self.object_path().rsplit('/').next()?;
        if last.is_empty() {
            return None;
        }
        Some(split_inode_prefix(last).1)
    }

    pub fn object_inode(&self) -> Option<i64> {
        let last = self.object_path().rsplit('/').next()?;
        split_inode_prefix(last).0
    }

    /// Final term of the last branch.
    pub fn last_tag(&self) -> Option<&TagTerm> {
        self.tag_query()?.branches.last()?.last()
    }

    pub fn do_reasoning(&self) -> bool {
        self.tag_query().is_some_and(|query| query.do_reasoning)
    }
}

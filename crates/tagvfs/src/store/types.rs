//! Records read from the tagging store.

use crate::error::TagvfsError;
use crate::query::{TagOperator, TagTerm};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A stored tag. Flat tags have empty `key` and `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn is_triple(&self) -> bool {
        self.name.ends_with(':')
    }

    /// The equality term naming exactly this tag.
    pub fn term(&self) -> TagTerm {
        if self.is_triple() {
            TagTerm::triple(&self.name, &self.key, TagOperator::Equal, &self.value)
        } else {
            TagTerm::flat(&self.name)
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term())
    }
}

/// Catalogue entry for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub inode: i64,
    pub name: String,
    /// Backing file, absolute.
    pub path: String,
    /// Hex digest; empty while the content is dirty.
    pub checksum: String,
}

impl ObjectRecord {
    pub fn is_dirty(&self) -> bool {
        self.checksum.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Includes,
    IsEquivalent,
}

impl RelationKind {
    pub const ALL: [RelationKind; 2] = [RelationKind::Includes, RelationKind::IsEquivalent];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Includes => "includes",
            RelationKind::IsEquivalent => "is_equivalent",
        }
    }
}

impl FromStr for RelationKind {
    type Err = TagvfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "includes" => Ok(RelationKind::Includes),
            "is_equivalent" => Ok(RelationKind::IsEquivalent),
            other => Err(TagvfsError::UnknownRelation(other.to_string())),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge `source -[kind]-> target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub id: i64,
    pub source: Tag,
    pub kind: RelationKind,
    pub target: Tag,
}

/// One entry of a resolved listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileHandle {
    pub name: String,
    pub inode: i64,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, inode: i64) -> Self {
        Self {
            name: name.into(),
            inode,
        }
    }
}

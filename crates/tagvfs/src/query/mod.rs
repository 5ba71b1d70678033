//! Query paths: terms and the parser that builds query trees from paths.

mod parser;
mod term;

pub use parser::{
    parse, split_inode_prefix, with_inode_prefix, PartialTriple, QueryKind, QueryTree,
    RelationPath, TagQuery, END_MARKER, INODE_DELIMITER, NO_REASONING_MARKER, OR_MARKER,
    REASONING_MARKER, ROOT_ARCHIVE, ROOT_RELATIONS, ROOT_STATS, ROOT_TAGS,
};
pub use term::{TagOperator, TagTerm};

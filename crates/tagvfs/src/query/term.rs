//! Tag terms, the atoms of a query.

use serde::Serialize;
use std::fmt;

/// Comparison applied to the value of a structured tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOperator {
    Equal,
    Contains,
    Greater,
    Less,
}

impl TagOperator {
    pub const ALL: [TagOperator; 4] = [
        TagOperator::Equal,
        TagOperator::Contains,
        TagOperator::Greater,
        TagOperator::Less,
    ];

    /// Accepts both the symbol and the word form of an operator.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" | "eq" => Some(TagOperator::Equal),
            "~=" | "inc" => Some(TagOperator::Contains),
            ">" | "gt" => Some(TagOperator::Greater),
            "<" | "lt" => Some(TagOperator::Less),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TagOperator::Equal => "=",
            TagOperator::Contains => "~=",
            TagOperator::Greater => ">",
            TagOperator::Less => "<",
        }
    }
}

/// One AND-term of a query branch.
///
/// Structured namespaces keep their trailing `:` (`geo:`), which is also how
/// they are stored in the `tagname` column; flat names never end with `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagTerm {
    Flat {
        name: String,
    },
    Triple {
        namespace: String,
        key: String,
        operator: TagOperator,
        value: String,
    },
}

impl TagTerm {
    pub fn flat(name: impl Into<String>) -> Self {
        TagTerm::Flat { name: name.into() }
    }

    pub fn triple(
        namespace: impl Into<String>,
        key: impl Into<String>,
        operator: TagOperator,
        value: impl Into<String>,
    ) -> Self {
        let mut namespace = namespace.into();
        if !namespace.ends_with(':') {
            namespace.push(':');
        }
        TagTerm::Triple {
            namespace,
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    /// Value of the `tagname` column this term matches.
    pub fn name(&self) -> &str {
        match self {
            TagTerm::Flat { name } => name,
            TagTerm::Triple { namespace, .. } => namespace,
        }
    }

    /// `(tagname, tag_key, tag_value)` as stored for an equality term.
    pub fn stored_columns(&self) -> (&str, &str, &str) {
        match self {
            TagTerm::Flat { name } => (name, "", ""),
            TagTerm::Triple {
                namespace,
                key,
                value,
                ..
            } => (namespace, key, value),
        }
    }

    /// Whether the term names exactly one stored tag.
    pub fn is_equality(&self) -> bool {
        match self {
            TagTerm::Flat { .. } => true,
            TagTerm::Triple { operator, .. } => *operator == TagOperator::Equal,
        }
    }

    /// Key under which reasoner expansions of this term are cached.
    pub fn cache_key(&self) -> String {
        match self {
            TagTerm::Flat { name } => name.clone(),
            TagTerm::Triple {
                namespace,
                key,
                value,
                ..
            } => format!("{}/{}/{}", namespace, key, value),
        }
    }
}

impl fmt::Display for TagTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagTerm::Flat { name } => write!(f, "{}", name),
            TagTerm::Triple {
                namespace,
                key,
                operator,
                value,
            } => write!(f, "{}{}{}{}", namespace, key, operator.symbol(), value),
        }
    }
}

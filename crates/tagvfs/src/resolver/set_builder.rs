//! SQL for one OR-branch: the objects matching every AND slot.
//!
//! Two strategies produce the same set. [`NativeIntersect`] emits one
//! subquery per slot joined with `INTERSECT`; [`NestedSubquery`] chains
//! `inode IN (...)` membership tests for dialects without it.

use crate::config::IntersectStrategy;
use crate::query::{TagOperator, TagTerm};
use crate::reasoner::TermAlternatives;
use tagvfs_db::{Capabilities, DbValue};

/// Statement and positional parameters. Selects `(inode, objectname)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchQuery {
    pub sql: String,
    pub params: Vec<DbValue>,
}

pub trait SetBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    /// `slots` must not be empty.
    fn branch_query(&self, slots: &[TermAlternatives]) -> BranchQuery;
}

/// Pick the strategy once, from configuration and backend capability.
pub fn select_builder(strategy: IntersectStrategy, caps: Capabilities) -> Box<dyn SetBuilder> {
    match strategy {
        IntersectStrategy::Native => Box::new(NativeIntersect),
        IntersectStrategy::Nested => Box::new(NestedSubquery),
        IntersectStrategy::Auto if caps.native_intersect => Box::new(NativeIntersect),
        IntersectStrategy::Auto => Box::new(NestedSubquery),
    }
}

fn term_condition(alias: &str, term: &TagTerm, params: &mut Vec<DbValue>) -> String {
    match term {
        TagTerm::Flat { name } => {
            params.push(name.as_str().into());
            format!("{}.tagname = ?", alias)
        }
        TagTerm::Triple {
            namespace,
            key,
            operator,
            value,
        } => {
            params.push(namespace.as_str().into());
            params.push(key.as_str().into());
            params.push(value.as_str().into());
            // values are text; ordering operators compare lexically
            let value_cond = match operator {
                TagOperator::Equal => format!("{}.tag_value = ?", alias),
                TagOperator::Contains => format!("instr({}.tag_value, ?) > 0", alias),
                TagOperator::Greater => format!("{}.tag_value > ?", alias),
                TagOperator::Less => format!("{}.tag_value < ?", alias),
            };
            format!(
                "({a}.tagname = ? AND {a}.tag_key = ? AND {v})",
                a = alias,
                v = value_cond
            )
        }
    }
}

/// `(term OR alternative OR ...)` for one AND slot.
fn slot_condition(alias: &str, slot: &TermAlternatives, params: &mut Vec<DbValue>) -> String {
    let parts: Vec<String> = slot
        .iter()
        .map(|term| term_condition(alias, term, params))
        .collect();
    format!("({})", parts.join(" OR "))
}

pub struct NativeIntersect;

impl SetBuilder for NativeIntersect {
    fn name(&self) -> &'static str {
        "native_intersect"
    }

    fn branch_query(&self, slots: &[TermAlternatives]) -> BranchQuery {
        let mut params = Vec::new();
        let parts: Vec<String> = slots
            .iter()
            .map(|slot| {
                format!(
                    "SELECT DISTINCT o.inode, o.objectname FROM objects o \
                     JOIN tagging tg ON tg.inode = o.inode \
                     JOIN tags t ON t.tag_id = tg.tag_id \
                     WHERE {}",
                    slot_condition("t", slot, &mut params)
                )
            })
            .collect();
        BranchQuery {
            sql: parts.join(" INTERSECT "),
            params,
        }
    }
}

pub struct NestedSubquery;

impl SetBuilder for NestedSubquery {
    fn name(&self) -> &'static str {
        "nested_subquery"
    }

    fn branch_query(&self, slots: &[TermAlternatives]) -> BranchQuery {
        let mut params = Vec::new();
        let mut sql = String::from(
            "SELECT DISTINCT o.inode, o.objectname FROM objects o WHERE o.inode IN (",
        );
        for (i, slot) in slots.iter().enumerate() {
            let n = i + 1;
            if i > 0 {
                sql.push_str(" AND ");
                sql.push_str(&format!("tg{}.inode IN (", i));
            }
            sql.push_str(&format!(
                "SELECT tg{n}.inode FROM tagging tg{n} \
                 JOIN tags t{n} ON t{n}.tag_id = tg{n}.tag_id WHERE {cond}",
                n = n,
                cond = slot_condition(&format!("t{}", n), slot, &mut params)
            ));
        }
        sql.push_str(&")".repeat(slots.len()));
        BranchQuery { sql, params }
    }
}

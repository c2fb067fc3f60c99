//! The boolean expression tree.

use std::{
    collections::BTreeSet,
    fmt,
    ops::{BitAnd, BitOr},
    sync::Arc,
};

use super::{FieldRef, Literal};

/// Comparison operator used by expression leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// Equals (`=`).
    Equal,
    /// Not equals (`!=`).
    NotEqual,
    /// Less than (`<`).
    LessThan,
    /// Less than or equal to (`<=`).
    LessThanOrEqual,
    /// Greater than (`>`).
    GreaterThan,
    /// Greater than or equal to (`>=`).
    GreaterThanOrEqual,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        })
    }
}

/// Immutable boolean filter expression over typed fields.
///
/// Leaves are built by the [`FieldRef`] comparison/membership constructors
/// (which type-check their literal at construction time); branches are built
/// with [`Expr::and`]/[`Expr::or`] or the `&`/`|` operators. Rust gives `&`
/// higher precedence than `|`, so `a | b & c` builds `a | (b & c)` — nesting
/// encodes precedence directly in the tree shape.
///
/// Trees are plain value trees: each branch exclusively owns its two
/// children, there are no back-references, and a built tree is never
/// mutated, so sharing across threads is safe.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Column-vs-literal comparison.
    Compare {
        /// Column under test.
        field: FieldRef,
        /// Comparison operator.
        op: ComparisonOp,
        /// Literal, type-checked against the field at construction.
        literal: Literal,
    },
    /// Membership test against a finite literal list.
    ///
    /// An empty list is legal and matches no row.
    InList {
        /// Column under test.
        field: FieldRef,
        /// Literal candidates, in caller order.
        list: Vec<Literal>,
    },
    /// Conjunction of exactly two sub-expressions.
    And(Box<Expr>, Box<Expr>),
    /// Disjunction of exactly two sub-expressions.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Combines two expressions with a logical AND.
    #[must_use]
    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    /// Combines two expressions with a logical OR.
    #[must_use]
    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    /// True for comparison/membership nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Compare { .. } | Expr::InList { .. })
    }

    /// Collects the names of all columns referenced by the tree.
    pub(crate) fn collect_columns(&self, out: &mut BTreeSet<Arc<str>>) {
        match self {
            Expr::Compare { field, .. } | Expr::InList { field, .. } => {
                out.insert(field.name_arc());
            }
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

fn fmt_child(child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if child.is_leaf() {
        write!(f, "{child}")
    } else {
        write!(f, "({child})")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { field, op, literal } => {
                write!(f, "{} {op} {literal}", field.name())
            }
            Expr::InList { field, list } => {
                write!(f, "{} IN (", field.name())?;
                for (i, literal) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{literal}")?;
                }
                write!(f, ")")
            }
            Expr::And(left, right) => {
                fmt_child(left, f)?;
                write!(f, " AND ")?;
                fmt_child(right, f)
            }
            Expr::Or(left, right) => {
                fmt_child(left, f)?;
                write!(f, " OR ")?;
                fmt_child(right, f)
            }
        }
    }
}

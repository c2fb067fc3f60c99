//! Partitioned-store target: compiles expression trees into plans for a
//! wide-column store whose native query language only supports conjunctions
//! over partition-key, clustering-key, and indexed columns.
//!
//! The compiler rewrites the tree into disjunctive normal form, then splits
//! each conjunctive clause into a native predicate (pushed to the store) and
//! an optional residual predicate (evaluated client-side on that clause's
//! rows). Disjunction therefore becomes a set of independent queries whose
//! results are unioned, de-duplicated by primary key.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    error::CompileError,
    expr::{ComparisonOp, Expr, Literal},
};

/// Largest literal list a single native `IN` condition may carry.
///
/// Longer lists are split across clauses so no single store query trips the
/// backend's in-select cartesian-product limit.
pub const MAX_IN_LIST_LEN: usize = 25;

/// Upper bound on the number of store queries one expression may expand to.
pub const MAX_DNF_CLAUSES: usize = 256;

/// Key and index layout of the target table.
///
/// Order matters: partition and clustering keys are recorded in declaration
/// order and together form the primary key used for result de-duplication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeySpec {
    partition_keys: Vec<Arc<str>>,
    clustering_keys: Vec<Arc<str>>,
    indexed: Vec<Arc<str>>,
    allow_indexed_scan: bool,
}

impl KeySpec {
    /// Creates an empty key layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a partition-key column.
    #[must_use]
    pub fn partition_key<N>(mut self, name: N) -> Self
    where
        N: Into<Arc<str>>,
    {
        self.partition_keys.push(name.into());
        self
    }

    /// Appends a clustering-key column.
    #[must_use]
    pub fn clustering_key<N>(mut self, name: N) -> Self
    where
        N: Into<Arc<str>>,
    {
        self.clustering_keys.push(name.into());
        self
    }

    /// Registers a secondary-indexed column.
    #[must_use]
    pub fn indexed<N>(mut self, name: N) -> Self
    where
        N: Into<Arc<str>>,
    {
        self.indexed.push(name.into());
        self
    }

    /// Permits native predicates on indexed columns.
    ///
    /// Stores treat index-anchored scans as potentially expensive and demand
    /// an explicit opt-in; without it, tests on indexed columns are held
    /// back as client-side residuals like any other non-key column.
    #[must_use]
    pub fn allow_indexed_scan(mut self, allow: bool) -> Self {
        self.allow_indexed_scan = allow;
        self
    }

    /// Primary-key columns: partition keys followed by clustering keys.
    #[must_use]
    pub fn primary_key(&self) -> Vec<Arc<str>> {
        self.partition_keys
            .iter()
            .chain(self.clustering_keys.iter())
            .cloned()
            .collect()
    }

    fn is_partition_key(&self, name: &str) -> bool {
        self.partition_keys.iter().any(|key| key.as_ref() == name)
    }

    fn is_clustering_key(&self, name: &str) -> bool {
        self.clustering_keys.iter().any(|key| key.as_ref() == name)
    }

    fn is_scannable_index(&self, name: &str) -> bool {
        self.allow_indexed_scan && self.indexed.iter().any(|key| key.as_ref() == name)
    }
}

/// Partitioned-store compilation target.
#[derive(Clone, Debug)]
pub struct StoreTarget {
    key_spec: KeySpec,
}

/// Native condition payload: a comparison or a membership list.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionOp {
    /// Column-vs-literal comparison the store evaluates natively.
    Compare(ComparisonOp, Literal),
    /// Native `IN` over a literal list.
    In(Vec<Literal>),
}

/// One column test inside a native predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnCondition {
    /// Column under test.
    pub column: Arc<str>,
    /// Test the store applies.
    pub op: ConditionOp,
}

impl fmt::Display for ColumnCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            ConditionOp::Compare(op, literal) => write!(f, "{} {op} {literal}", self.column),
            ConditionOp::In(list) => {
                write!(f, "{} IN (", self.column)?;
                for (i, literal) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{literal}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Conjunction of column conditions the store can evaluate in one query.
#[derive(Clone, Debug, PartialEq)]
pub struct NativePredicate {
    conditions: Vec<ColumnCondition>,
}

impl NativePredicate {
    /// Column conditions, in clause order.
    #[must_use]
    pub fn conditions(&self) -> &[ColumnCondition] {
        &self.conditions
    }
}

impl fmt::Display for NativePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

/// Compiled form of one conjunctive clause.
///
/// Callers must handle both shapes: a clause is either fully pushed down or
/// pushed down with a client-side remainder. (The third possible outcome, an
/// unscannable clause, fails the whole compile instead.)
#[derive(Clone, Debug)]
pub enum ClausePlan {
    /// Every condition of the clause is evaluated by the store.
    Native(NativePredicate),
    /// Indexed-only conditions are pushed down; the residual must be applied
    /// client-side to this clause's rows only.
    NativeWithResidual {
        /// Store-side conjunction.
        native: NativePredicate,
        /// Remainder to evaluate on the fetched rows.
        residual: Expr,
    },
}

impl ClausePlan {
    /// Store-side predicate of the clause.
    #[must_use]
    pub fn native(&self) -> &NativePredicate {
        match self {
            ClausePlan::Native(native) => native,
            ClausePlan::NativeWithResidual { native, .. } => native,
        }
    }

    /// Client-side remainder, when the clause has one.
    #[must_use]
    pub fn residual(&self) -> Option<&Expr> {
        match self {
            ClausePlan::Native(_) => None,
            ClausePlan::NativeWithResidual { residual, .. } => Some(residual),
        }
    }
}

/// Compiled store plan: one independent query per clause.
///
/// Executing the plan means issuing each clause's native predicate (in any
/// order, possibly concurrently), applying each clause's residual to its own
/// result rows, then unioning with de-duplication on the primary key. See
/// [`StorePlan::execute_with`](crate::exec) for the in-process runner.
#[derive(Clone, Debug)]
pub struct StorePlan {
    clauses: Vec<ClausePlan>,
    primary_key: Vec<Arc<str>>,
}

impl StorePlan {
    /// Clause plans, in normalization order.
    #[must_use]
    pub fn clauses(&self) -> &[ClausePlan] {
        &self.clauses
    }

    /// Columns used to de-duplicate the unioned result rows.
    #[must_use]
    pub fn primary_key(&self) -> &[Arc<str>] {
        &self.primary_key
    }
}

impl StoreTarget {
    /// Creates a target from the table's key layout.
    #[must_use]
    pub fn new(key_spec: KeySpec) -> Self {
        Self { key_spec }
    }

    /// Key layout this target compiles against.
    #[must_use]
    pub fn key_spec(&self) -> &KeySpec {
        &self.key_spec
    }

    /// Compiles an expression tree into a store plan.
    ///
    /// Fails with [`CompileError::UnscannableClause`] when any clause lacks
    /// a native anchor, and with [`CompileError::ClauseLimitExceeded`] when
    /// normalization fans out past [`MAX_DNF_CLAUSES`]. No partial plan is
    /// ever returned.
    pub fn compile(&self, expr: &Expr) -> Result<StorePlan, CompileError> {
        let clauses = to_dnf(expr);
        if clauses.len() > MAX_DNF_CLAUSES {
            return Err(CompileError::ClauseLimitExceeded {
                limit: MAX_DNF_CLAUSES,
            });
        }

        let mut plans = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let plan = self.split_clause(clause)?;
            plans.extend(chunk_in_lists(plan));
        }
        if plans.len() > MAX_DNF_CLAUSES {
            return Err(CompileError::ClauseLimitExceeded {
                limit: MAX_DNF_CLAUSES,
            });
        }

        debug!(
            clauses = plans.len(),
            residuals = plans.iter().filter(|p| p.residual().is_some()).count(),
            "compiled store plan"
        );
        Ok(StorePlan {
            clauses: plans,
            primary_key: self.key_spec.primary_key(),
        })
    }

    /// Splits one conjunctive clause into native and residual halves.
    fn split_clause(&self, leaves: Vec<Expr>) -> Result<ClausePlan, CompileError> {
        let keys = &self.key_spec;
        let mut native = Vec::new();
        let mut residual: Vec<Expr> = Vec::new();

        for leaf in leaves {
            match &leaf {
                Expr::Compare { field, op, literal } => {
                    let name = field.name();
                    let native_ok = match op {
                        ComparisonOp::Equal => {
                            keys.is_partition_key(name)
                                || keys.is_clustering_key(name)
                                || keys.is_scannable_index(name)
                        }
                        ComparisonOp::LessThan
                        | ComparisonOp::LessThanOrEqual
                        | ComparisonOp::GreaterThan
                        | ComparisonOp::GreaterThanOrEqual => {
                            keys.is_clustering_key(name) || keys.is_scannable_index(name)
                        }
                        // The store has no native inequality test.
                        ComparisonOp::NotEqual => false,
                    };
                    if native_ok {
                        native.push(ColumnCondition {
                            column: field.name_arc(),
                            op: ConditionOp::Compare(*op, literal.clone()),
                        });
                    } else {
                        residual.push(leaf);
                    }
                }
                Expr::InList { field, list } => {
                    let name = field.name();
                    if keys.is_partition_key(name) || keys.is_scannable_index(name) {
                        native.push(ColumnCondition {
                            column: field.name_arc(),
                            op: ConditionOp::In(list.clone()),
                        });
                    } else {
                        residual.push(leaf);
                    }
                }
                Expr::And(..) | Expr::Or(..) => {
                    unreachable!("DNF clauses contain only leaves")
                }
            }
        }

        if native.is_empty() {
            let clause = residual
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" AND ");
            return Err(CompileError::UnscannableClause { clause });
        }

        let native = NativePredicate { conditions: native };
        match residual.into_iter().reduce(Expr::and) {
            None => Ok(ClausePlan::Native(native)),
            Some(residual) => Ok(ClausePlan::NativeWithResidual { native, residual }),
        }
    }
}

/// Rewrites the tree into disjunctive normal form.
///
/// `Or` concatenates clause lists; `And` takes their pairwise product — the
/// same decomposition the store's clause-list query interface expects.
fn to_dnf(expr: &Expr) -> Vec<Vec<Expr>> {
    match expr {
        Expr::And(left, right) => {
            let left = to_dnf(left);
            let right = to_dnf(right);
            let mut out = Vec::with_capacity(left.len() * right.len());
            for lhs in &left {
                for rhs in &right {
                    let mut clause = lhs.clone();
                    clause.extend(rhs.iter().cloned());
                    out.push(clause);
                }
            }
            out
        }
        Expr::Or(left, right) => {
            let mut out = to_dnf(left);
            out.extend(to_dnf(right));
            out
        }
        leaf => vec![vec![leaf.clone()]],
    }
}

/// Splits oversized native `IN` lists into separate clauses.
///
/// Each chunked clause carries a copy of the other conditions and of the
/// residual; the union semantics of the plan make the split transparent.
fn chunk_in_lists(plan: ClausePlan) -> Vec<ClausePlan> {
    let needs_split = plan
        .native()
        .conditions()
        .iter()
        .any(|condition| matches!(&condition.op, ConditionOp::In(list) if list.len() > MAX_IN_LIST_LEN));
    if !needs_split {
        return vec![plan];
    }

    let (native, residual) = match plan {
        ClausePlan::Native(native) => (native, None),
        ClausePlan::NativeWithResidual { native, residual } => (native, Some(residual)),
    };

    // Cartesian expansion over every oversized list in the clause.
    let mut variants: Vec<Vec<ColumnCondition>> = vec![Vec::new()];
    for condition in native.conditions {
        match &condition.op {
            ConditionOp::In(list) if list.len() > MAX_IN_LIST_LEN => {
                let mut next = Vec::with_capacity(variants.len() * list.len().div_ceil(MAX_IN_LIST_LEN));
                for chunk in list.chunks(MAX_IN_LIST_LEN) {
                    for variant in &variants {
                        let mut conditions = variant.clone();
                        conditions.push(ColumnCondition {
                            column: Arc::clone(&condition.column),
                            op: ConditionOp::In(chunk.to_vec()),
                        });
                        next.push(conditions);
                    }
                }
                variants = next;
            }
            _ => {
                for variant in &mut variants {
                    variant.push(condition.clone());
                }
            }
        }
    }

    variants
        .into_iter()
        .map(|conditions| {
            let native = NativePredicate { conditions };
            match &residual {
                None => ClausePlan::Native(native),
                Some(residual) => ClausePlan::NativeWithResidual {
                    native,
                    residual: residual.clone(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;

    use super::*;
    use crate::expr::field;

    fn keys() -> KeySpec {
        KeySpec::new()
            .partition_key("col_a")
            .clustering_key("ts")
            .indexed("col_b")
            .allow_indexed_scan(true)
    }

    fn partition() -> crate::FieldRef {
        field("col_a", DataType::Utf8)
    }

    fn clustering() -> crate::FieldRef {
        field("ts", DataType::Int64)
    }

    fn plain() -> crate::FieldRef {
        field("col_c", DataType::Int64)
    }

    #[test]
    fn dnf_distributes_and_over_or() {
        let a = partition().equals("x").unwrap();
        let b = clustering().greater_than(1i64).unwrap();
        let c = plain().equals(5i64).unwrap();
        let clauses = to_dnf(&(a.clone() & (b.clone() | c.clone())));
        assert_eq!(clauses, vec![vec![a.clone(), b], vec![a, c]]);
    }

    #[test]
    fn fully_native_clause_has_no_residual() {
        let expr = partition().equals("a1").unwrap() & clustering().less_than(9i64).unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        assert_eq!(plan.clauses().len(), 1);
        let clause = &plan.clauses()[0];
        assert!(clause.residual().is_none());
        assert_eq!(clause.native().to_string(), "col_a = 'a1' AND ts < 9");
    }

    #[test]
    fn non_indexed_column_degrades_to_residual() {
        let expr = partition().equals("a1").unwrap() & plain().equals(5i64).unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        let clause = &plan.clauses()[0];
        assert_eq!(clause.native().conditions().len(), 1);
        assert_eq!(clause.residual().unwrap().to_string(), "col_c = 5");
    }

    #[test]
    fn inequality_is_never_native() {
        let expr = partition().equals("a1").unwrap()
            & clustering().not_equals(9i64).unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        let clause = &plan.clauses()[0];
        assert_eq!(clause.residual().unwrap().to_string(), "ts != 9");
    }

    #[test]
    fn membership_native_only_on_partition_or_index() {
        let target = StoreTarget::new(keys());

        let on_partition = partition().is_in(["a", "b"]).unwrap();
        let plan = target.compile(&on_partition).unwrap();
        assert!(plan.clauses()[0].residual().is_none());

        // Clustering-key membership is not native; it needs another anchor.
        let on_clustering = partition().equals("a").unwrap()
            & clustering().is_in([1i64, 2i64]).unwrap();
        let plan = target.compile(&on_clustering).unwrap();
        assert_eq!(
            plan.clauses()[0].residual().unwrap().to_string(),
            "ts IN (1, 2)"
        );
    }

    #[test]
    fn indexed_scan_requires_opt_in() {
        let expr = field("col_b", DataType::Utf8).equals("y").unwrap();

        let allowed = StoreTarget::new(keys());
        assert!(allowed.compile(&expr).is_ok());

        let denied = StoreTarget::new(keys().allow_indexed_scan(false));
        assert!(matches!(
            denied.compile(&expr).unwrap_err(),
            CompileError::UnscannableClause { .. }
        ));
    }

    #[test]
    fn unscannable_clause_fails_whole_compile() {
        // One scannable clause plus one unscannable clause: all-or-nothing.
        let expr = partition().equals("a1").unwrap() | plain().equals(5i64).unwrap();
        let err = StoreTarget::new(keys()).compile(&expr).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnscannableClause {
                clause: "col_c = 5".into()
            }
        );
    }

    #[test]
    fn oversized_in_list_splits_into_chunked_clauses() {
        let values: Vec<String> = (0..60).map(|i| format!("p{i}")).collect();
        let expr = partition().is_in(values).unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        assert_eq!(plan.clauses().len(), 3);

        let mut total = 0;
        for clause in plan.clauses() {
            match &clause.native().conditions()[0].op {
                ConditionOp::In(list) => {
                    assert!(list.len() <= MAX_IN_LIST_LEN);
                    total += list.len();
                }
                other => panic!("expected In, got {other:?}"),
            }
        }
        assert_eq!(total, 60);
    }

    #[test]
    fn clause_fan_out_is_bounded() {
        let mut expr = partition().equals("seed").unwrap();
        for _ in 0..MAX_DNF_CLAUSES {
            expr = expr | partition().equals("x").unwrap();
        }
        assert_eq!(
            StoreTarget::new(keys()).compile(&expr).unwrap_err(),
            CompileError::ClauseLimitExceeded {
                limit: MAX_DNF_CLAUSES
            }
        );
    }

    #[test]
    fn primary_key_orders_partition_before_clustering() {
        let plan = StoreTarget::new(keys())
            .compile(&partition().equals("a").unwrap())
            .unwrap();
        let names: Vec<&str> = plan.primary_key().iter().map(AsRef::as_ref).collect();
        assert_eq!(names, vec!["col_a", "ts"]);
    }
}

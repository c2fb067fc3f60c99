//! Columnar target: compiles expression trees into predicates evaluable
//! over in-memory Arrow batches.
//!
//! Every node type has a direct vectorized counterpart, so compilation for
//! this target cannot fail except for an unresolvable field name. Field
//! names are bound to column indices at compile time; evaluation is a pure
//! bottom-up walk over Arrow compute kernels.

use arrow::{
    array::{Array, BooleanArray, RecordBatch},
    compute::{
        filter_record_batch,
        kernels::{
            boolean::{and_kleene, or_kleene},
            cmp::{eq, gt, gt_eq, lt, lt_eq, neq},
        },
        prep_null_mask_filter,
    },
    datatypes::SchemaRef,
    error::ArrowError,
};

use crate::{
    error::CompileError,
    expr::{ComparisonOp, Expr, Literal},
};

/// Columnar compilation target: the Arrow schema of the batches the
/// predicate will be applied to.
#[derive(Clone, Debug)]
pub struct ColumnarTarget {
    schema: SchemaRef,
}

impl ColumnarTarget {
    /// Creates a target over the given batch layout.
    #[must_use]
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }

    /// Compiles an expression tree into a batch predicate.
    ///
    /// The only possible failure is [`CompileError::FieldNotFound`]: every
    /// referenced field must name a column of the target schema.
    pub fn compile(&self, expr: &Expr) -> Result<ColumnarPredicate, CompileError> {
        let root = self.compile_node(expr)?;
        Ok(ColumnarPredicate { root })
    }

    fn compile_node(&self, expr: &Expr) -> Result<Step, CompileError> {
        match expr {
            Expr::Compare { field, op, literal } => Ok(Step::Compare {
                column: self.column_index(field.name())?,
                op: *op,
                literal: literal.clone(),
            }),
            Expr::InList { field, list } => Ok(Step::InList {
                column: self.column_index(field.name())?,
                list: list.clone(),
            }),
            Expr::And(left, right) => Ok(Step::And(
                Box::new(self.compile_node(left)?),
                Box::new(self.compile_node(right)?),
            )),
            Expr::Or(left, right) => Ok(Step::Or(
                Box::new(self.compile_node(left)?),
                Box::new(self.compile_node(right)?),
            )),
        }
    }

    fn column_index(&self, name: &str) -> Result<usize, CompileError> {
        self.schema
            .fields()
            .iter()
            .position(|field| field.name() == name)
            .ok_or_else(|| CompileError::FieldNotFound(name.to_string()))
    }
}

/// Index-bound predicate step; mirrors the source tree one-to-one.
#[derive(Clone, Debug)]
enum Step {
    Compare {
        column: usize,
        op: ComparisonOp,
        literal: Literal,
    },
    InList {
        column: usize,
        list: Vec<Literal>,
    },
    And(Box<Step>, Box<Step>),
    Or(Box<Step>, Box<Step>),
}

/// Compiled batch predicate.
///
/// Immutable and safe to share across threads; apply it to any number of
/// batches matching the schema it was compiled against.
#[derive(Clone, Debug)]
pub struct ColumnarPredicate {
    root: Step,
}

impl ColumnarPredicate {
    /// Evaluates the predicate, returning one boolean per batch row.
    ///
    /// Comparisons against null cells yield null under Kleene logic; null
    /// mask entries never select a row in [`apply`](Self::apply).
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray, ArrowError> {
        eval_step(&self.root, batch)
    }

    /// Returns the rows of `batch` selected by the predicate.
    pub fn apply(&self, batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
        let mask = self.evaluate(batch)?;
        let mask = if mask.null_count() > 0 {
            prep_null_mask_filter(&mask)
        } else {
            mask
        };
        filter_record_batch(batch, &mask)
    }
}

fn eval_step(step: &Step, batch: &RecordBatch) -> Result<BooleanArray, ArrowError> {
    match step {
        Step::Compare {
            column,
            op,
            literal,
        } => {
            let col = batch.column(*column);
            let scalar = literal.to_datum();
            match op {
                ComparisonOp::Equal => eq(col, scalar.as_ref()),
                ComparisonOp::NotEqual => neq(col, scalar.as_ref()),
                ComparisonOp::LessThan => lt(col, scalar.as_ref()),
                ComparisonOp::LessThanOrEqual => lt_eq(col, scalar.as_ref()),
                ComparisonOp::GreaterThan => gt(col, scalar.as_ref()),
                ComparisonOp::GreaterThanOrEqual => gt_eq(col, scalar.as_ref()),
            }
        }
        Step::InList { column, list } => {
            let col = batch.column(*column);
            let mut acc: Option<BooleanArray> = None;
            for literal in list {
                let scalar = literal.to_datum();
                let matches = eq(col, scalar.as_ref())?;
                acc = Some(match acc {
                    None => matches,
                    Some(prev) => or_kleene(&prev, &matches)?,
                });
            }
            // Empty membership list: matches no row, by contract.
            Ok(acc.unwrap_or_else(|| BooleanArray::from(vec![false; batch.num_rows()])))
        }
        Step::And(left, right) => {
            let left = eval_step(left, batch)?;
            let right = eval_step(right, batch)?;
            and_kleene(&left, &right)
        }
        Step::Or(left, right) => {
            let left = eval_step(left, batch)?;
            let right = eval_step(right, batch)?;
            or_kleene(&left, &right)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};

    use super::*;
    use crate::expr::field;
    use arrow::datatypes::DataType;

    fn batch() -> RecordBatch {
        let schema = crate::filter_schema!(("name", Utf8), ("age", Int64))
            .unwrap()
            .arrow_schema();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["alice", "bob", "carol"])),
                Arc::new(Int64Array::from(vec![30, 41, 30])),
            ],
        )
        .unwrap()
    }

    fn target(batch: &RecordBatch) -> ColumnarTarget {
        ColumnarTarget::new(batch.schema())
    }

    #[test]
    fn unknown_field_fails_at_compile_time() {
        let batch = batch();
        let expr = field("missing", DataType::Int64).equals(1i64).unwrap();
        assert_eq!(
            target(&batch).compile(&expr).unwrap_err(),
            CompileError::FieldNotFound("missing".into())
        );
    }

    #[test]
    fn equality_selects_matching_rows() {
        let batch = batch();
        let expr = field("age", DataType::Int64).equals(30i64).unwrap();
        let filtered = target(&batch).compile(&expr).unwrap().apply(&batch).unwrap();
        assert_eq!(filtered.num_rows(), 2);
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let batch = batch();
        let expr = field("name", DataType::Utf8)
            .is_in(Vec::<String>::new())
            .unwrap();
        let filtered = target(&batch).compile(&expr).unwrap().apply(&batch).unwrap();
        assert_eq!(filtered.num_rows(), 0);
    }

    #[test]
    fn null_cells_never_selected() {
        let schema = crate::filter_schema!(("v", Int64)).unwrap().arrow_schema();
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![Some(1), None, Some(2)]))],
        )
        .unwrap();
        let expr = field("v", DataType::Int64).not_equals(1i64).unwrap();
        let filtered = ColumnarTarget::new(batch.schema())
            .compile(&expr)
            .unwrap()
            .apply(&batch)
            .unwrap();
        assert_eq!(filtered.num_rows(), 1);
    }
}

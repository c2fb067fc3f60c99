//! In-process runner for compiled store plans.
//!
//! Query I/O stays with the caller: the runner asks a fetch closure for each
//! clause's rows, applies that clause's residual to those rows only, then
//! unions everything with primary-key de-duplication. Failure is
//! all-or-nothing — the first failing clause aborts the union instead of
//! returning a partial result set.

use std::collections::HashSet;

use arrow::{
    array::{ArrayRef, BooleanArray, RecordBatch},
    compute::{concat_batches, filter_record_batch},
};
use tracing::debug;

use crate::{
    compile::{ColumnarTarget, NativePredicate, StorePlan},
    error::ExecuteError,
    expr::Literal,
};

impl StorePlan {
    /// Executes the plan against a caller-supplied fetch function.
    ///
    /// `fetch` receives one native predicate per clause and returns the rows
    /// the store produced for it; all clauses must yield rows of the same
    /// layout. Clauses are fetched in plan order here, but they are mutually
    /// independent — callers needing concurrency can dispatch the clauses
    /// themselves and reproduce the same residual/union steps.
    pub fn execute_with<F, E>(&self, mut fetch: F) -> Result<RecordBatch, ExecuteError<E>>
    where
        F: FnMut(&NativePredicate) -> Result<RecordBatch, E>,
    {
        let mut seen: HashSet<Vec<Literal>> = HashSet::new();
        let mut kept = Vec::with_capacity(self.clauses().len());

        for (index, clause) in self.clauses().iter().enumerate() {
            let batch = fetch(clause.native()).map_err(|error| ExecuteError::Fetch { index, error })?;
            let batch = match clause.residual() {
                // The residual applies to this clause's rows only; other
                // clauses may reference different columns entirely.
                Some(residual) => ColumnarTarget::new(batch.schema())
                    .compile(residual)?
                    .apply(&batch)?,
                None => batch,
            };
            let batch = dedup_rows(&batch, self.primary_key(), &mut seen)?;
            kept.push(batch);
        }

        debug!(
            clauses = kept.len(),
            rows = kept.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "executed store plan"
        );
        let schema = kept
            .first()
            .expect("compiled plans contain at least one clause")
            .schema();
        concat_batches(&schema, kept.iter()).map_err(ExecuteError::from)
    }
}

/// Keeps only rows whose primary-key tuple has not been seen yet.
fn dedup_rows<E>(
    batch: &RecordBatch,
    primary_key: &[std::sync::Arc<str>],
    seen: &mut HashSet<Vec<Literal>>,
) -> Result<RecordBatch, ExecuteError<E>> {
    if primary_key.is_empty() {
        return Ok(batch.clone());
    }

    let key_columns: Vec<&ArrayRef> = primary_key
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .ok_or_else(|| ExecuteError::MissingKeyColumn(name.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let mut mask = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let key = key_columns
            .iter()
            .map(|column| Literal::from_array(column.as_ref(), row))
            .collect::<Result<Vec<_>, _>>()?;
        mask.push(seen.insert(key));
    }
    filter_record_batch(batch, &BooleanArray::from(mask)).map_err(ExecuteError::from)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;

    use super::*;
    use crate::expr::field;
    use crate::{compile::KeySpec, compile::StoreTarget};

    fn fixture() -> RecordBatch {
        let schema = crate::filter_schema!(("col_a", Utf8, partition_key), ("col_c", Int64))
            .unwrap()
            .arrow_schema();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["a1", "a1", "a2"])),
                Arc::new(Int64Array::from(vec![5, 9, 5])),
            ],
        )
        .unwrap()
    }

    fn keys() -> KeySpec {
        KeySpec::new().partition_key("col_a")
    }

    #[test]
    fn residual_applies_to_fetched_rows() {
        let expr = field("col_a", DataType::Utf8).equals("a1").unwrap()
            & field("col_c", DataType::Int64).equals(5i64).unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        assert_eq!(plan.clauses().len(), 1);

        // Fake store: serve the partition-key predicate over the fixture.
        let fixture = fixture();
        let result = plan
            .execute_with(|native| {
                assert_eq!(native.to_string(), "col_a = 'a1'");
                // Rows of partition a1.
                Ok::<_, std::convert::Infallible>(fixture.slice(0, 2))
            })
            .unwrap();

        assert_eq!(result.num_rows(), 1);
        let col_c = result
            .column_by_name("col_c")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(col_c.value(0), 5);
    }

    #[test]
    fn fetch_failure_aborts_the_union() {
        let expr = field("col_a", DataType::Utf8).equals("a1").unwrap()
            | field("col_a", DataType::Utf8).equals("a2").unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        assert_eq!(plan.clauses().len(), 2);

        let fixture = fixture();
        let mut calls = 0;
        let result = plan.execute_with(|_| {
            calls += 1;
            if calls == 2 {
                Err("store unavailable")
            } else {
                Ok(fixture.slice(0, 2))
            }
        });
        match result.unwrap_err() {
            ExecuteError::Fetch { index, error } => {
                assert_eq!(index, 1);
                assert_eq!(error, "store unavailable");
            }
            other => panic!("expected fetch error, got {other}"),
        }
    }

    #[test]
    fn union_deduplicates_by_primary_key() {
        let expr = field("col_a", DataType::Utf8).equals("a1").unwrap()
            | field("col_a", DataType::Utf8).equals("a1").unwrap();
        let plan = StoreTarget::new(keys()).compile(&expr).unwrap();
        assert_eq!(plan.clauses().len(), 2);

        // Both clauses return the same a1 row; the union keeps it once.
        let schema = crate::filter_schema!(("col_a", Utf8, partition_key), ("col_c", Int64))
            .unwrap()
            .arrow_schema();
        let row = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["a1"])),
                Arc::new(Int64Array::from(vec![5])),
            ],
        )
        .unwrap();
        let result = plan
            .execute_with(|_| Ok::<_, std::convert::Infallible>(row.clone()))
            .unwrap();
        assert_eq!(result.num_rows(), 1);
    }

    #[test]
    fn missing_key_column_is_reported() {
        let plan = StoreTarget::new(keys())
            .compile(&field("col_a", DataType::Utf8).equals("a1").unwrap())
            .unwrap();

        let schema = crate::filter_schema!(("other", Utf8)).unwrap().arrow_schema();
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["x"])) as _],
        )
        .unwrap();
        let result = plan.execute_with(|_| Ok::<_, std::convert::Infallible>(batch.clone()));
        assert!(matches!(
            result.unwrap_err(),
            ExecuteError::MissingKeyColumn(name) if name == "col_a"
        ));
    }
}

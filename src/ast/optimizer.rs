/// Placeholder resolution and clause pruning.
///
/// The optimizer consumes a statement together with the runtime option map
/// and returns a statement in which every placeholder is either bound,
/// replaced by `NULL`, or removed along with the clause that needed it. The
/// concrete values bound along the way are returned in traversal order, which
/// is the order a backend emits its bind marks.
///
/// Whether an absent option is an error depends on the statement: a SELECT
/// filter simply loses the clause, while DELETE and UPDATE refuse to widen
/// their target set and fail with `MissingOption`.
use tracing::{debug, trace};

use super::types::*;
use crate::error::{BqlError, Result};
use crate::options::{BoundOption, OptionValue, Options};

/// How an absent option is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Absence is a `MissingOption` error.
    Required,
    /// Absence removes the enclosing value or clause.
    Optional,
}

/// Resolve `statement` against `options`.
pub fn optimize(statement: Statement, options: &Options) -> Result<(Statement, Vec<BoundOption>)> {
    let kind = statement.kind();
    let mut resolver = Resolver::new(options);
    let optimized = resolver.statement(statement)?;
    debug!(
        kind,
        bound = resolver.bound.len(),
        "optimized BQL statement"
    );
    Ok((optimized, resolver.bound))
}

/// Walks one statement, accumulating bound options.
///
/// Every resolution step remembers how many options were bound before it
/// started. A step that ends up removed rolls the list back to that mark, so
/// the bound list only ever describes values that survive into the output.
struct Resolver<'a> {
    options: &'a Options,
    bound: Vec<BoundOption>,
}

impl<'a> Resolver<'a> {
    fn new(options: &'a Options) -> Self {
        Self {
            options,
            bound: Vec::new(),
        }
    }

    fn statement(&mut self, statement: Statement) -> Result<Statement> {
        match statement {
            Statement::Select(select) => Ok(Statement::Select(Box::new(self.select(*select)?))),
            Statement::Insert(insert) => Ok(Statement::Insert(self.insert(insert)?)),
            Statement::Update(update) => Ok(Statement::Update(self.update(update)?)),
            Statement::Delete(delete) => Ok(Statement::Delete(self.delete(delete)?)),
        }
    }

    fn select(&mut self, mut select: SelectStatement) -> Result<SelectStatement> {
        select.partitions = self.partitions(select.partitions)?;
        select.filter = self.filter(select.filter, Policy::Optional)?;
        select.limit = self.limit(select.limit)?;
        Ok(select)
    }

    fn insert(&mut self, mut insert: InsertStatement) -> Result<InsertStatement> {
        let mut rows = Vec::with_capacity(insert.rows.len());
        for row in insert.rows {
            let mut values = Vec::with_capacity(row.values.len());
            for value in row.values {
                values.push(
                    self.value(value, Policy::Optional)?
                        .unwrap_or_else(Value::null),
                );
            }
            rows.push(Row { values });
        }
        insert.rows = rows;
        insert.on_duplicate_update = self.assignments(insert.on_duplicate_update, Policy::Optional)?;
        Ok(insert)
    }

    fn update(&mut self, mut update: UpdateStatement) -> Result<UpdateStatement> {
        update.assignments = self.assignments(update.assignments, Policy::Required)?;
        update.filter = self.filter(update.filter, Policy::Required)?;
        update.limit = self.limit(update.limit)?;
        Ok(update)
    }

    fn delete(&mut self, mut delete: DeleteStatement) -> Result<DeleteStatement> {
        delete.filter = self.filter(delete.filter, Policy::Required)?;
        delete.limit = self.limit(delete.limit)?;
        Ok(delete)
    }

    fn filter(&mut self, filter: Option<Expr>, policy: Policy) -> Result<Option<Expr>> {
        match filter {
            Some(expr) => self.expr(expr, policy),
            None => Ok(None),
        }
    }

    /// Partition entries are always lenient, and a null-valued entry is
    /// dropped rather than rendered as `NULL`.
    fn partitions(&mut self, partitions: Vec<Value>) -> Result<Vec<Value>> {
        let mut kept = Vec::with_capacity(partitions.len());
        for partition in partitions {
            match self.value(partition, Policy::Optional)? {
                Some(value) if !value.is_null() => kept.push(value),
                _ => trace!("dropped partition"),
            }
        }
        Ok(kept)
    }

    fn limit(&mut self, limit: Option<Limit>) -> Result<Option<Limit>> {
        let Some(limit) = limit else {
            return Ok(None);
        };

        let mark = self.bound.len();
        let offset = self.optional_part(limit.offset)?;
        let count = self.optional_part(limit.count)?;
        match (offset, count) {
            (Some(offset), Some(count)) => Ok(Some(Limit { offset, count })),
            _ => {
                trace!("dropped limit");
                self.bound.truncate(mark);
                Ok(None)
            }
        }
    }

    /// Resolve an optional limit component. The outer `None` means the
    /// component was present but vanished.
    fn optional_part(&mut self, part: Option<Value>) -> Result<Option<Option<Value>>> {
        match part {
            None => Ok(Some(None)),
            Some(value) => Ok(self.value(value, Policy::Optional)?.map(Some)),
        }
    }

    fn assignments(
        &mut self,
        assignments: Vec<Assignment>,
        policy: Policy,
    ) -> Result<Vec<Assignment>> {
        let mut kept = Vec::with_capacity(assignments.len());
        for Assignment { column, value } in assignments {
            match self.value(value, policy)? {
                Some(value) => kept.push(Assignment { column, value }),
                None => trace!(column = %column.column, "dropped assignment"),
            }
        }
        Ok(kept)
    }

    fn expr(&mut self, expr: Expr, policy: Policy) -> Result<Option<Expr>> {
        let mark = self.bound.len();
        let resolved = self.expr_inner(expr, policy)?;
        if resolved.is_none() {
            self.bound.truncate(mark);
        }
        Ok(resolved)
    }

    fn expr_inner(&mut self, expr: Expr, policy: Policy) -> Result<Option<Expr>> {
        match expr {
            Expr::Condition { op, left, right } => {
                let left = self.expr(*left, policy)?;
                let right = self.expr(*right, policy)?;
                Ok(match (left, right) {
                    (Some(left), Some(right)) => Some(Expr::Condition {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    }),
                    // The surviving side replaces the condition whatever `op` was.
                    (Some(side), None) | (None, Some(side)) => {
                        trace!(op = op.keyword(), "collapsed condition");
                        Some(side)
                    }
                    (None, None) => None,
                })
            }
            Expr::Not(inner) => Ok(self.expr(*inner, policy)?.map(Expr::negate)),
            Expr::Comparison { left, op, right } => {
                let Some(left) = self.value(left, policy)? else {
                    return Ok(pruned("comparison"));
                };
                let Some(right) = self.value(right, policy)? else {
                    return Ok(pruned("comparison"));
                };
                Ok(Some(Expr::Comparison { left, op, right }))
            }
            Expr::Between { column, low, high } => {
                let Some(low) = self.value(low, policy)? else {
                    return Ok(pruned("between"));
                };
                let Some(high) = self.value(high, policy)? else {
                    return Ok(pruned("between"));
                };
                Ok(Some(Expr::Between { column, low, high }))
            }
            // IN only ever narrows the match set, so its elements never fail.
            Expr::In { column, values } => {
                let values = self.values(values, Policy::Optional)?;
                if values.is_empty() {
                    return Ok(pruned("in"));
                }
                Ok(Some(Expr::In { column, values }))
            }
            Expr::NotIn { column, values } => {
                let values = self.values(values, policy)?;
                if values.is_empty() {
                    return Ok(pruned("not in"));
                }
                Ok(Some(Expr::NotIn { column, values }))
            }
            Expr::Is { column, value } => Ok(self
                .value(value, policy)?
                .map(|value| Expr::Is { column, value })),
            Expr::IsNot { column, value } => Ok(self
                .value(value, policy)?
                .map(|value| Expr::IsNot { column, value })),
        }
    }

    fn values(&mut self, values: Vec<Value>, policy: Policy) -> Result<Vec<Value>> {
        let mut kept = Vec::with_capacity(values.len());
        for value in values {
            if let Some(value) = self.value(value, policy)? {
                kept.push(value);
            }
        }
        Ok(kept)
    }

    fn value(&mut self, value: Value, policy: Policy) -> Result<Option<Value>> {
        let mark = self.bound.len();
        let resolved = self.value_inner(value, policy)?;
        if resolved.is_none() {
            self.bound.truncate(mark);
        }
        Ok(resolved)
    }

    fn value_inner(&mut self, value: Value, policy: Policy) -> Result<Option<Value>> {
        match value {
            Value::Placeholder(name) => self.placeholder(name, policy),
            Value::Arith { op, left, right } => {
                let Some(left) = self.value(*left, policy)? else {
                    return Ok(None);
                };
                let Some(right) = self.value(*right, policy)? else {
                    return Ok(None);
                };
                Ok(Some(Value::arith(op, left, right)))
            }
            Value::BitInvert(inner) => Ok(self
                .value(*inner, policy)?
                .map(|v| Value::BitInvert(Box::new(v)))),
            literal_or_column => Ok(Some(literal_or_column)),
        }
    }

    fn placeholder(&mut self, name: String, policy: Policy) -> Result<Option<Value>> {
        match self.options.get(&name) {
            None => match policy {
                Policy::Required => Err(BqlError::MissingOption(name)),
                Policy::Optional => {
                    trace!(option = %name, "option absent");
                    Ok(None)
                }
            },
            Some(OptionValue::Null) => Ok(Some(Value::null())),
            Some(OptionValue::Scalar(scalar)) => {
                self.bound.push(BoundOption {
                    name: name.clone(),
                    value: scalar.clone(),
                });
                Ok(Some(Value::Placeholder(name)))
            }
            Some(OptionValue::List(items)) if items.is_empty() => {
                trace!(option = %name, "option is an empty list");
                Ok(None)
            }
            Some(OptionValue::List(items)) => {
                // Null elements render as NULL and bind nothing.
                for item in items.iter().flatten() {
                    self.bound.push(BoundOption {
                        name: name.clone(),
                        value: item.clone(),
                    });
                }
                Ok(Some(Value::Placeholder(name)))
            }
        }
    }
}

fn pruned(clause: &str) -> Option<Expr> {
    trace!(clause, "pruned clause");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse;
    use crate::options::Scalar;

    fn options(pairs: &[(&str, OptionValue)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn optimize_bql(bql: &str, opts: &Options) -> Result<(Statement, Vec<BoundOption>)> {
        optimize(parse(bql).unwrap(), opts)
    }

    fn select_filter(statement: &Statement) -> Option<&Expr> {
        match statement {
            Statement::Select(s) => s.filter.as_ref(),
            _ => panic!("Expected Select statement"),
        }
    }

    #[test]
    fn test_scalar_binds_and_keeps_placeholder() {
        let opts = options(&[("a10", 10.into())]);
        let (ast, bound) = optimize_bql("select id from logs where a = :a10", &opts).unwrap();
        assert_eq!(
            select_filter(&ast),
            Some(&Expr::eq("a", Value::placeholder("a10")))
        );
        assert_eq!(bound, vec![BoundOption::new("a10", 10)]);
    }

    #[test]
    fn test_absent_option_prunes_select_filter() {
        let (ast, bound) = optimize_bql("select id from logs where a = :a10", &Options::new()).unwrap();
        assert_eq!(select_filter(&ast), None);
        assert!(bound.is_empty());
    }

    #[test]
    fn test_null_option_becomes_null_literal() {
        let opts = options(&[("p", OptionValue::Null)]);
        let (ast, bound) = optimize_bql("select id from logs where a = :p", &opts).unwrap();
        assert_eq!(select_filter(&ast), Some(&Expr::eq("a", Value::null())));
        assert!(bound.is_empty());
    }

    #[test]
    fn test_condition_collapses_to_surviving_side() {
        let opts = options(&[("p1", 20.into()), ("p3", 10.into())]);
        let (ast, bound) =
            optimize_bql("select id from logs where a = :p1 or b = :p2 and c = :p3", &opts).unwrap();
        assert_eq!(
            select_filter(&ast),
            Some(&Expr::or(
                Expr::eq("a", Value::placeholder("p1")),
                Expr::eq("c", Value::placeholder("p3")),
            ))
        );
        assert_eq!(
            bound,
            vec![BoundOption::new("p1", 20), BoundOption::new("p3", 10)]
        );
    }

    #[test]
    fn test_not_is_pruned_with_its_operand() {
        let (ast, _) = optimize_bql("select id from users where not id = :p", &Options::new()).unwrap();
        assert_eq!(select_filter(&ast), None);
    }

    #[test]
    fn test_in_flattens_lists_and_drops_missing() {
        let opts = options(&[("p2", OptionValue::list(["b1", "b2"]))]);
        let (ast, bound) = optimize_bql("select id from users where id in (1, 2, :p2, :p3)", &opts).unwrap();
        match select_filter(&ast) {
            Some(Expr::In { values, .. }) => {
                assert_eq!(
                    values,
                    &vec![Value::int(1), Value::int(2), Value::placeholder("p2")]
                );
            }
            other => panic!("Expected IN, got {:?}", other),
        }
        assert_eq!(
            bound,
            vec![BoundOption::new("p2", "b1"), BoundOption::new("p2", "b2")]
        );
    }

    #[test]
    fn test_in_with_only_missing_values_is_pruned() {
        let (ast, _) = optimize_bql("select id from users where id in (:p2)", &Options::new()).unwrap();
        assert_eq!(select_filter(&ast), None);

        let opts = options(&[("p2", OptionValue::List(vec![]))]);
        let (ast, _) = optimize_bql("select id from users where id in (:p2)", &opts).unwrap();
        assert_eq!(select_filter(&ast), None);
    }

    #[test]
    fn test_list_null_elements_bind_nothing() {
        let opts = options(&[(
            "ids",
            OptionValue::List(vec![Some(Scalar::Int(1)), None, Some(Scalar::Int(3))]),
        )]);
        let (_, bound) = optimize_bql("select id from users where id in (:ids)", &opts).unwrap();
        assert_eq!(bound, vec![BoundOption::new("ids", 1), BoundOption::new("ids", 3)]);
    }

    #[test]
    fn test_in_never_fails_under_required_policy() {
        let (ast, _) = optimize_bql("delete from t where x in (:p, 1)", &Options::new()).unwrap();
        match ast {
            Statement::Delete(d) => assert_eq!(
                d.filter,
                Some(Expr::In {
                    column: ColumnRef::new("x"),
                    values: vec![Value::int(1)],
                })
            ),
            other => panic!("Expected Delete statement, got {:?}", other),
        }
    }

    #[test]
    fn test_not_in_fails_under_required_policy() {
        let err = optimize_bql("delete from t where x not in (:p)", &Options::new()).unwrap_err();
        assert_eq!(err, BqlError::MissingOption("p".into()));
    }

    #[test]
    fn test_not_in_skips_missing_under_optional_policy() {
        let (ast, _) = optimize_bql("select id from t where x not in (:p, 1)", &Options::new()).unwrap();
        assert!(matches!(
            select_filter(&ast),
            Some(Expr::NotIn { values, .. }) if values == &vec![Value::int(1)]
        ));
    }

    #[test]
    fn test_delete_requires_filter_options() {
        let err = optimize_bql("delete from users where id = :id", &Options::new()).unwrap_err();
        assert_eq!(err.option_name(), Some("id"));

        let opts = options(&[("id", 7.into())]);
        let (_, bound) = optimize_bql("delete from users where id = :id", &opts).unwrap();
        assert_eq!(bound, vec![BoundOption::new("id", 7)]);
    }

    #[test]
    fn test_update_requires_set_and_filter_options() {
        let bql = "update users set name = :name where id = :id";
        let err = optimize_bql(bql, &options(&[("id", 1.into())])).unwrap_err();
        assert_eq!(err, BqlError::MissingOption("name".into()));

        let err = optimize_bql(bql, &options(&[("name", "x".into())])).unwrap_err();
        assert_eq!(err, BqlError::MissingOption("id".into()));

        let (_, bound) =
            optimize_bql(bql, &options(&[("name", "x".into()), ("id", 1.into())])).unwrap();
        assert_eq!(
            bound,
            vec![BoundOption::new("name", "x"), BoundOption::new("id", 1)]
        );
    }

    #[test]
    fn test_insert_missing_cells_become_null() {
        let opts = options(&[("a", 1.into())]);
        let (ast, bound) = optimize_bql("insert into t (a, b) values (:a, :b)", &opts).unwrap();
        match ast {
            Statement::Insert(i) => {
                assert_eq!(i.rows[0].values, vec![Value::placeholder("a"), Value::null()]);
            }
            other => panic!("Expected Insert statement, got {:?}", other),
        }
        assert_eq!(bound, vec![BoundOption::new("a", 1)]);
    }

    #[test]
    fn test_insert_on_duplicate_drops_missing_assignments() {
        let opts = options(&[("a", 1.into()), ("c", 3.into())]);
        let (ast, bound) = optimize_bql(
            "insert into t (a) values (:a) on duplicate key update b = :b, c = :c",
            &opts,
        )
        .unwrap();
        match ast {
            Statement::Insert(i) => {
                assert_eq!(
                    i.on_duplicate_update,
                    vec![Assignment::new("c", Value::placeholder("c"))]
                );
            }
            other => panic!("Expected Insert statement, got {:?}", other),
        }
        assert_eq!(bound, vec![BoundOption::new("a", 1), BoundOption::new("c", 3)]);
    }

    #[test]
    fn test_limit_dropped_when_any_part_missing() {
        let opts = options(&[("offset", 10.into())]);
        let (ast, bound) =
            optimize_bql("select id from logs limit :offset, :count", &opts).unwrap();
        match ast {
            Statement::Select(s) => assert_eq!(s.limit, None),
            other => panic!("Expected Select statement, got {:?}", other),
        }
        assert!(bound.is_empty());
    }

    #[test]
    fn test_limit_binds_offset_then_count() {
        let opts = options(&[("offset", 10.into()), ("count", 20.into())]);
        let (_, bound) = optimize_bql("select id from logs limit :offset, :count", &opts).unwrap();
        assert_eq!(
            bound,
            vec![BoundOption::new("offset", 10), BoundOption::new("count", 20)]
        );
    }

    #[test]
    fn test_delete_limit_never_fails() {
        let opts = options(&[("id", 1.into())]);
        let (ast, _) = optimize_bql("delete from t where id = :id limit :n", &opts).unwrap();
        match ast {
            Statement::Delete(d) => assert_eq!(d.limit, None),
            other => panic!("Expected Delete statement, got {:?}", other),
        }
    }

    #[test]
    fn test_partitions_keep_only_bound_entries() {
        let opts = options(&[
            ("p0", "part0".into()),
            ("pn", OptionValue::Null),
            ("pe", OptionValue::List(vec![])),
        ]);
        let (ast, bound) = optimize_bql(
            "select id from logs PARTITION (`:p0`, `:pn`, `:missing`, `:pe`, p9)",
            &opts,
        )
        .unwrap();
        match ast {
            Statement::Select(s) => assert_eq!(
                s.partitions,
                vec![
                    Value::placeholder("p0"),
                    Value::Literal(Literal::Identifier("p9".into()))
                ]
            ),
            other => panic!("Expected Select statement, got {:?}", other),
        }
        assert_eq!(bound, vec![BoundOption::new("p0", "part0")]);
    }

    #[test]
    fn test_pruned_subtree_releases_its_bound_options() {
        // `:a` binds before `:b` turns out to be absent.
        let opts = options(&[("a", 1.into()), ("c", 3.into())]);
        let (ast, bound) =
            optimize_bql("select id from t where x between :a and :b or y = :c", &opts).unwrap();
        assert_eq!(select_filter(&ast), Some(&Expr::eq("y", Value::placeholder("c"))));
        assert_eq!(bound, vec![BoundOption::new("c", 3)]);
    }

    #[test]
    fn test_arithmetic_with_missing_operand_prunes() {
        let opts = options(&[("a", 1.into())]);
        let (ast, bound) =
            optimize_bql("select id from t where x = :a + :b", &opts).unwrap();
        assert_eq!(select_filter(&ast), None);
        assert!(bound.is_empty());
    }

    #[test]
    fn test_optimize_is_deterministic_and_idempotent() {
        let opts = options(&[("p1", 1.into()), ("p2", OptionValue::list([2, 3]))]);
        let bql = "select id from t where a = :p1 and b in (:p2) and c = :p3";
        let first = optimize_bql(bql, &opts).unwrap();
        let second = optimize_bql(bql, &opts).unwrap();
        assert_eq!(first, second);

        let again = optimize(first.0.clone(), &opts).unwrap();
        assert_eq!(again, first);
    }
}

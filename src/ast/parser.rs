/// BQL text → AST front end.
///
/// BQL is MySQL-flavoured SQL with `:name` placeholders. `sqlparser` does the
/// tokenizing and grammar work; this module maps its tree onto the BQL AST and
/// rejects every shape the AST cannot express.
use sqlparser::ast as sp;
use sqlparser::parser::Parser as SqlParser;
use tracing::debug;

use super::dialect::{BqlDialect, IS_NOT_OPERATOR, IS_OPERATOR};
use super::types::*;
use crate::error::{BqlError, Result};

/// Conversion result; the message becomes a `BqlError::Syntax` at the top.
type Convert<T> = std::result::Result<T, String>;

/// Parse a single BQL statement.
pub fn parse(bql: &str) -> Result<Statement> {
    let dialect = BqlDialect::default();
    let mut statements =
        SqlParser::parse_sql(&dialect, bql).map_err(|e| BqlError::syntax(bql, e.to_string()))?;
    let update_limit = dialect.take_update_limit();

    if statements.len() != 1 {
        return Err(BqlError::syntax(
            bql,
            format!("expected 1 statement, found {}", statements.len()),
        ));
    }

    let statement = convert_statement(statements.remove(0), update_limit)
        .map_err(|message| BqlError::syntax(bql, message))?;
    debug!(kind = statement.kind(), table = %statement.table().name, "parsed BQL statement");
    Ok(statement)
}

fn convert_statement(stmt: sp::Statement, update_limit: Option<sp::Expr>) -> Convert<Statement> {
    match stmt {
        sp::Statement::Query(q) => convert_query(*q),
        sp::Statement::Insert(insert) => convert_insert(insert),
        sp::Statement::Update {
            table,
            assignments,
            selection,
            returning,
            ..
        } => {
            if returning.is_some() {
                return Err(unsupported("RETURNING"));
            }
            convert_update(table, assignments, selection, update_limit)
        }
        sp::Statement::Delete(delete) => convert_delete(delete),
        other => Err(format!("unsupported statement: {}", other)),
    }
}

fn convert_query(query: sp::Query) -> Convert<Statement> {
    if query.with.is_some() {
        return Err(unsupported("WITH"));
    }

    let mut select = match *query.body {
        sp::SetExpr::Select(select) => convert_select(*select)?,
        other => return Err(format!("unsupported query body: {}", other)),
    };

    select.order_by = query
        .order_by
        .map(|ob| ob.exprs)
        .unwrap_or_default()
        .into_iter()
        .map(convert_order_by)
        .collect::<Convert<Vec<_>>>()?;

    // MySQL `LIMIT o, c` arrives as limit = c, offset = o.
    select.limit = match (query.limit, query.offset) {
        (None, None) => None,
        (None, Some(_)) => return Err(unsupported("OFFSET without LIMIT")),
        (Some(count), offset) => Some(Limit {
            offset: offset.map(|o| convert_value(o.value)).transpose()?,
            count: Some(convert_value(count)?),
        }),
    };

    Ok(Statement::Select(Box::new(select)))
}

fn convert_select(select: sp::Select) -> Convert<SelectStatement> {
    if select.having.is_some() {
        return Err(unsupported("HAVING"));
    }

    let distinct = match select.distinct {
        None => false,
        Some(sp::Distinct::Distinct) => true,
        Some(sp::Distinct::On(_)) => return Err(unsupported("DISTINCT ON")),
    };

    let mut columns = select
        .projection
        .into_iter()
        .map(convert_select_item)
        .collect::<Convert<Vec<_>>>()?;
    if distinct {
        if let Some(first) = columns.first_mut() {
            first.distinct = true;
        }
    }

    let (table, partitions) = convert_from(select.from)?;

    let filter = select.selection.map(convert_condition).transpose()?;

    let group_by = match select.group_by {
        sp::GroupByExpr::Expressions(exprs, _modifiers) => exprs
            .into_iter()
            .map(convert_column_ref)
            .collect::<Convert<Vec<_>>>()?,
        sp::GroupByExpr::All(_) => return Err(unsupported("GROUP BY ALL")),
    };

    Ok(SelectStatement {
        table,
        columns,
        partitions,
        filter,
        group_by,
        order_by: vec![],
        limit: None,
    })
}

fn convert_from(from: Vec<sp::TableWithJoins>) -> Convert<(Table, Vec<Value>)> {
    let mut iter = from.into_iter();
    let twj = iter.next().ok_or_else(|| "missing table".to_string())?;
    if iter.next().is_some() || !twj.joins.is_empty() {
        return Err(unsupported("joins"));
    }
    convert_table_factor(twj.relation)
}

fn convert_table_factor(tf: sp::TableFactor) -> Convert<(Table, Vec<Value>)> {
    match tf {
        sp::TableFactor::Table {
            name,
            alias,
            partitions,
            ..
        } => {
            let mut table = convert_table_name(name)?;
            table.alias = alias.map(|a| a.name.value);
            let partitions = partitions.into_iter().map(convert_partition).collect();
            Ok((table, partitions))
        }
        other => Err(format!("unsupported table reference: {}", other)),
    }
}

fn convert_table_name(name: sp::ObjectName) -> Convert<Table> {
    let mut parts: Vec<String> = name.0.into_iter().map(|p| p.value).collect();
    let table_name = parts.pop().ok_or_else(|| "empty table name".to_string())?;
    let schema = match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => return Err(format!("table name has too many parts: {}", parts.join("."))),
    };
    Ok(Table {
        schema,
        name: table_name,
        alias: None,
    })
}

/// Partition lists only take identifiers, so a placeholder is written as a
/// quoted identifier: `` PARTITION (`:p0`, p1) ``.
fn convert_partition(ident: sp::Ident) -> Value {
    match ident.value.strip_prefix(':') {
        Some(name) if !name.is_empty() => Value::Placeholder(name.to_string()),
        _ => Value::Literal(Literal::Identifier(ident.value)),
    }
}

fn convert_select_item(item: sp::SelectItem) -> Convert<Column> {
    match item {
        sp::SelectItem::UnnamedExpr(sp::Expr::Function(func)) => Err(format!(
            "function column `{}` requires an alias",
            func.name
        )),
        sp::SelectItem::UnnamedExpr(expr) => Ok(Column::plain(convert_column_ref(expr)?)),
        sp::SelectItem::ExprWithAlias {
            expr: sp::Expr::Function(func),
            alias,
        } => convert_function_column(func, alias.value),
        sp::SelectItem::ExprWithAlias { expr, alias } => {
            Ok(Column::plain(convert_column_ref(expr)?).with_alias(alias.value))
        }
        sp::SelectItem::Wildcard(_) | sp::SelectItem::QualifiedWildcard(_, _) => {
            Err(unsupported("wildcard projections"))
        }
    }
}

fn convert_function_column(func: sp::Function, alias: String) -> Convert<Column> {
    let name = func.name.to_string();
    if func.over.is_some() || func.filter.is_some() {
        return Err(format!("unsupported function modifiers on `{}`", name));
    }

    let (operands, distinct) = match func.args {
        sp::FunctionArguments::List(arg_list) => {
            let distinct = matches!(
                arg_list.duplicate_treatment,
                Some(sp::DuplicateTreatment::Distinct)
            );
            let operands = arg_list
                .args
                .into_iter()
                .map(|a| match a {
                    sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Expr(e)) => convert_column_ref(e),
                    other => Err(format!("function operands must be columns, found `{}`", other)),
                })
                .collect::<Convert<Vec<_>>>()?;
            (operands, distinct)
        }
        sp::FunctionArguments::None => (vec![], false),
        sp::FunctionArguments::Subquery(_) => return Err(unsupported("subqueries")),
    };

    if operands.is_empty() {
        return Err(format!("function `{}` needs at least one column", name));
    }

    let mut column = Column::function(name, operands, alias);
    column.distinct = distinct;
    Ok(column)
}

fn convert_order_by(item: sp::OrderByExpr) -> Convert<OrderByItem> {
    Ok(OrderByItem {
        column: convert_column_ref(item.expr)?,
        direction: match item.asc {
            Some(false) => Direction::Desc,
            _ => Direction::Asc,
        },
    })
}

fn convert_column_ref(expr: sp::Expr) -> Convert<ColumnRef> {
    match expr {
        sp::Expr::Identifier(ident) => Ok(ColumnRef::new(ident.value)),
        sp::Expr::CompoundIdentifier(parts) => {
            let mut names: Vec<String> = parts.into_iter().map(|p| p.value).collect();
            let column = names.pop().ok_or_else(|| "empty column name".to_string())?;
            match names.len() {
                1 => Ok(ColumnRef {
                    schema: None,
                    table: names.pop(),
                    column,
                }),
                2 => {
                    let table = names.pop();
                    Ok(ColumnRef {
                        schema: names.pop(),
                        table,
                        column,
                    })
                }
                _ => Err(format!(
                    "column reference has too many parts: {}.{}",
                    names.join("."),
                    column
                )),
            }
        }
        sp::Expr::Nested(inner) => convert_column_ref(*inner),
        other => Err(format!("expected a column, found `{}`", other)),
    }
}

/// Convert a boolean-valued expression.
fn convert_condition(expr: sp::Expr) -> Convert<Expr> {
    match expr {
        sp::Expr::Nested(inner) => convert_condition(*inner),
        sp::Expr::BinaryOp { left, op, right } => match op {
            sp::BinaryOperator::And => Ok(Expr::and(
                convert_condition(*left)?,
                convert_condition(*right)?,
            )),
            sp::BinaryOperator::Or => Ok(Expr::or(
                convert_condition(*left)?,
                convert_condition(*right)?,
            )),
            sp::BinaryOperator::Custom(ref name) if name == IS_OPERATOR => Ok(Expr::Is {
                column: convert_column_ref(*left)?,
                value: convert_value(*right)?,
            }),
            sp::BinaryOperator::Custom(ref name) if name == IS_NOT_OPERATOR => Ok(Expr::IsNot {
                column: convert_column_ref(*left)?,
                value: convert_value(*right)?,
            }),
            op => Ok(Expr::Comparison {
                left: convert_value(*left)?,
                op: convert_comparison_op(op)?,
                right: convert_value(*right)?,
            }),
        },
        sp::Expr::UnaryOp {
            op: sp::UnaryOperator::Not,
            expr,
        } => Ok(Expr::negate(convert_condition(*expr)?)),
        sp::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            let between = Expr::Between {
                column: convert_column_ref(*expr)?,
                low: convert_value(*low)?,
                high: convert_value(*high)?,
            };
            Ok(if negated {
                Expr::negate(between)
            } else {
                between
            })
        }
        sp::Expr::InList {
            expr,
            list,
            negated,
        } => {
            let column = convert_column_ref(*expr)?;
            let values = list
                .into_iter()
                .map(convert_value)
                .collect::<Convert<Vec<_>>>()?;
            Ok(if negated {
                Expr::NotIn { column, values }
            } else {
                Expr::In { column, values }
            })
        }
        sp::Expr::IsNull(expr) => Ok(Expr::Is {
            column: convert_column_ref(*expr)?,
            value: Value::null(),
        }),
        sp::Expr::IsNotNull(expr) => Ok(Expr::IsNot {
            column: convert_column_ref(*expr)?,
            value: Value::null(),
        }),
        other => Err(format!("unsupported condition: {}", other)),
    }
}

fn convert_comparison_op(op: sp::BinaryOperator) -> Convert<ComparisonOperator> {
    match op {
        sp::BinaryOperator::Eq => Ok(ComparisonOperator::Eq),
        sp::BinaryOperator::NotEq => Ok(ComparisonOperator::NotEq),
        sp::BinaryOperator::Lt => Ok(ComparisonOperator::Lt),
        sp::BinaryOperator::LtEq => Ok(ComparisonOperator::LtEq),
        sp::BinaryOperator::Gt => Ok(ComparisonOperator::Gt),
        sp::BinaryOperator::GtEq => Ok(ComparisonOperator::GtEq),
        other => Err(format!("unsupported comparison operator: {}", other)),
    }
}

fn convert_arithmetic_op(op: &sp::BinaryOperator) -> Option<ArithmeticOperator> {
    match op {
        sp::BinaryOperator::Plus => Some(ArithmeticOperator::Add),
        sp::BinaryOperator::Minus => Some(ArithmeticOperator::Sub),
        sp::BinaryOperator::Multiply => Some(ArithmeticOperator::Mul),
        sp::BinaryOperator::Divide => Some(ArithmeticOperator::Div),
        sp::BinaryOperator::Modulo => Some(ArithmeticOperator::Mod),
        sp::BinaryOperator::BitwiseOr => Some(ArithmeticOperator::BitOr),
        sp::BinaryOperator::BitwiseAnd => Some(ArithmeticOperator::BitAnd),
        sp::BinaryOperator::BitwiseXor => Some(ArithmeticOperator::BitXor),
        sp::BinaryOperator::PGBitwiseShiftLeft => Some(ArithmeticOperator::Shl),
        sp::BinaryOperator::PGBitwiseShiftRight => Some(ArithmeticOperator::Shr),
        _ => None,
    }
}

/// Convert a scalar expression.
fn convert_value(expr: sp::Expr) -> Convert<Value> {
    match expr {
        sp::Expr::Identifier(_) | sp::Expr::CompoundIdentifier(_) => {
            Ok(Value::Column(convert_column_ref(expr)?))
        }
        sp::Expr::Value(val) => convert_literal(val),
        sp::Expr::Nested(inner) => convert_value(*inner),
        sp::Expr::BinaryOp { left, op, right } => match convert_arithmetic_op(&op) {
            Some(op) => Ok(Value::arith(op, convert_value(*left)?, convert_value(*right)?)),
            None => Err(format!("unsupported value operator: {}", op)),
        },
        sp::Expr::UnaryOp { op, expr } => match (op, *expr) {
            (sp::UnaryOperator::Minus, sp::Expr::Value(sp::Value::Number(n, _))) => {
                Ok(Value::Literal(classify_number(format!("-{}", n))))
            }
            (sp::UnaryOperator::Plus, sp::Expr::Value(sp::Value::Number(n, _))) => {
                Ok(Value::Literal(classify_number(n)))
            }
            (sp::UnaryOperator::PGBitwiseNot, inner) => {
                Ok(Value::BitInvert(Box::new(convert_value(inner)?)))
            }
            (op, inner) => Err(format!("unsupported unary operator: {}{}", op, inner)),
        },
        other => Err(format!("unsupported value: {}", other)),
    }
}

fn convert_literal(val: sp::Value) -> Convert<Value> {
    let literal = match val {
        sp::Value::Number(n, _) => classify_number(n),
        sp::Value::HexStringLiteral(h) => Literal::Hex(format!("0x{}", h)),
        sp::Value::SingleQuotedString(s) => Literal::String(format!("'{}'", s.replace('\'', "''"))),
        sp::Value::DoubleQuotedString(s) => {
            Literal::String(format!("\"{}\"", s.replace('"', "\"\"")))
        }
        sp::Value::Null => Literal::Null,
        sp::Value::Placeholder(p) => {
            return match p.strip_prefix(':') {
                Some(name) if !name.is_empty() => Ok(Value::Placeholder(name.to_string())),
                _ => Err(format!("unsupported placeholder `{}`, use `:name`", p)),
            };
        }
        sp::Value::Boolean(_) => return Err(unsupported("boolean literals")),
        other => return Err(format!("unsupported literal: {}", other)),
    };
    Ok(Value::Literal(literal))
}

/// Classify a numeric token by its raw text.
fn classify_number(raw: String) -> Literal {
    let digits = raw.trim_start_matches(['-', '+']);
    if digits.starts_with("0x") || digits.starts_with("0X") {
        Literal::Hex(raw)
    } else if digits.contains(['e', 'E']) {
        Literal::Scientific(raw)
    } else if digits.contains('.') {
        Literal::Float(raw)
    } else if digits.len() > 1 && digits.starts_with('0') {
        Literal::Octal(raw)
    } else {
        Literal::Int(raw)
    }
}

fn convert_insert(insert: sp::Insert) -> Convert<Statement> {
    let table = convert_table_name(insert.table_name)?;

    let columns: Vec<String> = insert.columns.into_iter().map(|c| c.value).collect();

    let source = insert
        .source
        .ok_or_else(|| "INSERT requires a VALUES list".to_string())?;
    let rows = match *source.body {
        sp::SetExpr::Values(values) => values
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(convert_value)
                    .collect::<Convert<Vec<_>>>()
                    .map(|values| Row { values })
            })
            .collect::<Convert<Vec<_>>>()?,
        _ => return Err(unsupported("INSERT ... SELECT")),
    };

    let on_duplicate_update = match insert.on {
        None => vec![],
        Some(sp::OnInsert::DuplicateKeyUpdate(assignments)) => assignments
            .into_iter()
            .map(convert_assignment)
            .collect::<Convert<Vec<_>>>()?,
        Some(_) => return Err(unsupported("ON CONFLICT")),
    };

    Ok(Statement::Insert(InsertStatement {
        table,
        columns,
        rows,
        on_duplicate_update,
    }))
}

fn convert_assignment(assignment: sp::Assignment) -> Convert<Assignment> {
    let column = match assignment.target {
        sp::AssignmentTarget::ColumnName(name) => {
            let parts = name.0;
            if parts.len() == 1 {
                sp::Expr::Identifier(parts.into_iter().next().ok_or("empty column name")?)
            } else {
                sp::Expr::CompoundIdentifier(parts)
            }
        }
        sp::AssignmentTarget::Tuple(_) => return Err(unsupported("tuple assignments")),
    };
    Ok(Assignment {
        column: convert_column_ref(column)?,
        value: convert_value(assignment.value)?,
    })
}

fn convert_update(
    table: sp::TableWithJoins,
    assignments: Vec<sp::Assignment>,
    selection: Option<sp::Expr>,
    limit: Option<sp::Expr>,
) -> Convert<Statement> {
    let (table, _) = convert_from(vec![table])?;
    let assignments = assignments
        .into_iter()
        .map(convert_assignment)
        .collect::<Convert<Vec<_>>>()?;
    let filter = selection.map(convert_condition).transpose()?;
    let limit = limit
        .map(|count| convert_value(count).map(Limit::count))
        .transpose()?;

    Ok(Statement::Update(UpdateStatement {
        table,
        assignments,
        filter,
        limit,
    }))
}

fn convert_delete(delete: sp::Delete) -> Convert<Statement> {
    let from_tables = match delete.from {
        sp::FromTable::WithFromKeyword(tables) => tables,
        sp::FromTable::WithoutKeyword(tables) => tables,
    };
    let (table, _) = convert_from(from_tables)?;

    let filter = delete.selection.map(convert_condition).transpose()?;
    let limit = delete
        .limit
        .map(|count| convert_value(count).map(Limit::count))
        .transpose()?;

    Ok(Statement::Delete(DeleteStatement {
        table,
        filter,
        limit,
    }))
}

fn unsupported(what: &str) -> String {
    format!("{} not supported in BQL", what)
}

/// AST → Lucene-style query string generator.
///
/// Only the WHERE clause of a SELECT is rendered; a statement without one
/// renders as the empty string, which search backends read as "match all".
/// Option values are inlined as text rather than bound.
use super::generator::{self, Generator};
use super::types::*;
use crate::options::{OptionValue, Options};

pub struct SearchGenerator<'a> {
    options: &'a Options,
}

impl<'a> SearchGenerator<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }
}

impl Generator for SearchGenerator<'_> {
    fn name(&self) -> &str {
        "search"
    }

    fn generate(&self, statement: &Statement) -> String {
        match statement {
            Statement::Select(select) => select
                .filter
                .as_ref()
                .map(|filter| self.query(filter))
                .unwrap_or_default(),
            other => generator::unsupported("STATEMENT", other.kind()),
        }
    }
}

impl SearchGenerator<'_> {
    fn query(&self, expr: &Expr) -> String {
        generator::render_condition(expr, &|leaf| self.clause(leaf))
    }

    fn clause(&self, expr: &Expr) -> String {
        match expr {
            Expr::Comparison { left, op, right } => {
                let op = match op {
                    ComparisonOperator::Eq => "",
                    other => other.symbol(),
                };
                format!("{}{}{}", self.field(left), op, self.value(right))
            }
            Expr::Between { column, low, high } => format!(
                "{}[{} TO {}]",
                field_name(column),
                self.value(low),
                self.value(high)
            ),
            Expr::In { column, values } => {
                format!("{}({})", field_name(column), self.alternatives(values))
            }
            Expr::NotIn { column, values } => {
                format!("NOT {}({})", field_name(column), self.alternatives(values))
            }
            Expr::Is { column, value } => {
                format!("{} IS {}", dotted(column), self.value(value))
            }
            Expr::IsNot { column, value } => {
                format!("{} IS NOT {}", dotted(column), self.value(value))
            }
            Expr::Condition { .. } | Expr::Not(_) => self.query(expr),
        }
    }

    /// The left side of a comparison names the field being matched.
    fn field(&self, value: &Value) -> String {
        match value {
            Value::Column(column) => field_name(column),
            other => format!("{}:", self.value(other)),
        }
    }

    fn alternatives(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.value(v))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    fn value(&self, value: &Value) -> String {
        match value {
            Value::Literal(Literal::String(raw)) => unquote(raw),
            Value::Literal(literal) => literal.raw().unwrap_or("NULL").to_string(),
            Value::Column(column) => dotted(column),
            Value::Placeholder(name) => self.option(name),
            Value::Arith { op, left, right } => {
                generator::render_arith(*op, left, right, &|v| self.value(v))
            }
            Value::BitInvert(inner) => generator::render_bit_invert(inner, &|v| self.value(v)),
        }
    }

    fn option(&self, name: &str) -> String {
        match self.options.get(name) {
            Some(OptionValue::Scalar(scalar)) => scalar.to_string(),
            Some(OptionValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    Some(scalar) => scalar.to_string(),
                    None => "NULL".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" OR "),
            Some(OptionValue::Null) | None => "NULL".to_string(),
        }
    }
}

fn dotted(column: &ColumnRef) -> String {
    column.parts().collect::<Vec<_>>().join(".")
}

fn field_name(column: &ColumnRef) -> String {
    format!("{}:", dotted(column))
}

/// Strip the surrounding quotes and undo doubled quote escapes.
fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && (open == '\'' || open == '"') => {
            let doubled = format!("{}{}", open, open);
            chars.as_str().replace(&doubled, &open.to_string())
        }
        _ => raw.to_string(),
    }
}

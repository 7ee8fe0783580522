/// Backend generators and the rules they share.
///
/// A generator renders an optimized statement into backend text. Both
/// backends agree on how operators nest, so the precedence table and the
/// parenthesization rules live here; the backends only decide how leaves
/// (columns, literals, placeholders) and clause keywords look.
use std::fmt;

use serde::{Deserialize, Serialize};

use super::search::SearchGenerator;
use super::sql::SqlGenerator;
use super::types::*;
use crate::options::Options;

/// Renders a statement into backend text.
///
/// Generators never fail. A shape a backend cannot express renders as an
/// `__UNSUPPORTED_<KIND>__(...)` marker so the caller can see what went
/// wrong in the output itself.
///
/// # Example
///
/// ```ignore
/// struct CountOnly;
///
/// impl Generator for CountOnly {
///     fn name(&self) -> &str { "count" }
///     fn generate(&self, statement: &Statement) -> String {
///         statement.kind().to_string()
///     }
/// }
/// ```
pub trait Generator {
    /// Short backend name, as accepted by `--target`.
    fn name(&self) -> &str;

    fn generate(&self, statement: &Statement) -> String;
}

/// Backend selector used by the CLI, the config file and the compiler facade.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Relational SQL with `?` bind marks.
    #[default]
    Sql,
    /// Lucene-style query string with inlined values.
    Search,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Sql => "sql",
            Target::Search => "search",
        }
    }

    /// Build the generator for this target over `options`.
    pub fn generator(self, options: &Options) -> Box<dyn Generator + '_> {
        match self {
            Target::Sql => Box::new(SqlGenerator::new(options)),
            Target::Search => Box::new(SearchGenerator::new(options)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binding strength of a value's top operator. Smaller binds tighter; `0`
/// means the value is a leaf.
pub fn priority(value: &Value) -> u8 {
    match value {
        Value::BitInvert(_) => 1,
        Value::Arith { op, .. } => operator_priority(*op),
        Value::Literal(_) | Value::Column(_) | Value::Placeholder(_) => 0,
    }
}

pub fn operator_priority(op: ArithmeticOperator) -> u8 {
    match op {
        ArithmeticOperator::Mul | ArithmeticOperator::Div | ArithmeticOperator::Mod => 2,
        ArithmeticOperator::Add | ArithmeticOperator::Sub => 3,
        ArithmeticOperator::BitAnd => 4,
        ArithmeticOperator::BitXor => 5,
        ArithmeticOperator::BitOr => 6,
        ArithmeticOperator::Shl | ArithmeticOperator::Shr => 7,
    }
}

/// Whether `child` needs parentheses as an operand of `parent`.
pub fn operand_needs_parens(parent: ArithmeticOperator, child: &Value, is_right: bool) -> bool {
    let parent_priority = operator_priority(parent);
    let child_priority = priority(child);
    if child_priority > parent_priority {
        return true;
    }
    // `a - (b - c)` is not `a - b - c`.
    is_right
        && child_priority == parent_priority
        && matches!(child, Value::Arith { .. })
        && parent.is_left_associative_only()
}

/// Whether `child` needs parentheses under a condition joined by `parent`.
pub fn condition_needs_parens(parent: LogicalOperator, child: &Expr) -> bool {
    parent == LogicalOperator::And
        && matches!(
            child,
            Expr::Condition {
                op: LogicalOperator::Or,
                ..
            }
        )
}

/// Whether `child` needs parentheses under `NOT`.
pub fn negation_needs_parens(child: &Expr) -> bool {
    matches!(child, Expr::Condition { .. })
}

/// Render a boolean tree, delegating every non-logical node to `leaf`.
pub fn render_condition(expr: &Expr, leaf: &dyn Fn(&Expr) -> String) -> String {
    match expr {
        Expr::Condition { op, left, right } => {
            let left_text = wrap(
                render_condition(left, leaf),
                condition_needs_parens(*op, left),
            );
            let right_text = wrap(
                render_condition(right, leaf),
                condition_needs_parens(*op, right),
            );
            format!("{} {} {}", left_text, op.keyword(), right_text)
        }
        Expr::Not(inner) => format!(
            "NOT {}",
            wrap(render_condition(inner, leaf), negation_needs_parens(inner))
        ),
        other => leaf(other),
    }
}

/// Render `left op right`, parenthesizing operands as needed.
pub fn render_arith(
    op: ArithmeticOperator,
    left: &Value,
    right: &Value,
    value: &dyn Fn(&Value) -> String,
) -> String {
    format!(
        "{} {} {}",
        wrap(value(left), operand_needs_parens(op, left, false)),
        op.symbol(),
        wrap(value(right), operand_needs_parens(op, right, true)),
    )
}

pub fn render_bit_invert(inner: &Value, value: &dyn Fn(&Value) -> String) -> String {
    format!("~{}", wrap(value(inner), priority(inner) > 1))
}

pub fn unsupported(kind: &str, diagnostic: impl fmt::Display) -> String {
    format!("__UNSUPPORTED_{}__({})", kind, diagnostic)
}

fn wrap(text: String, parens: bool) -> String {
    if parens {
        format!("({})", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_plus_4() -> Value {
        Value::arith(ArithmeticOperator::Add, Value::column("id"), Value::int(4))
    }

    #[test]
    fn test_priority_table() {
        assert_eq!(priority(&Value::int(1)), 0);
        assert_eq!(priority(&Value::BitInvert(Box::new(Value::int(1)))), 1);
        assert_eq!(operator_priority(ArithmeticOperator::Mod), 2);
        assert_eq!(operator_priority(ArithmeticOperator::Sub), 3);
        assert_eq!(operator_priority(ArithmeticOperator::BitAnd), 4);
        assert_eq!(operator_priority(ArithmeticOperator::BitXor), 5);
        assert_eq!(operator_priority(ArithmeticOperator::BitOr), 6);
        assert_eq!(operator_priority(ArithmeticOperator::Shr), 7);
    }

    #[test]
    fn test_looser_child_is_parenthesized() {
        assert!(operand_needs_parens(ArithmeticOperator::Div, &id_plus_4(), false));
        let tighter = Value::arith(ArithmeticOperator::Div, Value::int(4), Value::int(10));
        assert!(!operand_needs_parens(ArithmeticOperator::Add, &tighter, true));
    }

    #[test]
    fn test_equal_priority_right_operand() {
        assert!(operand_needs_parens(ArithmeticOperator::Sub, &id_plus_4(), true));
        assert!(!operand_needs_parens(ArithmeticOperator::Sub, &id_plus_4(), false));
        assert!(!operand_needs_parens(ArithmeticOperator::Add, &id_plus_4(), true));
    }

    #[test]
    fn test_condition_parens() {
        let or = Expr::or(Expr::eq("a", Value::int(1)), Expr::eq("b", Value::int(2)));
        let and = Expr::and(Expr::eq("a", Value::int(1)), Expr::eq("b", Value::int(2)));
        assert!(condition_needs_parens(LogicalOperator::And, &or));
        assert!(!condition_needs_parens(LogicalOperator::Or, &and));
        assert!(!condition_needs_parens(LogicalOperator::Or, &or));
        assert!(negation_needs_parens(&or));
        assert!(negation_needs_parens(&and));
        assert!(!negation_needs_parens(&Expr::eq("a", Value::int(1))));
    }

    #[test]
    fn test_render_condition_with_plain_leaves() {
        let expr = Expr::and(
            Expr::or(Expr::eq("a", Value::int(1)), Expr::eq("b", Value::int(2))),
            Expr::negate(Expr::eq("c", Value::int(3))),
        );
        let text = render_condition(&expr, &|_| "x".to_string());
        assert_eq!(text, "(x OR x) AND NOT x");
    }

    #[test]
    fn test_render_bit_invert() {
        let leaf = |v: &Value| match v {
            Value::Column(c) => c.column.clone(),
            Value::Literal(l) => l.raw().unwrap_or("NULL").to_string(),
            Value::Arith { op, left, right } => format!("{:?}{:?}{:?}", left, op, right),
            _ => String::new(),
        };
        assert_eq!(render_bit_invert(&Value::column("x"), &leaf), "~x");
        assert!(render_bit_invert(&id_plus_4(), &leaf).starts_with("~("));
    }

    #[test]
    fn test_unsupported_marker() {
        assert_eq!(unsupported("STATEMENT", "insert"), "__UNSUPPORTED_STATEMENT__(insert)");
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::default(), Target::Sql);
        assert_eq!(Target::Search.to_string(), "search");
        let options = Options::new();
        assert_eq!(Target::Sql.generator(&options).name(), "sql");
        assert_eq!(Target::Search.generator(&options).name(), "search");
    }
}

/// AST → SQL generator.
///
/// Renders an optimized statement as MySQL-flavoured SQL. Identifiers are
/// backtick-quoted and every bound placeholder becomes one `?` per bound
/// value, so the output lines up with the optimizer's bound option list.
use super::generator::{self, Generator};
use super::types::*;
use crate::options::{OptionValue, Options};

pub struct SqlGenerator<'a> {
    options: &'a Options,
}

impl<'a> SqlGenerator<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }
}

impl Generator for SqlGenerator<'_> {
    fn name(&self) -> &str {
        "sql"
    }

    fn generate(&self, statement: &Statement) -> String {
        match statement {
            Statement::Select(s) => self.compile_select(s),
            Statement::Insert(i) => self.compile_insert(i),
            Statement::Update(u) => self.compile_update(u),
            Statement::Delete(d) => self.compile_delete(d),
        }
    }
}

impl SqlGenerator<'_> {
    fn compile_select(&self, select: &SelectStatement) -> String {
        let mut parts = Vec::new();

        let columns: Vec<String> = select.columns.iter().map(|c| self.compile_column(c)).collect();
        parts.push(format!("SELECT {}", columns.join(", ")));
        parts.push(format!("FROM {}", compile_table(&select.table)));

        if !select.partitions.is_empty() {
            let partitions: Vec<String> = select
                .partitions
                .iter()
                .map(|p| self.compile_partition(p))
                .collect();
            parts.push(format!("PARTITION ({})", partitions.join(", ")));
        }

        if let Some(ref filter) = select.filter {
            parts.push(format!("WHERE {}", self.compile_expr(filter)));
        }

        if !select.group_by.is_empty() {
            let groups: Vec<String> = select.group_by.iter().map(compile_column_ref).collect();
            parts.push(format!("GROUP BY {}", groups.join(",")));
        }

        if !select.order_by.is_empty() {
            let items: Vec<String> = select
                .order_by
                .iter()
                .map(|o| {
                    let direction = match o.direction {
                        Direction::Asc => "ASC",
                        Direction::Desc => "DESC",
                    };
                    format!("{} {}", compile_column_ref(&o.column), direction)
                })
                .collect();
            parts.push(format!("ORDER BY {}", items.join(", ")));
        }

        if let Some(limit) = select.limit.as_ref().and_then(|l| self.compile_limit(l)) {
            parts.push(limit);
        }

        parts.join(" ")
    }

    fn compile_insert(&self, insert: &InsertStatement) -> String {
        let mut parts = vec![format!("INSERT INTO {}", compile_table(&insert.table))];

        if !insert.columns.is_empty() {
            let columns: Vec<String> = insert.columns.iter().map(|c| quote_ident(c)).collect();
            parts.push(format!("({})", columns.join(", ")));
        }

        let rows: Vec<String> = insert
            .rows
            .iter()
            .map(|row| {
                let values: Vec<String> = row.values.iter().map(|v| self.compile_value(v)).collect();
                format!("({})", values.join(", "))
            })
            .collect();
        parts.push(format!("VALUES {}", rows.join(", ")));

        if !insert.on_duplicate_update.is_empty() {
            parts.push(format!(
                "ON DUPLICATE KEY UPDATE {}",
                self.compile_assignments(&insert.on_duplicate_update)
            ));
        }

        parts.join(" ")
    }

    fn compile_update(&self, update: &UpdateStatement) -> String {
        // every assignment can be dropped by an empty-list option
        let assignments = if update.assignments.is_empty() {
            generator::unsupported("ASSIGNMENTS", "empty")
        } else {
            self.compile_assignments(&update.assignments)
        };
        let mut parts = vec![
            format!("UPDATE {}", compile_table(&update.table)),
            format!("SET {}", assignments),
        ];

        if let Some(ref filter) = update.filter {
            parts.push(format!("WHERE {}", self.compile_expr(filter)));
        }
        if let Some(limit) = update.limit.as_ref().and_then(|l| self.compile_limit(l)) {
            parts.push(limit);
        }

        parts.join(" ")
    }

    fn compile_delete(&self, delete: &DeleteStatement) -> String {
        let mut parts = vec![format!("DELETE FROM {}", compile_table(&delete.table))];

        if let Some(ref filter) = delete.filter {
            parts.push(format!("WHERE {}", self.compile_expr(filter)));
        }
        if let Some(limit) = delete.limit.as_ref().and_then(|l| self.compile_limit(l)) {
            parts.push(limit);
        }

        parts.join(" ")
    }

    fn compile_column(&self, column: &Column) -> String {
        let operands: Vec<String> = column.operands.iter().map(compile_column_ref).collect();
        let mut out = match column.function {
            Some(ref function) if column.distinct => {
                format!("{}(DISTINCT {})", function, operands.join(", "))
            }
            Some(ref function) => format!("{}({})", function, operands.join(", ")),
            None if column.distinct => format!("DISTINCT {}", operands.join(", ")),
            None => operands.join(", "),
        };
        if let Some(ref alias) = column.alias {
            out.push_str(&format!(" AS {}", quote_ident(alias)));
        }
        out
    }

    fn compile_partition(&self, partition: &Value) -> String {
        match partition {
            Value::Literal(Literal::Identifier(name)) => name.clone(),
            other => self.compile_value(other),
        }
    }

    /// `LIMIT o, c` or `LIMIT c`. A limit without a count renders nothing.
    fn compile_limit(&self, limit: &Limit) -> Option<String> {
        let count = self.compile_value(limit.count.as_ref()?);
        Some(match limit.offset {
            Some(ref offset) => format!("LIMIT {}, {}", self.compile_value(offset), count),
            None => format!("LIMIT {}", count),
        })
    }

    fn compile_assignments(&self, assignments: &[Assignment]) -> String {
        assignments
            .iter()
            .map(|a| {
                format!(
                    "{} = {}",
                    compile_column_ref(&a.column),
                    self.compile_value(&a.value)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compile_expr(&self, expr: &Expr) -> String {
        generator::render_condition(expr, &|leaf| self.compile_predicate(leaf))
    }

    fn compile_predicate(&self, expr: &Expr) -> String {
        match expr {
            Expr::Comparison { left, op, right } => format!(
                "{} {} {}",
                self.compile_value(left),
                op.symbol(),
                self.compile_value(right)
            ),
            Expr::Between { column, low, high } => format!(
                "{} BETWEEN {} AND {}",
                compile_column_ref(column),
                self.compile_value(low),
                self.compile_value(high)
            ),
            Expr::In { column, values } => format!(
                "{} IN ({})",
                compile_column_ref(column),
                self.compile_values(values)
            ),
            Expr::NotIn { column, values } => format!(
                "{} NOT IN ({})",
                compile_column_ref(column),
                self.compile_values(values)
            ),
            Expr::Is { column, value } => format!(
                "{} IS {}",
                compile_column_ref(column),
                self.compile_value(value)
            ),
            Expr::IsNot { column, value } => format!(
                "{} IS NOT {}",
                compile_column_ref(column),
                self.compile_value(value)
            ),
            Expr::Condition { .. } | Expr::Not(_) => self.compile_expr(expr),
        }
    }

    fn compile_values(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.compile_value(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compile_value(&self, value: &Value) -> String {
        match value {
            Value::Literal(Literal::Null) => "NULL".to_string(),
            Value::Literal(Literal::Identifier(name)) => quote_ident(name),
            Value::Literal(literal) => literal.raw().unwrap_or("NULL").to_string(),
            Value::Column(column) => compile_column_ref(column),
            Value::Placeholder(name) => self.compile_placeholder(name),
            Value::Arith { op, left, right } => {
                generator::render_arith(*op, left, right, &|v| self.compile_value(v))
            }
            Value::BitInvert(inner) => {
                generator::render_bit_invert(inner, &|v| self.compile_value(v))
            }
        }
    }

    /// One `?` per bound value; anything unbound is `NULL`.
    fn compile_placeholder(&self, name: &str) -> String {
        match self.options.get(name) {
            Some(OptionValue::Scalar(_)) => "?".to_string(),
            Some(OptionValue::List(items)) => items
                .iter()
                .map(|item| if item.is_some() { "?" } else { "NULL" })
                .collect::<Vec<_>>()
                .join(", "),
            Some(OptionValue::Null) | None => "NULL".to_string(),
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn compile_table(table: &Table) -> String {
    let mut out = String::new();
    if let Some(ref schema) = table.schema {
        out.push_str(&quote_ident(schema));
        out.push('.');
    }
    out.push_str(&quote_ident(&table.name));
    if let Some(ref alias) = table.alias {
        out.push_str(&format!(" AS {}", quote_ident(alias)));
    }
    out
}

fn compile_column_ref(column: &ColumnRef) -> String {
    column.parts().map(quote_ident).collect::<Vec<_>>().join(".")
}

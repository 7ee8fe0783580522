//! BQL AST types.
//!
//! This module defines the tree shared by the metadata collector, the
//! optimizer and every generator. The tree is:
//! - Owned (a parent exclusively owns its children, no back references)
//! - Clone-based (each optimization works on its own deep copy)
//! - Closed (every pass matches exhaustively on the enums below)

/// Top-level BQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn table(&self) -> &Table {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    /// Lower-case statement keyword, used in log output and markers.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
        }
    }
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub table: Table,
    pub columns: Vec<Column>,
    /// Partition names; identifier literals or placeholders.
    pub partitions: Vec<Value>,
    pub filter: Option<Expr>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Limit>,
}

/// An INSERT ... VALUES statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertStatement {
    pub table: Table,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// `ON DUPLICATE KEY UPDATE` assignments.
    pub on_duplicate_update: Vec<Assignment>,
}

/// An UPDATE statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateStatement {
    pub table: Table,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Expr>,
    pub limit: Option<Limit>,
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteStatement {
    pub table: Table,
    pub filter: Option<Expr>,
    pub limit: Option<Limit>,
}

/// Table reference: `schema.table AS alias`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Reference to a column: `schema.table.column`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Name parts in source order, qualifiers first.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.schema
            .as_deref()
            .into_iter()
            .chain(self.table.as_deref())
            .chain(std::iter::once(self.column.as_str()))
    }
}

/// One projection of a SELECT.
///
/// A plain column has exactly one operand. A function column applies
/// `function` to its operands and always carries an alias, so result sets
/// have a stable label for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub distinct: bool,
    pub function: Option<String>,
    pub operands: Vec<ColumnRef>,
    pub alias: Option<String>,
}

impl Column {
    pub fn plain(column: ColumnRef) -> Self {
        Self {
            distinct: false,
            function: None,
            operands: vec![column],
            alias: None,
        }
    }

    pub fn function(
        function: impl Into<String>,
        operands: Vec<ColumnRef>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            distinct: false,
            function: Some(function.into()),
            operands,
            alias: Some(alias.into()),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// Boolean-valued expression used by WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left AND right`, `left OR right`
    Condition {
        op: LogicalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Comparison {
        left: Value,
        op: ComparisonOperator,
        right: Value,
    },
    Between {
        column: ColumnRef,
        low: Value,
        high: Value,
    },
    In {
        column: ColumnRef,
        values: Vec<Value>,
    },
    NotIn {
        column: ColumnRef,
        values: Vec<Value>,
    },
    Is {
        column: ColumnRef,
        value: Value,
    },
    IsNot {
        column: ColumnRef,
        value: Value,
    },
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Condition {
            op: LogicalOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Condition {
            op: LogicalOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(left: Value, op: ComparisonOperator, right: Value) -> Self {
        Expr::Comparison { left, op, right }
    }

    /// `column = value`, the most common leaf.
    pub fn eq(column: &str, value: Value) -> Self {
        Expr::Comparison {
            left: Value::Column(ColumnRef::new(column)),
            op: ComparisonOperator::Eq,
            right: value,
        }
    }

    pub fn negate(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }
}

/// A scalar value appearing in comparisons, rows, limits and assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(Literal),
    Column(ColumnRef),
    /// Unresolved `:name` placeholder.
    Placeholder(String),
    Arith {
        op: ArithmeticOperator,
        left: Box<Value>,
        right: Box<Value>,
    },
    /// `~value`
    BitInvert(Box<Value>),
}

impl Value {
    pub fn placeholder(name: impl Into<String>) -> Self {
        Value::Placeholder(name.into())
    }

    pub fn int(n: i64) -> Self {
        Value::Literal(Literal::Int(n.to_string()))
    }

    /// A string literal; `raw` must include its quote characters.
    pub fn string(raw: impl Into<String>) -> Self {
        Value::Literal(Literal::String(raw.into()))
    }

    pub fn null() -> Self {
        Value::Literal(Literal::Null)
    }

    pub fn column(column: impl Into<String>) -> Self {
        Value::Column(ColumnRef::new(column))
    }

    pub fn arith(op: ArithmeticOperator, left: Value, right: Value) -> Self {
        Value::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Literal(Literal::Null))
    }
}

/// A literal as written in the source. Every variant but `Null` keeps its
/// raw text, so generators reproduce `0x1F`, `017` or `1.2e+10` verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(String),
    Float(String),
    Scientific(String),
    Hex(String),
    Octal(String),
    /// Raw text including quote characters.
    String(String),
    Null,
    Identifier(String),
}

impl Literal {
    pub fn raw(&self) -> Option<&str> {
        match self {
            Literal::Int(s)
            | Literal::Float(s)
            | Literal::Scientific(s)
            | Literal::Hex(s)
            | Literal::Octal(s)
            | Literal::String(s)
            | Literal::Identifier(s) => Some(s),
            Literal::Null => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
}

impl ComparisonOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::LtEq => "<=",
            ComparisonOperator::GtEq => ">=",
            ComparisonOperator::Eq => "=",
            ComparisonOperator::NotEq => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitOr,
    BitAnd,
    BitXor,
    Shl,
    Shr,
}

impl ArithmeticOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
            ArithmeticOperator::Mod => "%",
            ArithmeticOperator::BitOr => "|",
            ArithmeticOperator::BitAnd => "&",
            ArithmeticOperator::BitXor => "^",
            ArithmeticOperator::Shl => "<<",
            ArithmeticOperator::Shr => ">>",
        }
    }

    /// Whether `a op (b op c)` differs from `(a op b) op c`.
    pub fn is_left_associative_only(self) -> bool {
        matches!(
            self,
            ArithmeticOperator::Sub
                | ArithmeticOperator::Div
                | ArithmeticOperator::Mod
                | ArithmeticOperator::Shl
                | ArithmeticOperator::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: ColumnRef,
    pub direction: Direction,
}

/// `LIMIT offset, count`
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub offset: Option<Value>,
    pub count: Option<Value>,
}

impl Limit {
    pub fn count(count: Value) -> Self {
        Self {
            offset: None,
            count: Some(count),
        }
    }

    pub fn offset_count(offset: Value, count: Value) -> Self {
        Self {
            offset: Some(offset),
            count: Some(count),
        }
    }
}

/// `column = value` in SET or ON DUPLICATE KEY UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: ColumnRef::new(column),
            value,
        }
    }
}

/// One VALUES tuple of an INSERT.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub values: Vec<Value>,
}

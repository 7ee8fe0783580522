/// The sqlparser dialect BQL is read with.
///
/// It behaves as MySQL and adds the few operators BQL accepts that the MySQL
/// grammar in sqlparser leaves out: prefix `~`, `<<` and `>>`, `IS [NOT]` with a
/// value on the right, and a row count after `UPDATE`.
use std::any::TypeId;
use std::cell::RefCell;

use sqlparser::ast::{BinaryOperator, Expr, Statement, UnaryOperator};
use sqlparser::dialect::{Dialect, MySqlDialect, Precedence};
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;

/// Operator names carried by `BinaryOperator::Custom` for `IS [NOT] <value>`.
pub const IS_OPERATOR: &str = "IS";
pub const IS_NOT_OPERATOR: &str = "IS NOT";

#[derive(Debug)]
pub struct BqlDialect {
    mysql: MySqlDialect,
    update_limit: RefCell<Option<Expr>>,
}

impl Default for BqlDialect {
    fn default() -> Self {
        Self {
            mysql: MySqlDialect {},
            update_limit: RefCell::new(None),
        }
    }
}

impl BqlDialect {
    /// The `LIMIT` expression of the last `UPDATE` parsed with this dialect.
    pub fn take_update_limit(&self) -> Option<Expr> {
        self.update_limit.borrow_mut().take()
    }

    fn parse_update(&self, parser: &mut Parser) -> Result<Statement, ParserError> {
        let update = parser.parse_update()?;
        let limit = if parser.parse_keyword(Keyword::LIMIT) {
            Some(parser.parse_expr()?)
        } else {
            None
        };
        *self.update_limit.borrow_mut() = limit;
        Ok(update)
    }

    /// `IS [NOT] <value>`; `IS NULL`, `IS TRUE` and the other keyword forms are
    /// left to sqlparser.
    fn parse_is(
        &self,
        parser: &mut Parser,
        expr: &Expr,
        precedence: u8,
    ) -> Option<Result<Expr, ParserError>> {
        let negated = matches!(
            parser.peek_nth_token(1).token,
            Token::Word(ref w) if w.keyword == Keyword::NOT
        );
        let operand = parser.peek_nth_token(if negated { 2 } else { 1 }).token;
        let takes_value = match operand {
            Token::Colon
            | Token::Placeholder(_)
            | Token::Number(..)
            | Token::SingleQuotedString(_)
            | Token::DoubleQuotedString(_)
            | Token::HexStringLiteral(_) => true,
            Token::Word(ref w) => w.keyword == Keyword::NoKeyword,
            _ => false,
        };
        if !takes_value {
            return None;
        }

        parser.next_token();
        if negated {
            parser.next_token();
        }
        let op = if negated { IS_NOT_OPERATOR } else { IS_OPERATOR };
        Some(parser.parse_subexpr(precedence).map(|right| Expr::BinaryOp {
            left: Box::new(expr.clone()),
            op: BinaryOperator::Custom(op.to_string()),
            right: Box::new(right),
        }))
    }
}

impl Dialect for BqlDialect {
    // sqlparser gates MySQL syntax (PARTITION, `LIMIT a, b`) on this id
    fn dialect(&self) -> TypeId {
        TypeId::of::<MySqlDialect>()
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        self.mysql.is_identifier_start(ch)
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.mysql.is_identifier_part(ch)
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        self.mysql.is_delimited_identifier_start(ch)
    }

    fn identifier_quote_style(&self, identifier: &str) -> Option<char> {
        self.mysql.identifier_quote_style(identifier)
    }

    fn supports_string_literal_backslash_escape(&self) -> bool {
        self.mysql.supports_string_literal_backslash_escape()
    }

    fn supports_numeric_prefix(&self) -> bool {
        self.mysql.supports_numeric_prefix()
    }

    fn require_interval_qualifier(&self) -> bool {
        self.mysql.require_interval_qualifier()
    }

    fn supports_limit_comma(&self) -> bool {
        self.mysql.supports_limit_comma()
    }

    fn supports_create_table_select(&self) -> bool {
        self.mysql.supports_create_table_select()
    }

    fn parse_prefix(&self, parser: &mut Parser) -> Option<Result<Expr, ParserError>> {
        if parser.peek_token().token != Token::Tilde {
            return None;
        }
        parser.next_token();
        // binds tighter than every binary operator
        let operand = parser.parse_subexpr(self.prec_value(Precedence::MulDivModOp));
        Some(operand.map(|expr| Expr::UnaryOp {
            op: UnaryOperator::PGBitwiseNot,
            expr: Box::new(expr),
        }))
    }

    fn parse_infix(
        &self,
        parser: &mut Parser,
        expr: &Expr,
        precedence: u8,
    ) -> Option<Result<Expr, ParserError>> {
        let op = match parser.peek_token().token {
            Token::ShiftLeft => BinaryOperator::PGBitwiseShiftLeft,
            Token::ShiftRight => BinaryOperator::PGBitwiseShiftRight,
            Token::Word(ref w) if w.keyword == Keyword::IS => {
                return self.parse_is(parser, expr, precedence);
            }
            _ => return self.mysql.parse_infix(parser, expr, precedence),
        };
        parser.next_token();
        Some(parser.parse_subexpr(precedence).map(|right| Expr::BinaryOp {
            left: Box::new(expr.clone()),
            op,
            right: Box::new(right),
        }))
    }

    fn parse_statement(&self, parser: &mut Parser) -> Option<Result<Statement, ParserError>> {
        if parser.parse_keyword(Keyword::UPDATE) {
            return Some(self.parse_update(parser));
        }
        self.mysql.parse_statement(parser)
    }
}

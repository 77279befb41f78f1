/// Parser for SQL-like queries
///
/// Converts a stream of tokens into an Abstract Syntax Tree (AST).
use super::ast::*;
use super::lexer::{Lexer, LexerError, Token};
use thiserror::Error;

/// Parser for SQL-like queries
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from SQL text
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the query into an AST
    pub fn parse(&mut self) -> Result<Query, ParseError> {
        self.expect_token(Token::Select)?;
        let distinct = if self.current_token() == &Token::Distinct {
            self.advance();
            true
        } else {
            false
        };

        let select = self.parse_select()?;
        let from = self.parse_from()?;
        let where_clause = self.parse_where()?;
        let group_by = self.parse_group_by()?;
        let having = self.parse_having()?;
        let order_by = self.parse_order_by()?;
        let limit = self.parse_limit()?;

        if self.current_token() == &Token::Semicolon {
            self.advance();
        }
        self.expect_token(Token::Eof)?;

        Ok(Query {
            distinct,
            select,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    fn parse_select(&mut self) -> Result<SelectClause, ParseError> {
        let mut columns = Vec::new();

        loop {
            if self.current_token() == &Token::Asterisk {
                self.advance();
                columns.push(SelectColumn::Wildcard);
            } else if let Some(function) = self.aggregate_ahead() {
                self.advance();
                let argument = self.parse_aggregate_argument(function)?;
                let alias = self.parse_alias()?;

                columns.push(SelectColumn::Aggregate {
                    function,
                    argument,
                    alias,
                });
            } else if let Token::Identifier(name) = self.current_token().clone() {
                self.advance();
                let alias = self.parse_alias()?;
                columns.push(SelectColumn::Column { name, alias });
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "column name or *".to_string(),
                    found: self.current_token().clone(),
                });
            }

            if self.current_token() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        if columns.is_empty() {
            return Err(ParseError::EmptySelectList);
        }

        Ok(SelectClause { columns })
    }

    /// An identifier is a function call only when `(` follows it, so a
    /// column called `count` can still be selected bare.
    fn aggregate_ahead(&self) -> Option<AggregateFunction> {
        match (self.current_token(), self.peek_token()) {
            (Token::Identifier(name), Token::LeftParen) => AggregateFunction::from_name(name),
            _ => None,
        }
    }

    fn parse_aggregate_argument(
        &mut self,
        function: AggregateFunction,
    ) -> Result<AggregateArgument, ParseError> {
        self.expect_token(Token::LeftParen)?;

        let argument = match self.current_token().clone() {
            Token::Asterisk if function == AggregateFunction::Count => {
                self.advance();
                AggregateArgument::Star
            }
            Token::Asterisk => return Err(ParseError::StarArgument(function)),
            Token::Identifier(name) => {
                self.advance();
                AggregateArgument::Column(name)
            }
            token => {
                return Err(ParseError::UnexpectedToken {
                    expected: "column name or *".to_string(),
                    found: token,
                })
            }
        };

        self.expect_token(Token::RightParen)?;
        Ok(argument)
    }

    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.current_token() != &Token::As {
            return Ok(None);
        }

        self.advance();
        if let Token::Identifier(name) = self.current_token().clone() {
            self.advance();
            Ok(Some(name))
        } else {
            Err(ParseError::UnexpectedToken {
                expected: "alias".to_string(),
                found: self.current_token().clone(),
            })
        }
    }

    fn parse_from(&mut self) -> Result<FromClause, ParseError> {
        self.expect_token(Token::From)?;

        let table = if let Token::Identifier(name) = self.current_token().clone() {
            self.advance();
            name
        } else {
            return Err(ParseError::UnexpectedToken {
                expected: "table name".to_string(),
                found: self.current_token().clone(),
            });
        };

        Ok(FromClause { table })
    }

    fn parse_where(&mut self) -> Result<Option<WhereClause>, ParseError> {
        if self.current_token() != &Token::Where {
            return Ok(None);
        }

        self.advance();
        let condition = self.parse_expression()?;

        Ok(Some(WhereClause { condition }))
    }

    fn parse_group_by(&mut self) -> Result<Option<GroupByClause>, ParseError> {
        if self.current_token() != &Token::Group {
            return Ok(None);
        }

        self.advance();
        self.expect_token(Token::By)?;

        let mut columns = Vec::new();

        loop {
            if let Token::Identifier(name) = self.current_token().clone() {
                self.advance();
                columns.push(name);

                if self.current_token() == &Token::Comma {
                    self.advance();
                    continue;
                } else {
                    break;
                }
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "column name".to_string(),
                    found: self.current_token().clone(),
                });
            }
        }

        Ok(Some(GroupByClause { columns }))
    }

    fn parse_having(&mut self) -> Result<Option<HavingClause>, ParseError> {
        if self.current_token() != &Token::Having {
            return Ok(None);
        }

        self.advance();
        let condition = self.parse_expression()?;

        Ok(Some(HavingClause { condition }))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.current_token() == &Token::Or {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expression::LogicalOp {
                left: Box::new(left),
                op: LogicalOperator::Or,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;

        while self.current_token() == &Token::And {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::LogicalOp {
                left: Box::new(left),
                op: LogicalOperator::And,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.current_token() == &Token::Not {
            self.advance();
            let expr = self.parse_not()?;
            return Ok(Expression::Not(Box::new(expr)));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_primary()?;

        // Handle IS [NOT] NULL
        if self.current_token() == &Token::Is {
            self.advance();
            let negated = if self.current_token() == &Token::Not {
                self.advance();
                true
            } else {
                false
            };
            self.expect_token(Token::Null)?;
            return Ok(Expression::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        // Postfix NOT: x NOT LIKE / NOT IN / NOT BETWEEN
        let negated = if self.current_token() == &Token::Not
            && matches!(self.peek_token(), Token::Like | Token::In | Token::Between)
        {
            self.advance();
            true
        } else {
            false
        };

        let expr = match self.current_token() {
            Token::Like => self.parse_like(left)?,
            Token::In => self.parse_in(left)?,
            Token::Between => self.parse_between(left)?,
            _ => return self.parse_binary_op(left),
        };

        if negated {
            Ok(Expression::Not(Box::new(expr)))
        } else {
            Ok(expr)
        }
    }

    fn parse_like(&mut self, left: Expression) -> Result<Expression, ParseError> {
        self.advance();
        if let Token::String(pattern) = self.current_token().clone() {
            self.advance();
            Ok(Expression::Like {
                expr: Box::new(left),
                pattern,
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: "string pattern".to_string(),
                found: self.current_token().clone(),
            })
        }
    }

    fn parse_in(&mut self, left: Expression) -> Result<Expression, ParseError> {
        self.advance();
        self.expect_token(Token::LeftParen)?;

        let mut values = Vec::new();
        loop {
            let value = self.parse_literal()?;
            values.push(value);

            if self.current_token() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_token(Token::RightParen)?;

        Ok(Expression::In {
            expr: Box::new(left),
            values,
        })
    }

    fn parse_between(&mut self, left: Expression) -> Result<Expression, ParseError> {
        self.advance();
        let min = self.parse_primary()?;
        self.expect_token(Token::And)?;
        let max = self.parse_primary()?;

        Ok(Expression::Between {
            expr: Box::new(left),
            min: Box::new(min),
            max: Box::new(max),
        })
    }

    fn parse_binary_op(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let op = match self.current_token() {
            Token::Eq => BinaryOperator::Eq,
            Token::Ne => BinaryOperator::Ne,
            Token::Lt => BinaryOperator::Lt,
            Token::Le => BinaryOperator::Le,
            Token::Gt => BinaryOperator::Gt,
            Token::Ge => BinaryOperator::Ge,
            _ => return Ok(left),
        };

        self.advance();
        let right = self.parse_primary()?;

        Ok(Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        if let Some(function) = self.aggregate_ahead() {
            self.advance();
            let argument = self.parse_aggregate_argument(function)?;
            return Ok(Expression::Aggregate { function, argument });
        }

        match self.current_token().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(Expression::Column(name))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            _ => self.parse_literal().map(Expression::Literal).map_err(|err| match err {
                ParseError::UnexpectedToken { found, .. } => ParseError::UnexpectedToken {
                    expected: "expression".to_string(),
                    found,
                },
                other => other,
            }),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        match self.current_token().clone() {
            Token::Integer(i) => {
                self.advance();
                Ok(Literal::Integer(i))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Literal::Float(f))
            }
            Token::String(s) => {
                self.advance();
                Ok(Literal::String(s))
            }
            Token::Boolean(b) => {
                self.advance();
                Ok(Literal::Boolean(b))
            }
            Token::Null => {
                self.advance();
                Ok(Literal::Null)
            }
            token => Err(ParseError::UnexpectedToken {
                expected: "literal value".to_string(),
                found: token,
            }),
        }
    }

    fn parse_order_by(&mut self) -> Result<Option<OrderByClause>, ParseError> {
        if self.current_token() != &Token::OrderBy {
            return Ok(None);
        }

        self.advance();

        let mut columns = Vec::new();

        loop {
            let column = if let Some(function) = self.aggregate_ahead() {
                self.advance();
                let argument = self.parse_aggregate_argument(function)?;
                format!("{}({})", function, argument)
            } else if let Token::Identifier(name) = self.current_token().clone() {
                self.advance();
                name
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "column name".to_string(),
                    found: self.current_token().clone(),
                });
            };

            let direction = if self.current_token() == &Token::Desc {
                self.advance();
                OrderDirection::Desc
            } else {
                if self.current_token() == &Token::Asc {
                    self.advance();
                }
                OrderDirection::Asc
            };

            columns.push(OrderByColumn { column, direction });

            if self.current_token() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(Some(OrderByClause { columns }))
    }

    fn parse_limit(&mut self) -> Result<Option<LimitClause>, ParseError> {
        if self.current_token() != &Token::Limit {
            return Ok(None);
        }

        self.advance();

        let count = if let Token::Integer(n) = self.current_token() {
            if *n < 0 {
                return Err(ParseError::InvalidLimitValue(*n));
            }
            let count = *n as usize;
            self.advance();
            count
        } else {
            return Err(ParseError::UnexpectedToken {
                expected: "integer".to_string(),
                found: self.current_token().clone(),
            });
        };

        let offset = if self.current_token() == &Token::Offset {
            self.advance();
            if let Token::Integer(n) = self.current_token() {
                if *n < 0 {
                    return Err(ParseError::InvalidOffsetValue(*n));
                }
                let offset = *n as usize;
                self.advance();
                Some(offset)
            } else {
                return Err(ParseError::UnexpectedToken {
                    expected: "integer".to_string(),
                    found: self.current_token().clone(),
                });
            }
        } else {
            None
        };

        Ok(Some(LimitClause { count, offset }))
    }

    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_token(&self) -> &Token {
        // The token stream always ends with Eof
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + 1).min(last)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.current_token() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{}", expected),
                found: self.current_token().clone(),
            })
        }
    }
}

/// Parser errors
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("Lexer error: {0}")]
    LexerError(#[from] LexerError),
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },
    #[error("SELECT list cannot be empty")]
    EmptySelectList,
    #[error("{0}(*) is not allowed, only COUNT(*)")]
    StarArgument(AggregateFunction),
    #[error("Invalid LIMIT value: {0} (must be non-negative)")]
    InvalidLimitValue(i64),
    #[error("Invalid OFFSET value: {0} (must be non-negative)")]
    InvalidOffsetValue(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Query {
        Parser::new(sql).unwrap().parse().unwrap()
    }

    #[test]
    fn test_simple_select() {
        let query = parse("SELECT * FROM ltsv");

        assert_eq!(query.select.columns.len(), 1);
        assert!(matches!(query.select.columns[0], SelectColumn::Wildcard));
        assert_eq!(query.from.table, "ltsv");
        assert!(!query.distinct);
    }

    #[test]
    fn test_select_with_columns_and_alias() {
        let query = parse("SELECT host, status AS code FROM ltsv");

        assert_eq!(query.select.columns.len(), 2);
        assert_eq!(
            query.select.columns[1],
            SelectColumn::Column {
                name: "status".to_string(),
                alias: Some("code".to_string()),
            }
        );
    }

    #[test]
    fn test_select_distinct() {
        let query = parse("SELECT DISTINCT host FROM ltsv");
        assert!(query.distinct);
    }

    #[test]
    fn test_select_with_where() {
        let query = parse("SELECT * FROM ltsv WHERE status > 399");
        assert!(query.where_clause.is_some());
    }

    #[test]
    fn test_complex_where() {
        let query = parse("SELECT * FROM ltsv WHERE status >= 500 AND (method = 'GET' OR method = 'HEAD')");

        match query.where_clause.unwrap().condition {
            Expression::LogicalOp { op, right, .. } => {
                assert_eq!(op, LogicalOperator::And);
                assert!(matches!(
                    *right,
                    Expression::LogicalOp {
                        op: LogicalOperator::Or,
                        ..
                    }
                ));
            }
            other => panic!("Expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_is_null_and_is_not_null() {
        let query = parse("SELECT * FROM ltsv WHERE referer IS NULL OR ua IS NOT NULL");
        let condition = query.where_clause.unwrap().condition;
        assert_eq!(
            condition.to_string(),
            "(referer IS NULL OR ua IS NOT NULL)"
        );
    }

    #[test]
    fn test_postfix_not() {
        let query = parse("SELECT * FROM ltsv WHERE path NOT LIKE '/static/%' AND status NOT IN (200, 304)");
        let condition = query.where_clause.unwrap().condition;
        assert_eq!(
            condition.to_string(),
            "(NOT (path LIKE '/static/%') AND NOT (status IN (200, 304)))"
        );
    }

    #[test]
    fn test_between() {
        let query = parse("SELECT * FROM ltsv WHERE size BETWEEN 100 AND 200");
        assert!(matches!(
            query.where_clause.unwrap().condition,
            Expression::Between { .. }
        ));
    }

    #[test]
    fn test_select_with_order_by() {
        let query = parse("SELECT * FROM ltsv ORDER BY host ASC, size DESC");

        let order_by = query.order_by.unwrap();
        assert_eq!(order_by.columns.len(), 2);
        assert_eq!(order_by.columns[0].column, "host");
        assert_eq!(order_by.columns[0].direction, OrderDirection::Asc);
        assert_eq!(order_by.columns[1].direction, OrderDirection::Desc);
    }

    #[test]
    fn test_select_with_limit_offset() {
        let query = parse("SELECT * FROM ltsv LIMIT 10 OFFSET 5;");

        let limit = query.limit.unwrap();
        assert_eq!(limit.count, 10);
        assert_eq!(limit.offset, Some(5));
    }

    #[test]
    fn test_negative_limit() {
        let err = Parser::new("SELECT * FROM ltsv LIMIT -1")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidLimitValue(-1)));
    }

    #[test]
    fn test_aggregate_function() {
        let query = parse("SELECT count(*), SUM(size) AS bytes FROM ltsv");

        assert_eq!(query.select.columns.len(), 2);
        assert_eq!(query.select.columns[0].output_name().unwrap(), "COUNT(*)");
        assert_eq!(query.select.columns[1].output_name().unwrap(), "bytes");
        assert!(query.has_aggregates());
    }

    #[test]
    fn test_function_name_as_column() {
        let query = parse("SELECT count FROM ltsv");
        assert_eq!(
            query.select.columns[0],
            SelectColumn::Column {
                name: "count".to_string(),
                alias: None,
            }
        );
        assert!(!query.has_aggregates());
    }

    #[test]
    fn test_sum_star_is_rejected() {
        let err = Parser::new("SELECT SUM(*) FROM ltsv")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, ParseError::StarArgument(AggregateFunction::Sum)));
    }

    #[test]
    fn test_group_by_having() {
        let query = parse("SELECT host, COUNT(*) FROM ltsv GROUP BY host HAVING COUNT(*) > 1");

        assert_eq!(query.group_by.unwrap().columns, vec!["host".to_string()]);
        assert!(query.having.unwrap().condition.contains_aggregate());
    }

    #[test]
    fn test_trailing_garbage() {
        let err = Parser::new("SELECT * FROM ltsv extra")
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_missing_from() {
        assert!(Parser::new("SELECT a").unwrap().parse().is_err());
    }
}

/// Abstract Syntax Tree (AST) node types for SQL-like queries
///
/// Defines the structure of parsed queries: SELECT, FROM, WHERE, GROUP BY,
/// HAVING, ORDER BY and LIMIT over a single relation.
use std::fmt;

/// A complete SQL-like query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub select: SelectClause,
    pub from: FromClause,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<HavingClause>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
}

impl Query {
    /// Returns `true` if any SELECT item is an aggregate
    pub fn has_aggregates(&self) -> bool {
        self.select
            .columns
            .iter()
            .any(|col| matches!(col, SelectColumn::Aggregate { .. }))
    }
}

/// SELECT clause specifying columns to retrieve
#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub columns: Vec<SelectColumn>,
}

/// A column in the SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// SELECT * - all columns
    Wildcard,
    /// SELECT column_name or SELECT column_name AS alias
    Column { name: String, alias: Option<String> },
    /// SELECT COUNT(*), SUM(column), etc.
    Aggregate {
        function: AggregateFunction,
        argument: AggregateArgument,
        alias: Option<String>,
    },
}

impl SelectColumn {
    /// Name this item gets in the result; `None` for the wildcard
    pub fn output_name(&self) -> Option<String> {
        match self {
            SelectColumn::Wildcard => None,
            SelectColumn::Column { name, alias } => Some(alias.clone().unwrap_or_else(|| name.clone())),
            SelectColumn::Aggregate {
                function,
                argument,
                alias,
            } => Some(
                alias
                    .clone()
                    .unwrap_or_else(|| format!("{}({})", function, argument)),
            ),
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Look up a function by name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunction::Count),
            "SUM" => Some(AggregateFunction::Sum),
            "AVG" => Some(AggregateFunction::Avg),
            "MIN" => Some(AggregateFunction::Min),
            "MAX" => Some(AggregateFunction::Max),
            _ => None,
        }
    }
}

/// Argument of an aggregate function
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArgument {
    /// `*`, only meaningful for COUNT
    Star,
    Column(String),
}

/// FROM clause naming the relation
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: String,
}

/// WHERE clause for filtering
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub condition: Expression,
}

/// GROUP BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByClause {
    pub columns: Vec<String>,
}

/// HAVING clause, filtering groups
#[derive(Debug, Clone, PartialEq)]
pub struct HavingClause {
    pub condition: Expression,
}

/// Boolean expression for WHERE and HAVING conditions
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference
    Column(String),
    /// Literal value
    Literal(Literal),
    /// Aggregate call, only valid in HAVING
    Aggregate {
        function: AggregateFunction,
        argument: AggregateArgument,
    },
    /// Binary operation: column = value, column > value, etc.
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Logical AND/OR
    LogicalOp {
        left: Box<Expression>,
        op: LogicalOperator,
        right: Box<Expression>,
    },
    /// NOT expression
    Not(Box<Expression>),
    /// LIKE pattern matching
    Like {
        expr: Box<Expression>,
        pattern: String,
    },
    /// IN (value1, value2, ...)
    In {
        expr: Box<Expression>,
        values: Vec<Literal>,
    },
    /// BETWEEN min AND max
    Between {
        expr: Box<Expression>,
        min: Box<Expression>,
        max: Box<Expression>,
    },
    /// IS NULL / IS NOT NULL
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
}

impl Expression {
    /// Returns `true` if an aggregate call appears anywhere in the expression
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate { .. } => true,
            Expression::Column(_) | Expression::Literal(_) => false,
            Expression::BinaryOp { left, right, .. } | Expression::LogicalOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::Not(expr)
            | Expression::Like { expr, .. }
            | Expression::In { expr, .. }
            | Expression::IsNull { expr, .. } => expr.contains_aggregate(),
            Expression::Between { expr, min, max } => {
                expr.contains_aggregate() || min.contains_aggregate() || max.contains_aggregate()
            }
        }
    }
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq, // =
    Ne, // != or <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Literal values in queries
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// ORDER BY clause for sorting
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub columns: Vec<OrderByColumn>,
}

/// A column in ORDER BY
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByColumn {
    pub column: String,
    pub direction: OrderDirection,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// LIMIT clause for result limiting
#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    pub count: usize,
    pub offset: Option<usize>,
}

// Display implementations for debugging and error messages

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.distinct {
            write!(f, "SELECT DISTINCT ")?;
            write_list(f, &self.select.columns)?;
        } else {
            write!(f, "{}", self.select)?;
        }
        write!(f, " {}", self.from)?;
        if let Some(ref where_clause) = self.where_clause {
            write!(f, " {}", where_clause)?;
        }
        if let Some(ref group_by) = self.group_by {
            write!(f, " GROUP BY {}", group_by.columns.join(", "))?;
        }
        if let Some(ref having) = self.having {
            write!(f, " HAVING {}", having.condition)?;
        }
        if let Some(ref order_by) = self.order_by {
            write!(f, " {}", order_by)?;
        }
        if let Some(ref limit) = self.limit {
            write!(f, " {}", limit)?;
        }
        Ok(())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for SelectClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        write_list(f, &self.columns)
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectColumn::Wildcard => write!(f, "*"),
            SelectColumn::Column { name, alias } => {
                write!(f, "{}", name)?;
                if let Some(ref alias) = alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
            SelectColumn::Aggregate {
                function,
                argument,
                alias,
            } => {
                write!(f, "{}({})", function, argument)?;
                if let Some(ref alias) = alias {
                    write!(f, " AS {}", alias)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

impl fmt::Display for AggregateArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateArgument::Star => write!(f, "*"),
            AggregateArgument::Column(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.table)
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WHERE {}", self.condition)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(name) => write!(f, "{}", name),
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Aggregate { function, argument } => write!(f, "{}({})", function, argument),
            Expression::BinaryOp { left, op, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::LogicalOp { left, op, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
            Expression::Not(expr) => write!(f, "NOT ({})", expr),
            Expression::Like { expr, pattern } => write!(f, "{} LIKE '{}'", expr, pattern),
            Expression::In { expr, values } => {
                write!(f, "{} IN (", expr)?;
                write_list(f, values)?;
                write!(f, ")")
            }
            Expression::Between { expr, min, max } => {
                write!(f, "{} BETWEEN {} AND {}", expr, min, max)
            }
            Expression::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expr)
                } else {
                    write!(f, "{} IS NULL", expr)
                }
            }
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Eq => write!(f, "="),
            BinaryOperator::Ne => write!(f, "!="),
            BinaryOperator::Lt => write!(f, "<"),
            BinaryOperator::Le => write!(f, "<="),
            BinaryOperator::Gt => write!(f, ">"),
            BinaryOperator::Ge => write!(f, ">="),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(fl) => write!(f, "{}", fl),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for OrderByClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORDER BY ")?;
        write_list(f, &self.columns)
    }
}

impl fmt::Display for OrderByColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

impl fmt::Display for LimitClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIMIT {}", self.count)?;
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

/// Query engine module
///
/// SQL-like query parsing, planning, and execution over one relation.
/// Abstract Syntax Tree types
#[allow(missing_docs)]
pub mod ast;
/// Query executor
#[allow(missing_docs)]
pub mod executor;
/// SQL lexer
#[allow(missing_docs)]
pub mod lexer;
/// SQL parser
#[allow(missing_docs)]
pub mod parser;
/// Query planner
#[allow(missing_docs)]
pub mod planner;

// Re-export main types
pub use ast::*;
pub use executor::{Column, ExecutionContext, Executor, ResultSet, Value};
pub use lexer::{Lexer, LexerError, Token};
pub use parser::{ParseError, Parser};
pub use planner::{PhysicalOperator, PhysicalPlan, PlanError, Planner};

use crate::error::Error;

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Error::Query(err.to_string())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Query(err.to_string())
    }
}

impl From<PlanError> for Error {
    fn from(err: PlanError) -> Self {
        Error::Query(err.to_string())
    }
}

/// Parse and plan `sql` in one step
pub fn prepare(sql: &str) -> crate::error::Result<PhysicalPlan> {
    let query = Parser::new(sql)?.parse()?;
    let plan = Planner::new().plan(&query)?;
    tracing::debug!(plan = %plan, "Planned query");
    Ok(plan)
}

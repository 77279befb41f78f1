/// Query planner
///
/// Converts an AST into a tree of physical operators.
use super::ast::*;
use std::fmt;
use thiserror::Error;

/// Physical query plan
#[derive(Debug, Clone)]
pub struct PhysicalPlan {
    pub root: PhysicalOperator,
}

/// Physical operators for query execution
#[derive(Debug, Clone)]
pub enum PhysicalOperator {
    /// Full table scan
    TableScan { table: String },
    /// Filter rows based on predicate
    Filter {
        input: Box<PhysicalOperator>,
        condition: Expression,
    },
    /// Sort rows
    Sort {
        input: Box<PhysicalOperator>,
        columns: Vec<OrderByColumn>,
    },
    /// Limit number of results
    Limit {
        input: Box<PhysicalOperator>,
        count: usize,
        offset: usize,
    },
    /// Project columns (SELECT specific columns)
    Project {
        input: Box<PhysicalOperator>,
        columns: Vec<SelectColumn>,
    },
    /// Drop duplicate rows, keeping the first occurrence
    Distinct { input: Box<PhysicalOperator> },
    /// Grouping and aggregation; no group columns means one group over all rows
    GroupBy {
        input: Box<PhysicalOperator>,
        group_columns: Vec<String>,
        aggregates: Vec<SelectColumn>,
        having: Option<Expression>,
    },
}

/// Query planner
#[derive(Debug, Default)]
pub struct Planner;

impl Planner {
    /// Create a new planner
    pub fn new() -> Self {
        Self
    }

    /// Plan a query
    pub fn plan(&self, query: &Query) -> Result<PhysicalPlan, PlanError> {
        let mut plan = PhysicalOperator::TableScan {
            table: query.from.table.clone(),
        };

        if let Some(ref where_clause) = query.where_clause {
            if where_clause.condition.contains_aggregate() {
                return Err(PlanError::MisusedAggregate("WHERE".to_string()));
            }
            plan = PhysicalOperator::Filter {
                input: Box::new(plan),
                condition: where_clause.condition.clone(),
            };
        }

        let aggregated = query.group_by.is_some() || query.has_aggregates();

        if query.having.is_some() && !aggregated {
            return Err(PlanError::HavingWithoutAggregation);
        }

        if aggregated {
            plan = self.plan_aggregation(plan, query)?;
        } else {
            // Sort before projecting so ORDER BY can reach columns the
            // SELECT list does not return.
            if let Some(ref order_by) = query.order_by {
                plan = PhysicalOperator::Sort {
                    input: Box::new(plan),
                    columns: resolve_aliases(&order_by.columns, &query.select.columns),
                };
            }

            plan = PhysicalOperator::Project {
                input: Box::new(plan),
                columns: query.select.columns.clone(),
            };

            if query.distinct {
                plan = PhysicalOperator::Distinct {
                    input: Box::new(plan),
                };
            }
        }

        if let Some(ref limit) = query.limit {
            plan = PhysicalOperator::Limit {
                input: Box::new(plan),
                count: limit.count,
                offset: limit.offset.unwrap_or(0),
            };
        }

        Ok(PhysicalPlan { root: plan })
    }

    fn plan_aggregation(
        &self,
        input: PhysicalOperator,
        query: &Query,
    ) -> Result<PhysicalOperator, PlanError> {
        if query
            .select
            .columns
            .iter()
            .any(|col| matches!(col, SelectColumn::Wildcard))
        {
            return Err(PlanError::UnsupportedOperation(
                "* in an aggregate query".to_string(),
            ));
        }

        let mut plan = PhysicalOperator::GroupBy {
            input: Box::new(input),
            group_columns: query
                .group_by
                .as_ref()
                .map(|g| g.columns.clone())
                .unwrap_or_default(),
            aggregates: query.select.columns.clone(),
            having: query.having.as_ref().map(|h| h.condition.clone()),
        };

        if query.distinct {
            plan = PhysicalOperator::Distinct {
                input: Box::new(plan),
            };
        }

        // Groups only carry output columns, so sorting happens on top
        if let Some(ref order_by) = query.order_by {
            plan = PhysicalOperator::Sort {
                input: Box::new(plan),
                columns: order_by.columns.clone(),
            };
        }

        Ok(plan)
    }
}

/// Rewrite ORDER BY entries that name a SELECT alias to the aliased column
fn resolve_aliases(order: &[OrderByColumn], select: &[SelectColumn]) -> Vec<OrderByColumn> {
    order
        .iter()
        .map(|col| {
            let source = select.iter().find_map(|item| match item {
                SelectColumn::Column {
                    name,
                    alias: Some(alias),
                } if *alias == col.column => Some(name.clone()),
                _ => None,
            });
            OrderByColumn {
                column: source.unwrap_or_else(|| col.column.clone()),
                direction: col.direction,
            }
        })
        .collect()
}

/// Planning errors
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Misuse of aggregate function in {0}")]
    MisusedAggregate(String),
    #[error("HAVING requires GROUP BY or an aggregate in the SELECT list")]
    HavingWithoutAggregation,
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
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

impl fmt::Display for PhysicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalOperator::TableScan { table } => write!(f, "TableScan({})", table),
            PhysicalOperator::Filter { input, condition } => {
                write!(f, "Filter({}) -> {}", condition, input)
            }
            PhysicalOperator::Sort { input, columns } => {
                write!(f, "Sort(")?;
                write_list(f, columns)?;
                write!(f, ") -> {}", input)
            }
            PhysicalOperator::Limit {
                input,
                count,
                offset,
            } => {
                write!(f, "Limit({}, {}) -> {}", count, offset, input)
            }
            PhysicalOperator::Project { input, columns } => {
                write!(f, "Project(")?;
                write_list(f, columns)?;
                write!(f, ") -> {}", input)
            }
            PhysicalOperator::Distinct { input } => write!(f, "Distinct -> {}", input),
            PhysicalOperator::GroupBy {
                input,
                group_columns,
                aggregates,
                having,
            } => {
                write!(f, "GroupBy(")?;
                write_list(f, group_columns)?;
                if !aggregates.is_empty() {
                    write!(f, " | ")?;
                    write_list(f, aggregates)?;
                }
                if let Some(h) = having {
                    write!(f, " HAVING {}", h)?;
                }
                write!(f, ") -> {}", input)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::Parser;

    fn plan(sql: &str) -> Result<PhysicalPlan, PlanError> {
        let query = Parser::new(sql).unwrap().parse().unwrap();
        Planner::new().plan(&query)
    }

    #[test]
    fn test_simple_plan() {
        let plan = plan("SELECT * FROM ltsv").unwrap();

        // Should have Project -> TableScan
        match plan.root {
            PhysicalOperator::Project { input, .. } => match *input {
                PhysicalOperator::TableScan { .. } => {}
                _ => panic!("Expected TableScan"),
            },
            _ => panic!("Expected Project"),
        }
    }

    #[test]
    fn test_filter_plan() {
        let plan = plan("SELECT * FROM ltsv WHERE status > 399").unwrap();

        // Should have Project -> Filter -> TableScan
        match plan.root {
            PhysicalOperator::Project { input, .. } => match *input {
                PhysicalOperator::Filter { .. } => {}
                _ => panic!("Expected Filter"),
            },
            _ => panic!("Expected Project"),
        }
    }

    #[test]
    fn test_sort_below_project() {
        let plan = plan("SELECT host AS h FROM ltsv ORDER BY h DESC LIMIT 3").unwrap();

        assert_eq!(
            plan.to_string(),
            "Limit(3, 0) -> Project(host AS h) -> Sort(host DESC) -> TableScan(ltsv)"
        );
    }

    #[test]
    fn test_group_by_plan() {
        let plan =
            plan("SELECT host, COUNT(*) AS n FROM ltsv GROUP BY host ORDER BY n DESC").unwrap();

        assert_eq!(
            plan.to_string(),
            "Sort(n DESC) -> GroupBy(host | host, COUNT(*) AS n) -> TableScan(ltsv)"
        );
    }

    #[test]
    fn test_aggregate_without_group_by() {
        let plan = plan("SELECT COUNT(*) FROM ltsv").unwrap();
        match plan.root {
            PhysicalOperator::GroupBy { group_columns, .. } => assert!(group_columns.is_empty()),
            other => panic!("Expected GroupBy, got {}", other),
        }
    }

    #[test]
    fn test_distinct_plan() {
        let plan = plan("SELECT DISTINCT host FROM ltsv").unwrap();
        assert!(plan.to_string().starts_with("Distinct -> Project(host)"));
    }

    #[test]
    fn test_aggregate_in_where_is_rejected() {
        assert!(matches!(
            plan("SELECT * FROM ltsv WHERE COUNT(*) > 1"),
            Err(PlanError::MisusedAggregate(_))
        ));
    }

    #[test]
    fn test_having_without_aggregation_is_rejected() {
        assert!(matches!(
            plan("SELECT host FROM ltsv HAVING host = 'a'"),
            Err(PlanError::HavingWithoutAggregation)
        ));
    }

    #[test]
    fn test_wildcard_with_group_by_is_rejected() {
        assert!(matches!(
            plan("SELECT * FROM ltsv GROUP BY host"),
            Err(PlanError::UnsupportedOperation(_))
        ));
    }
}

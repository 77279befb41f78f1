/// Query executor
///
/// Executes physical query plans over materialized result sets.
use super::ast::*;
use super::planner::{PhysicalOperator, PhysicalPlan};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Column metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Hidden columns (`rowid`) are addressable by name but not part of `*`
    pub hidden: bool,
}

impl Column {
    /// A regular, visible column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
        }
    }

    /// A column excluded from `*`
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: true,
        }
    }
}

/// Value types flowing through the executor.
///
/// Stored cells are always `Text` or `Null`; numbers only come from
/// literals, `rowid` and aggregates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the value; text must parse completely to a finite
    /// number, so `nan` and `inf` stay text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            Value::Null => None,
        }
    }

    /// Compare two values with SQL semantics: `None` when either side is NULL.
    ///
    /// Text against a number compares numerically if the text parses as a
    /// number and as text otherwise.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Text(text), number) => Some(match (self.as_f64(), number.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => text.as_str().cmp(number.to_string().as_str()),
            }),
            (number, Value::Text(_)) => other.compare(number).map(Ordering::reverse),
            (a, b) => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b)),
        }
    }

    /// Total order used by ORDER BY, MIN/MAX and GROUP BY: NULL, then
    /// numbers, then text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Integer(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_str().cmp(b.as_str()),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => self
                .as_f64()
                .zip(other.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b))
                .unwrap_or(Ordering::Equal),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Text form of the value; `None` for NULL
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Text(_) => Some(self.as_f64().is_some_and(|f| f != 0.0)),
        }
    }

    fn key(&self) -> KeyPart {
        match self {
            Value::Null => KeyPart::Null,
            Value::Integer(i) => KeyPart::Integer(*i),
            Value::Float(f) => KeyPart::Float(f.to_bits()),
            Value::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::Text(s.clone()),
            Literal::Boolean(b) => Value::Integer(i64::from(*b)),
            Literal::Null => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            // Whole floats keep a trailing ".0" so AVG(x) never looks integral
            Value::Float(fl) if fl.is_finite() && fl.fract() == 0.0 && fl.abs() < 1e15 => {
                write!(f, "{:.1}", fl)
            }
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// Hashable image of a value, for grouping and DISTINCT
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Integer(i64),
    Float(u64),
    Text(String),
}

/// Rows sharing one column header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates an empty result set with the given header
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Visible column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Query execution context: the relations a plan may scan
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    tables: HashMap<String, ResultSet>,
}

impl ExecutionContext {
    /// Creates a new execution context
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation; table names are case-insensitive
    pub fn with_table(mut self, name: &str, data: ResultSet) -> Self {
        self.tables.insert(name.to_lowercase(), data);
        self
    }
}

/// Query executor
pub struct Executor {
    context: ExecutionContext,
}

impl Executor {
    /// Create new executor
    pub fn new(context: ExecutionContext) -> Self {
        Self { context }
    }

    /// Execute a physical plan.
    ///
    /// The executor is consumed: scans move their relation out of the
    /// context instead of copying it.
    pub fn execute(mut self, plan: &PhysicalPlan) -> Result<ResultSet> {
        self.execute_operator(&plan.root)
    }

    fn execute_operator(&mut self, op: &PhysicalOperator) -> Result<ResultSet> {
        match op {
            PhysicalOperator::TableScan { table } => self.execute_table_scan(table),
            PhysicalOperator::Filter { input, condition } => self.execute_filter(input, condition),
            PhysicalOperator::Sort { input, columns } => self.execute_sort(input, columns),
            PhysicalOperator::Limit {
                input,
                count,
                offset,
            } => self.execute_limit(input, *count, *offset),
            PhysicalOperator::Project { input, columns } => self.execute_project(input, columns),
            PhysicalOperator::Distinct { input } => self.execute_distinct(input),
            PhysicalOperator::GroupBy {
                input,
                group_columns,
                aggregates,
                having,
            } => self.execute_group_by(input, group_columns, aggregates, having.as_ref()),
        }
    }

    fn execute_table_scan(&mut self, table: &str) -> Result<ResultSet> {
        self.context
            .tables
            .remove(&table.to_lowercase())
            .ok_or_else(|| Error::Query(format!("no such table: {}", table)))
    }

    fn execute_filter(
        &mut self,
        input: &PhysicalOperator,
        condition: &Expression,
    ) -> Result<ResultSet> {
        let mut set = self.execute_operator(input)?;

        let mut kept = Vec::with_capacity(set.rows.len());
        for row in set.rows.drain(..) {
            let scope = Scope::Row {
                columns: &set.columns,
                values: &row,
            };
            if evaluate_condition(condition, &scope)? == Some(true) {
                kept.push(row);
            }
        }
        set.rows = kept;

        Ok(set)
    }

    fn execute_sort(
        &mut self,
        input: &PhysicalOperator,
        columns: &[OrderByColumn],
    ) -> Result<ResultSet> {
        let mut set = self.execute_operator(input)?;

        let keys = columns
            .iter()
            .map(|col| {
                resolve_column(&set.columns, &col.column)
                    .map(|idx| (idx, col.direction))
                    .ok_or_else(|| no_such_column(&col.column))
            })
            .collect::<Result<Vec<_>>>()?;

        set.rows.sort_by(|a, b| {
            for &(idx, direction) in &keys {
                let ordering = a[idx].sort_cmp(&b[idx]);
                let ordering = match direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        Ok(set)
    }

    fn execute_limit(
        &mut self,
        input: &PhysicalOperator,
        count: usize,
        offset: usize,
    ) -> Result<ResultSet> {
        let mut set = self.execute_operator(input)?;
        set.rows = set.rows.into_iter().skip(offset).take(count).collect();
        Ok(set)
    }

    fn execute_project(
        &mut self,
        input: &PhysicalOperator,
        columns: &[SelectColumn],
    ) -> Result<ResultSet> {
        let set = self.execute_operator(input)?;

        let mut output = Vec::new();
        let mut sources = Vec::new();
        for col in columns {
            match col {
                SelectColumn::Wildcard => {
                    for (idx, column) in set.columns.iter().enumerate() {
                        if !column.hidden {
                            output.push(Column::new(column.name.clone()));
                            sources.push(idx);
                        }
                    }
                }
                SelectColumn::Column { name, alias } => {
                    let idx = resolve_column(&set.columns, name)
                        .ok_or_else(|| no_such_column(name))?;
                    output.push(Column::new(alias.clone().unwrap_or_else(|| name.clone())));
                    sources.push(idx);
                }
                SelectColumn::Aggregate { .. } => {
                    return Err(Error::Query(
                        "aggregate outside of an aggregation".to_string(),
                    ));
                }
            }
        }

        let rows = set
            .rows
            .into_iter()
            .map(|row| sources.iter().map(|&idx| row[idx].clone()).collect())
            .collect();

        Ok(ResultSet {
            columns: output,
            rows,
        })
    }

    fn execute_distinct(&mut self, input: &PhysicalOperator) -> Result<ResultSet> {
        let mut set = self.execute_operator(input)?;

        let mut seen = std::collections::HashSet::new();
        set.rows
            .retain(|row| seen.insert(row.iter().map(Value::key).collect::<Vec<_>>()));

        Ok(set)
    }

    fn execute_group_by(
        &mut self,
        input: &PhysicalOperator,
        group_columns: &[String],
        aggregates: &[SelectColumn],
        having: Option<&Expression>,
    ) -> Result<ResultSet> {
        let set = self.execute_operator(input)?;

        let group_indices = group_columns
            .iter()
            .map(|name| resolve_column(&set.columns, name).ok_or_else(|| no_such_column(name)))
            .collect::<Result<Vec<_>>>()?;

        // (group key values, member row indices)
        let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
        if group_indices.is_empty() {
            // One group over everything, even when there are no rows
            groups.push((Vec::new(), (0..set.rows.len()).collect()));
        } else {
            let mut positions: HashMap<Vec<KeyPart>, usize> = HashMap::new();
            for (row_idx, row) in set.rows.iter().enumerate() {
                let values: Vec<Value> = group_indices.iter().map(|&i| row[i].clone()).collect();
                let key: Vec<KeyPart> = values.iter().map(Value::key).collect();
                match positions.get(&key) {
                    Some(&pos) => groups[pos].1.push(row_idx),
                    None => {
                        positions.insert(key, groups.len());
                        groups.push((values, vec![row_idx]));
                    }
                }
            }
            groups.sort_by(|(a, _), (b, _)| {
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.sort_cmp(y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let output_columns: Vec<Column> = aggregates
            .iter()
            .filter_map(SelectColumn::output_name)
            .map(Column::new)
            .collect();

        let mut rows = Vec::with_capacity(groups.len());
        for (_, members) in &groups {
            let members: Vec<&[Value]> = members.iter().map(|&i| set.rows[i].as_slice()).collect();

            let mut output = Vec::with_capacity(output_columns.len());
            for item in aggregates {
                let value = match item {
                    SelectColumn::Column { name, .. } => {
                        let idx = resolve_column(&set.columns, name)
                            .ok_or_else(|| no_such_column(name))?;
                        members.first().map(|r| r[idx].clone()).unwrap_or(Value::Null)
                    }
                    SelectColumn::Aggregate {
                        function, argument, ..
                    } => compute_aggregate(*function, argument, &set.columns, &members)?,
                    SelectColumn::Wildcard => continue,
                };
                output.push(value);
            }

            if let Some(condition) = having {
                let scope = Scope::Group {
                    output_columns: &output_columns,
                    output: &output,
                    columns: &set.columns,
                    rows: &members,
                };
                if evaluate_condition(condition, &scope)? != Some(true) {
                    continue;
                }
            }

            rows.push(output);
        }

        Ok(ResultSet {
            columns: output_columns,
            rows,
        })
    }
}

/// What an expression can see while it is evaluated
enum Scope<'a> {
    /// One input row (WHERE)
    Row {
        columns: &'a [Column],
        values: &'a [Value],
    },
    /// One group (HAVING): its output row and its member rows
    Group {
        output_columns: &'a [Column],
        output: &'a [Value],
        columns: &'a [Column],
        rows: &'a [&'a [Value]],
    },
}

impl Scope<'_> {
    fn column_value(&self, name: &str) -> Result<Value> {
        match self {
            Scope::Row { columns, values } => resolve_column(columns, name)
                .map(|idx| values[idx].clone())
                .ok_or_else(|| no_such_column(name)),
            Scope::Group {
                output_columns,
                output,
                columns,
                rows,
            } => {
                if let Some(idx) = output_columns.iter().position(|c| c.name == name) {
                    return Ok(output[idx].clone());
                }
                let idx = resolve_column(columns, name).ok_or_else(|| no_such_column(name))?;
                Ok(rows.first().map(|r| r[idx].clone()).unwrap_or(Value::Null))
            }
        }
    }

    fn aggregate(&self, function: AggregateFunction, argument: &AggregateArgument) -> Result<Value> {
        match self {
            Scope::Row { .. } => Err(Error::Query(format!(
                "misuse of aggregate function {}()",
                function
            ))),
            Scope::Group { columns, rows, .. } => {
                compute_aggregate(function, argument, columns, rows)
            }
        }
    }
}

/// Find a column by name. Visible columns win over hidden ones, and a
/// `table.column` reference falls back to the part after the first dot.
fn resolve_column(columns: &[Column], name: &str) -> Option<usize> {
    let find = |name: &str| {
        columns
            .iter()
            .position(|c| !c.hidden && c.name == name)
            .or_else(|| columns.iter().position(|c| c.hidden && c.name == name))
    };

    find(name).or_else(|| {
        name.split_once('.')
            .and_then(|(_, column)| find(column))
    })
}

fn no_such_column(name: &str) -> Error {
    Error::Query(format!("no such column: {}", name))
}

fn evaluate_value(expr: &Expression, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expression::Column(name) => scope.column_value(name),
        Expression::Literal(lit) => Ok(Value::from(lit)),
        Expression::Aggregate { function, argument } => scope.aggregate(*function, argument),
        predicate => Ok(match evaluate_condition(predicate, scope)? {
            Some(b) => Value::Integer(i64::from(b)),
            None => Value::Null,
        }),
    }
}

/// Three-valued evaluation: `None` is SQL's unknown
fn evaluate_condition(condition: &Expression, scope: &Scope<'_>) -> Result<Option<bool>> {
    let result = match condition {
        Expression::Column(_) | Expression::Literal(_) | Expression::Aggregate { .. } => {
            evaluate_value(condition, scope)?.truthiness()
        }
        Expression::BinaryOp { left, op, right } => {
            let left = evaluate_value(left, scope)?;
            let right = evaluate_value(right, scope)?;
            left.compare(&right).map(|ordering| match op {
                BinaryOperator::Eq => ordering == Ordering::Equal,
                BinaryOperator::Ne => ordering != Ordering::Equal,
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::Le => ordering != Ordering::Greater,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                BinaryOperator::Ge => ordering != Ordering::Less,
            })
        }
        Expression::LogicalOp { left, op, right } => {
            let left = evaluate_condition(left, scope)?;
            match (op, left) {
                // Short-circuit where the left side decides
                (LogicalOperator::And, Some(false)) => Some(false),
                (LogicalOperator::Or, Some(true)) => Some(true),
                (LogicalOperator::And, left) => match (left, evaluate_condition(right, scope)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
                (LogicalOperator::Or, left) => match (left, evaluate_condition(right, scope)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            }
        }
        Expression::Not(expr) => evaluate_condition(expr, scope)?.map(|b| !b),
        Expression::Like { expr, pattern } => evaluate_value(expr, scope)?
            .into_text()
            .map(|text| like_match(&text, pattern)),
        Expression::In { expr, values } => {
            let value = evaluate_value(expr, scope)?;
            if value.is_null() {
                None
            } else {
                let mut saw_null = false;
                let mut found = false;
                for lit in values {
                    match value.compare(&Value::from(lit)) {
                        Some(Ordering::Equal) => {
                            found = true;
                            break;
                        }
                        Some(_) => {}
                        None => saw_null = true,
                    }
                }
                if found {
                    Some(true)
                } else if saw_null {
                    None
                } else {
                    Some(false)
                }
            }
        }
        Expression::Between { expr, min, max } => {
            let value = evaluate_value(expr, scope)?;
            let low = value
                .compare(&evaluate_value(min, scope)?)
                .map(|o| o != Ordering::Less);
            let high = value
                .compare(&evaluate_value(max, scope)?)
                .map(|o| o != Ordering::Greater);
            match (low, high) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            }
        }
        Expression::IsNull { expr, negated } => {
            let is_null = evaluate_value(expr, scope)?.is_null();
            Some(is_null != *negated)
        }
    };

    Ok(result)
}

/// SQL LIKE: `%` matches any run, `_` any single character, ASCII
/// letters compare case-insensitively.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Last '%' position in the pattern and the text position it resumes from
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len()
            && (pattern[p] == '_' || pattern[p].eq_ignore_ascii_case(&text[t]))
        {
            t += 1;
            p += 1;
        } else if let Some((star, resume)) = backtrack {
            p = star + 1;
            t = resume + 1;
            backtrack = Some((star, resume + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

fn compute_aggregate(
    function: AggregateFunction,
    argument: &AggregateArgument,
    columns: &[Column],
    rows: &[&[Value]],
) -> Result<Value> {
    let idx = match argument {
        AggregateArgument::Star => {
            return Ok(Value::Integer(rows.len() as i64));
        }
        AggregateArgument::Column(name) => {
            resolve_column(columns, name).ok_or_else(|| no_such_column(name))?
        }
    };

    let values = rows.iter().map(|r| &r[idx]).filter(|v| !v.is_null());

    let value = match function {
        AggregateFunction::Count => Value::Integer(values.count() as i64),
        AggregateFunction::Sum => sum(values).unwrap_or(Value::Null),
        AggregateFunction::Avg => {
            let mut count = 0usize;
            let mut total = 0.0;
            for value in values {
                count += 1;
                total += value.as_f64().unwrap_or(0.0);
            }
            if count == 0 {
                Value::Null
            } else {
                Value::Float(total / count as f64)
            }
        }
        AggregateFunction::Min => values
            .min_by(|a, b| a.sort_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateFunction::Max => values
            .max_by(|a, b| a.sort_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
    };

    Ok(value)
}

/// Integer sum while every input is integral and it fits, float otherwise.
/// Text that is not a number counts as zero.
fn sum<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut seen = false;
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;

    for value in values {
        seen = true;
        let integral = match value {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        float_total += value.as_f64().unwrap_or(0.0);
        int_total = match (int_total, integral) {
            (Some(total), Some(i)) => total.checked_add(i),
            (Some(total), None) if value.as_f64().is_none() => Some(total),
            _ => None,
        };
    }

    if !seen {
        return None;
    }
    Some(match int_total {
        Some(total) => Value::Integer(total),
        None => Value::Float(float_total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::Parser;
    use crate::query::planner::Planner;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn access_log() -> ResultSet {
        let mut set = ResultSet::new(vec![
            Column::new("host"),
            Column::new("status"),
            Column::new("size"),
            Column::hidden("rowid"),
        ]);
        set.rows = vec![
            vec![text("a"), text("200"), text("100"), Value::Integer(1)],
            vec![text("b"), text("404"), Value::Null, Value::Integer(2)],
            vec![text("a"), text("500"), text("50"), Value::Integer(3)],
            vec![Value::Null, text("200"), text(""), Value::Integer(4)],
        ];
        set
    }

    fn run(sql: &str) -> Result<ResultSet> {
        let query = Parser::new(sql).unwrap().parse().unwrap();
        let plan = Planner::new().plan(&query).unwrap();
        let context = ExecutionContext::new().with_table("ltsv", access_log());
        Executor::new(context).execute(&plan)
    }

    #[test]
    fn test_table_scan() {
        let result = run("SELECT * FROM ltsv").unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.column_names(), vec!["host", "status", "size"]);
    }

    #[test]
    fn test_unknown_table() {
        let err = run("SELECT * FROM other").unwrap_err();
        assert!(matches!(err, Error::Query(ref msg) if msg.contains("no such table")));
    }

    #[test]
    fn test_unknown_column() {
        let err = run("SELECT nope FROM ltsv").unwrap_err();
        assert!(matches!(err, Error::Query(ref msg) if msg.contains("no such column: nope")));
    }

    #[test]
    fn test_text_column_against_number() {
        let result = run("SELECT host FROM ltsv WHERE status >= 400").unwrap();
        assert_eq!(result.rows, vec![vec![text("b")], vec![text("a")]]);
    }

    #[test]
    fn test_null_comparisons_filter_out() {
        let result = run("SELECT rowid FROM ltsv WHERE host != 'a'").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Integer(2)]]);
    }

    #[test]
    fn test_is_null_distinguishes_empty_text() {
        let nulls = run("SELECT rowid FROM ltsv WHERE size IS NULL").unwrap();
        assert_eq!(nulls.rows, vec![vec![Value::Integer(2)]]);

        let empty = run("SELECT rowid FROM ltsv WHERE size = ''").unwrap();
        assert_eq!(empty.rows, vec![vec![Value::Integer(4)]]);
    }

    #[test]
    fn test_like() {
        assert!(like_match("/index.html", "/%.HTML"));
        assert!(like_match("abc", "a_c"));
        assert!(like_match("", "%"));
        assert!(!like_match("abc", "a_"));
        assert!(like_match("a%b", "a%b"));
        assert!(like_match("mississippi", "%iss%ppi"));
    }

    #[test]
    fn test_in_and_between() {
        let result = run("SELECT rowid FROM ltsv WHERE status IN (404, 500)").unwrap();
        assert_eq!(result.len(), 2);

        let result = run("SELECT rowid FROM ltsv WHERE size BETWEEN 40 AND 60").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Integer(3)]]);
    }

    #[test]
    fn test_order_by_hidden_and_unprojected_columns() {
        let result = run("SELECT host FROM ltsv ORDER BY rowid DESC").unwrap();
        assert_eq!(result.rows[0], vec![Value::Null]);
        assert_eq!(result.rows[3], vec![text("a")]);

        let result = run("SELECT rowid FROM ltsv ORDER BY host, status DESC").unwrap();
        let ids: Vec<Value> = result.rows.into_iter().map(|mut r| r.remove(0)).collect();
        assert_eq!(
            ids,
            vec![
                Value::Integer(4),
                Value::Integer(3),
                Value::Integer(1),
                Value::Integer(2)
            ]
        );
    }

    #[test]
    fn test_count_on_empty_input() {
        let result = run("SELECT COUNT(*), SUM(size) FROM ltsv WHERE host = 'zzz'").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Integer(0), Value::Null]]);
    }

    #[test]
    fn test_group_by_sorted_by_key() {
        let result =
            run("SELECT host, COUNT(*) AS n, SUM(size) AS bytes FROM ltsv GROUP BY host").unwrap();

        assert_eq!(result.column_names(), vec!["host", "n", "bytes"]);
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Null, Value::Integer(1), Value::Integer(0)],
                vec![text("a"), Value::Integer(2), Value::Integer(150)],
                vec![text("b"), Value::Integer(1), Value::Null],
            ]
        );
    }

    #[test]
    fn test_having() {
        let result = run("SELECT host FROM ltsv GROUP BY host HAVING COUNT(*) > 1").unwrap();
        assert_eq!(result.rows, vec![vec![text("a")]]);
    }

    #[test]
    fn test_distinct_and_limit() {
        let result = run("SELECT DISTINCT status FROM ltsv ORDER BY status LIMIT 2").unwrap();
        assert_eq!(result.rows, vec![vec![text("200")], vec![text("404")]]);
    }

    #[test]
    fn test_sum_and_avg() {
        let values = [text("1"), text("2.5"), text("x")];
        assert_eq!(sum(values.iter()), Some(Value::Float(3.5)));

        let values = [text("1"), text("2")];
        assert_eq!(sum(values.iter()), Some(Value::Integer(3)));

        let values = [Value::Integer(i64::MAX), Value::Integer(1)];
        assert!(matches!(sum(values.iter()), Some(Value::Float(_))));

        let result = run("SELECT AVG(status) FROM ltsv").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Float(326.0)]]);
    }

    #[test]
    fn test_non_finite_text_is_not_numeric() {
        assert_eq!(text("nan").as_f64(), None);
        assert_eq!(text("inf").as_f64(), None);
        assert_eq!(text("-Infinity").as_f64(), None);
        assert_eq!(text(" 2.5 ").as_f64(), Some(2.5));

        assert_ne!(text("nan").compare(&Value::Integer(5)), Some(Ordering::Equal));
        assert_ne!(text("inf").compare(&Value::Float(5.0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_non_finite_text_in_where_and_sum() {
        let mut set = ResultSet::new(vec![Column::new("v"), Column::hidden("rowid")]);
        set.rows = vec![
            vec![text("nan"), Value::Integer(1)],
            vec![text("5"), Value::Integer(2)],
            vec![text("inf"), Value::Integer(3)],
            vec![text("1"), Value::Integer(4)],
        ];
        let exec = |sql: &str| {
            let query = Parser::new(sql).unwrap().parse().unwrap();
            let plan = Planner::new().plan(&query).unwrap();
            let context = ExecutionContext::new().with_table("ltsv", set.clone());
            Executor::new(context).execute(&plan).unwrap()
        };

        let equal = exec("SELECT rowid FROM ltsv WHERE v = 5");
        assert_eq!(equal.rows, vec![vec![Value::Integer(2)]]);

        let not_equal = exec("SELECT rowid FROM ltsv WHERE v != 5");
        assert_eq!(
            not_equal.rows,
            vec![vec![Value::Integer(1)], vec![Value::Integer(3)], vec![Value::Integer(4)]]
        );

        let total = exec("SELECT SUM(v) AS s FROM ltsv");
        assert_eq!(total.rows, vec![vec![Value::Integer(6)]]);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Null.into_text(), None);
    }

    #[test]
    fn test_sort_order_ranks() {
        let mut values = vec![text("b"), Value::Integer(10), Value::Null, Value::Float(2.5), text("a")];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![Value::Null, Value::Float(2.5), Value::Integer(10), text("a"), text("b")]
        );
    }
}

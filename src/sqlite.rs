use crate::error::{Result, StoreError};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::collections::BTreeMap;

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Integers widen to `f64`; SQLite hands back whole-number REALs as
    /// integers when the column has no declared affinity.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Boolean(b) => ToSqlOutput::from(*b),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// One result row, keyed by column name (or alias).
pub type Record = BTreeMap<String, Value>;

/// Parameter bindings for SQL queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    pub values: BTreeMap<String, Value>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a named value. The leading `:` is optional.
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        let key = if name.starts_with(':') {
            name.to_string()
        } else {
            format!(":{name}")
        };
        self.values.insert(key, value.into());
        self
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Query operators for building advanced queries
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
}

impl QueryOperator {
    /// Render `expr <op> ?` and push the bound values.
    fn render(&self, expr: &str, binds: &mut Vec<Value>) -> String {
        match self {
            QueryOperator::Equal(Value::Null) => format!("{expr} IS NULL"),
            QueryOperator::NotEqual(Value::Null) => format!("{expr} IS NOT NULL"),
            QueryOperator::Equal(v) => compare(expr, "=", v, binds),
            QueryOperator::NotEqual(v) => compare(expr, "<>", v, binds),
            QueryOperator::GreaterThan(v) => compare(expr, ">", v, binds),
            QueryOperator::GreaterThanOrEqual(v) => compare(expr, ">=", v, binds),
            QueryOperator::LessThan(v) => compare(expr, "<", v, binds),
            QueryOperator::LessThanOrEqual(v) => compare(expr, "<=", v, binds),
            QueryOperator::Like(pattern) => {
                binds.push(Value::Text(pattern.clone()));
                format!("{expr} LIKE ?")
            }
            // IN () is a syntax error in SQLite
            QueryOperator::In(values) if values.is_empty() => "0".to_string(),
            QueryOperator::In(values) => {
                binds.extend(values.iter().cloned());
                let slots = vec!["?"; values.len()].join(", ");
                format!("{expr} IN ({slots})")
            }
        }
    }
}

fn compare(expr: &str, op: &str, value: &Value, binds: &mut Vec<Value>) -> String {
    binds.push(value.clone());
    format!("{expr} {op} ?")
}

/// Query builder for composable, immutable queries. Conditions are ANDed in
/// insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_condition(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    fn where_clause(&self, binds: &mut Vec<Value>) -> Result<String> {
        if self.conditions.is_empty() {
            return Ok(String::new());
        }
        let parts = self
            .conditions
            .iter()
            .map(|(field, op)| Ok(op.render(column_ref(field)?, binds)))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}

/// CRUD operation types
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub table: String,
    pub data: BTreeMap<String, Value>,
}

impl CreateOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            data: BTreeMap::new(),
        }
    }
    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.data.insert(column.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub table: String,
    pub query: Query,
    pub fields: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<Vec<(String, bool)>>, // (field, is_ascending)
}

impl ReadOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            query: Query::new(),
            fields: None,
            limit: None,
            offset: None,
            order_by: None,
        }
    }
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
    pub fn with_order(mut self, field: &str, ascending: bool) -> Self {
        self.order_by
            .get_or_insert_with(Vec::new)
            .push((field.to_string(), ascending));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub table: String,
    pub query: Query,
    pub updates: BTreeMap<String, Value>,
}

impl UpdateOperation {
    pub fn new(table: &str, query: Query) -> Self {
        Self {
            table: table.to_string(),
            query,
            updates: BTreeMap::new(),
        }
    }
    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.updates.insert(column.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub table: String,
    pub query: Query,
}

impl DeleteOperation {
    pub fn new(table: &str, query: Query) -> Self {
        Self {
            table: table.to_string(),
            query,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// `table.column` reference used by joins.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    fn qualified(&self) -> Result<String> {
        Ok(format!(
            "{}.{}",
            identifier(&self.table)?,
            identifier(&self.column)?
        ))
    }
}

/// Two tables joined on `left.on.0 = right.on.1`. Result keys are
/// `"table.column"`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOperation {
    pub left: String,
    pub right: String,
    pub on: (String, String),
    pub kind: JoinKind,
    pub columns: Vec<ColumnRef>,
    pub query: Query,
    pub order_by: Vec<(ColumnRef, bool)>,
}

impl JoinOperation {
    pub fn new(left: &str, right: &str, left_column: &str, right_column: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
            on: (left_column.to_string(), right_column.to_string()),
            kind: JoinKind::Inner,
            columns: Vec::new(),
            query: Query::new(),
            order_by: Vec::new(),
        }
    }
    pub fn outer(mut self) -> Self {
        self.kind = JoinKind::LeftOuter;
        self
    }
    pub fn with_column(mut self, table: &str, column: &str) -> Self {
        self.columns.push(ColumnRef::new(table, column));
        self
    }
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
    pub fn with_order(mut self, table: &str, column: &str, ascending: bool) -> Self {
        self.order_by.push((ColumnRef::new(table, column), ascending));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    fn sql(self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// An aggregate over one column; `column: None` is `COUNT(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub column: Option<String>,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, column: &str) -> Self {
        Self {
            function,
            column: Some(column.to_string()),
        }
    }

    pub fn count_all() -> Self {
        Self {
            function: AggregateFunction::Count,
            column: None,
        }
    }

    fn expression(&self) -> Result<String> {
        let arg = match &self.column {
            Some(c) => identifier(c)?,
            None => "*",
        };
        Ok(format!("{}({arg})", self.function.sql()))
    }

    /// Result key, e.g. `sum(value)`.
    pub fn key(&self) -> String {
        format!(
            "{}({})",
            self.function.sql().to_lowercase(),
            self.column.as_deref().unwrap_or("*")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOperation {
    pub table: String,
    pub group_by: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub query: Query,
    pub having: Option<(Aggregate, QueryOperator)>,
}

impl AggregateOperation {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            group_by: Vec::new(),
            aggregates: Vec::new(),
            query: Query::new(),
            having: None,
        }
    }
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }
    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
    pub fn having(mut self, aggregate: Aggregate, op: QueryOperator) -> Self {
        self.having = Some((aggregate, op));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrudOperation {
    Create(CreateOperation),
    Read(ReadOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
    Join(JoinOperation),
    Aggregate(AggregateOperation),
}

impl CrudOperation {
    /// Compile into a statement with positional `?` placeholders and the
    /// values to bind, in order.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let mut binds = Vec::new();
        let sql = match self {
            CrudOperation::Create(op) => {
                let table = identifier(&op.table)?;
                if op.data.is_empty() {
                    return Err(StoreError::EmptyOperation {
                        operation: "insert",
                        table: op.table.clone(),
                    });
                }
                let columns = op
                    .data
                    .keys()
                    .map(|c| identifier(c))
                    .collect::<Result<Vec<_>>>()?;
                binds.extend(op.data.values().cloned());
                let slots = vec!["?"; columns.len()].join(", ");
                format!(
                    "INSERT INTO {table} ({}) VALUES ({slots})",
                    columns.join(", ")
                )
            }
            CrudOperation::Read(op) => {
                let table = identifier(&op.table)?;
                let fields = match &op.fields {
                    Some(fields) if !fields.is_empty() => fields
                        .iter()
                        .map(|f| identifier(f))
                        .collect::<Result<Vec<_>>>()?
                        .join(", "),
                    _ => "*".to_string(),
                };
                let mut sql = format!("SELECT {fields} FROM {table}");
                sql.push_str(&op.query.where_clause(&mut binds)?);
                if let Some(order) = op.order_by.as_ref().filter(|o| !o.is_empty()) {
                    let terms = order
                        .iter()
                        .map(|(field, asc)| Ok(format!("{} {}", identifier(field)?, direction(*asc))))
                        .collect::<Result<Vec<_>>>()?;
                    sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
                }
                match (op.limit, op.offset) {
                    (Some(limit), Some(offset)) => {
                        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"))
                    }
                    (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
                    (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                    (None, None) => {}
                }
                sql
            }
            CrudOperation::Update(op) => {
                let table = identifier(&op.table)?;
                if op.updates.is_empty() {
                    return Err(StoreError::EmptyOperation {
                        operation: "update",
                        table: op.table.clone(),
                    });
                }
                let mut sets = Vec::with_capacity(op.updates.len());
                for (column, value) in &op.updates {
                    sets.push(format!("{} = ?", identifier(column)?));
                    binds.push(value.clone());
                }
                let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
                sql.push_str(&op.query.where_clause(&mut binds)?);
                sql
            }
            CrudOperation::Delete(op) => {
                let table = identifier(&op.table)?;
                let mut sql = format!("DELETE FROM {table}");
                sql.push_str(&op.query.where_clause(&mut binds)?);
                sql
            }
            CrudOperation::Join(op) => {
                let left = identifier(&op.left)?;
                let right = identifier(&op.right)?;
                if op.columns.is_empty() {
                    return Err(StoreError::EmptyOperation {
                        operation: "join",
                        table: op.left.clone(),
                    });
                }
                let columns = op
                    .columns
                    .iter()
                    .map(|c| {
                        let q = c.qualified()?;
                        Ok(format!("{q} AS \"{q}\""))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let join = match op.kind {
                    JoinKind::Inner => "JOIN",
                    JoinKind::LeftOuter => "LEFT OUTER JOIN",
                };
                let mut sql = format!(
                    "SELECT {} FROM {left} {join} {right} ON {left}.{} = {right}.{}",
                    columns.join(", "),
                    identifier(&op.on.0)?,
                    identifier(&op.on.1)?
                );
                sql.push_str(&op.query.where_clause(&mut binds)?);
                if !op.order_by.is_empty() {
                    let terms = op
                        .order_by
                        .iter()
                        .map(|(c, asc)| Ok(format!("{} {}", c.qualified()?, direction(*asc))))
                        .collect::<Result<Vec<_>>>()?;
                    sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
                }
                sql
            }
            CrudOperation::Aggregate(op) => {
                let table = identifier(&op.table)?;
                let groups = op
                    .group_by
                    .iter()
                    .map(|g| identifier(g))
                    .collect::<Result<Vec<_>>>()?;
                if groups.is_empty() && op.aggregates.is_empty() {
                    return Err(StoreError::EmptyOperation {
                        operation: "aggregate",
                        table: op.table.clone(),
                    });
                }
                let mut select: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
                for aggregate in &op.aggregates {
                    select.push(format!("{} AS \"{}\"", aggregate.expression()?, aggregate.key()));
                }
                let mut sql = format!("SELECT {} FROM {table}", select.join(", "));
                sql.push_str(&op.query.where_clause(&mut binds)?);
                if !groups.is_empty() {
                    sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
                }
                if let Some((aggregate, op)) = &op.having {
                    let expr = aggregate.expression()?;
                    sql.push_str(&format!(" HAVING {}", op.render(&expr, &mut binds)));
                }
                if !groups.is_empty() {
                    sql.push_str(&format!(" ORDER BY {}", groups.join(", ")));
                }
                sql
            }
        };
        Ok((sql, binds))
    }
}

fn direction(ascending: bool) -> &'static str {
    if ascending {
        "ASC"
    } else {
        "DESC"
    }
}

/// Accept a bare SQL identifier and hand it back unchanged.
pub(crate) fn identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// `column` or `table.column`.
fn column_ref(name: &str) -> Result<&str> {
    match name.split_once('.') {
        Some((table, column)) => {
            identifier(table)?;
            identifier(column)?;
            Ok(name)
        }
        None => identifier(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_values_in_column_order() {
        let op = CrudOperation::Create(
            CreateOperation::new("people")
                .with_value("name", "univerze")
                .with_value("age", 420420420),
        );
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(sql, "INSERT INTO people (age, name) VALUES (?, ?)");
        assert_eq!(
            binds,
            vec![Value::Integer(420420420), Value::Text("univerze".into())]
        );
    }

    #[test]
    fn read_with_conditions_order_and_paging() {
        let op = CrudOperation::Read(
            ReadOperation::new("people")
                .with_query(
                    Query::new()
                        .with_condition("age", QueryOperator::GreaterThan(30.into()))
                        .with_condition("name", QueryOperator::Like("s%".into())),
                )
                .with_fields(&["id", "name"])
                .with_order("age", false)
                .with_limit(10)
                .with_offset(5),
        );
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT id, name FROM people WHERE age > ? AND name LIKE ? ORDER BY age DESC LIMIT 10 OFFSET 5"
        );
        assert_eq!(binds, vec![Value::Integer(30), Value::Text("s%".into())]);
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let op = CrudOperation::Read(ReadOperation::new("people").with_offset(3));
        let (sql, _) = op.to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM people LIMIT -1 OFFSET 3");
    }

    #[test]
    fn update_binds_set_values_before_where() {
        let op = CrudOperation::Update(
            UpdateOperation::new(
                "people",
                Query::new().with_condition("name", QueryOperator::Equal("gabz".into())),
            )
            .with_value("age", 69),
        );
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(sql, "UPDATE people SET age = ? WHERE name = ?");
        assert_eq!(binds, vec![Value::Integer(69), Value::Text("gabz".into())]);
    }

    #[test]
    fn delete_with_in_list() {
        let names = ["gandalf", "earthh"].iter().map(|n| Value::from(*n)).collect();
        let op = CrudOperation::Delete(DeleteOperation::new(
            "people",
            Query::new().with_condition("name", QueryOperator::In(names)),
        ));
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(sql, "DELETE FROM people WHERE name IN (?, ?)");
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let op = CrudOperation::Delete(DeleteOperation::new(
            "people",
            Query::new().with_condition("name", QueryOperator::In(vec![])),
        ));
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(sql, "DELETE FROM people WHERE 0");
        assert!(binds.is_empty());
    }

    #[test]
    fn null_comparisons_use_is_null() {
        let query = Query::new()
            .with_condition("age", QueryOperator::Equal(Value::Null))
            .with_condition("owner", QueryOperator::NotEqual(Value::Null));
        let (sql, binds) = CrudOperation::Read(ReadOperation::new("things").with_query(query))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM things WHERE age IS NULL AND owner IS NOT NULL"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn join_aliases_qualified_columns() {
        let op = CrudOperation::Join(
            JoinOperation::new("people", "things", "id", "owner")
                .with_column("people", "name")
                .with_column("things", "description")
                .with_order("things", "id", true),
        );
        let (sql, _) = op.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT people.name AS \"people.name\", things.description AS \"things.description\" \
             FROM people JOIN things ON people.id = things.owner ORDER BY things.id ASC"
        );
    }

    #[test]
    fn outer_join_keyword() {
        let op = CrudOperation::Join(
            JoinOperation::new("people", "things", "id", "owner")
                .outer()
                .with_column("people", "name"),
        );
        let (sql, _) = op.to_sql().unwrap();
        assert!(sql.contains("LEFT OUTER JOIN things"));
    }

    #[test]
    fn aggregate_with_having() {
        let sum = Aggregate::new(AggregateFunction::Sum, "value");
        let op = CrudOperation::Aggregate(
            AggregateOperation::new("things")
                .group_by("owner")
                .with_aggregate(sum.clone())
                .having(sum, QueryOperator::GreaterThan(2000.0.into())),
        );
        let (sql, binds) = op.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT owner, SUM(value) AS \"sum(value)\" FROM things GROUP BY owner \
             HAVING SUM(value) > ? ORDER BY owner"
        );
        assert_eq!(binds, vec![Value::Real(2000.0)]);
    }

    #[test]
    fn count_all_key() {
        assert_eq!(Aggregate::count_all().key(), "count(*)");
    }

    #[test]
    fn rejects_injected_identifiers() {
        let op = CrudOperation::Read(ReadOperation::new("people; DROP TABLE people"));
        assert!(matches!(op.to_sql(), Err(StoreError::InvalidIdentifier(_))));

        let query = Query::new().with_condition("1=1 OR name", QueryOperator::Equal(1.into()));
        let op = CrudOperation::Delete(DeleteOperation::new("people", query));
        assert!(matches!(op.to_sql(), Err(StoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn empty_writes_are_rejected() {
        let insert = CrudOperation::Create(CreateOperation::new("people"));
        assert!(matches!(
            insert.to_sql(),
            Err(StoreError::EmptyOperation { operation: "insert", .. })
        ));
        let update = CrudOperation::Update(UpdateOperation::new("people", Query::new()));
        assert!(matches!(
            update.to_sql(),
            Err(StoreError::EmptyOperation { operation: "update", .. })
        ));
    }

    #[test]
    fn named_params_get_colon_prefix() {
        let params = Params::new().with_value("name", "Gabz").with_value(":age", 31);
        assert!(params.values.contains_key(":name"));
        assert!(params.values.contains_key(":age"));
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(2.5)), Value::Real(2.5));
    }
}

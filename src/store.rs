use crate::error::{Result, StoreError};
use crate::schema::Schema;
use crate::sqlite::{CrudOperation, Record, SqlQuery, Value};
use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, Statement};
use std::sync::{Arc, Mutex, MutexGuard};

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// Schema created when the store opens
    pub schema: Schema,
    /// Log every statement at INFO instead of DEBUG
    pub echo: bool,
}

impl SqliteConfig {
    /// Create a new SQLite config with path and schema
    pub fn new(db_path: impl Into<String>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
            echo: false,
        }
    }

    pub fn in_memory(schema: Schema) -> Self {
        Self::new(IN_MEMORY, schema)
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// Outcome of one statement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub rows_affected: usize,
    /// Row id of the inserted row, set for `Create` only.
    pub last_insert_id: Option<i64>,
}

/// A single SQLite connection shared behind a mutex. Clones share the
/// connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: Arc<SqliteConfig>,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database, enable foreign key enforcement and create the
    /// configured schema.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        tracing::info!(path = %config.db_path, "opening sqlite database");
        let connection = if config.db_path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.db_path)?
        };
        connection.pragma_update(None, "foreign_keys", true)?;

        let store = Self {
            config: Arc::new(config),
            connection: Arc::new(Mutex::new(connection)),
        };
        let schema = store.config.schema.clone();
        store.create_all(&schema)?;
        Ok(store)
    }

    pub fn in_memory(schema: Schema) -> Result<Self> {
        Self::open(SqliteConfig::in_memory(schema))
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Create every table and index of `schema` that does not exist yet.
    pub fn create_all(&self, schema: &Schema) -> Result<()> {
        let conn = self.lock()?;
        self.executor(&conn).create_all(schema)
    }

    pub fn execute_sql(&self, query: &SqlQuery) -> Result<QueryResult> {
        let conn = self.lock()?;
        self.executor(&conn).execute_sql(query)
    }

    /// Perform a CRUD operation (type-safe API)
    pub fn execute_crud(&self, op: &CrudOperation) -> Result<QueryResult> {
        let conn = self.lock()?;
        self.executor(&conn).execute_crud(op)
    }

    /// Run `f` inside one transaction. Commits when `f` returns `Ok`; any
    /// error rolls everything back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Executor<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&Executor {
            conn: &tx,
            echo: self.config.echo,
        })?;
        tx.commit()?;
        Ok(value)
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn executor<'c>(&self, conn: &'c Connection) -> Executor<'c> {
        Executor {
            conn,
            echo: self.config.echo,
        }
    }
}

/// Runs statements against a borrowed connection or open transaction.
pub struct Executor<'c> {
    conn: &'c Connection,
    echo: bool,
}

impl Executor<'_> {
    pub fn create_all(&self, schema: &Schema) -> Result<()> {
        let existing = self.table_names()?;
        schema.validate(&existing)?;
        for statement in schema.create_statements()? {
            self.log(&statement, &[]);
            self.conn.execute(&statement, [])?;
        }
        Ok(())
    }

    /// Raw SQL with named parameters.
    pub fn execute_sql(&self, query: &SqlQuery) -> Result<QueryResult> {
        let values: Vec<Value> = query.params.values.values().cloned().collect();
        self.log(&query.statement, &values);

        let named: Vec<(&str, &dyn ToSql)> = query
            .params
            .values
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();
        let mut stmt = self.conn.prepare(&query.statement)?;
        if stmt.column_count() > 0 {
            let records = collect_records(&mut stmt, named.as_slice())?;
            return Ok(QueryResult {
                records,
                ..QueryResult::default()
            });
        }
        let rows_affected = stmt.execute(named.as_slice())?;
        Ok(QueryResult {
            rows_affected,
            ..QueryResult::default()
        })
    }

    pub fn execute_crud(&self, op: &CrudOperation) -> Result<QueryResult> {
        let (sql, binds) = op.to_sql()?;
        self.log(&sql, &binds);

        let mut stmt = self.conn.prepare(&sql)?;
        match op {
            CrudOperation::Read(_) | CrudOperation::Join(_) | CrudOperation::Aggregate(_) => {
                let records = collect_records(&mut stmt, params_from_iter(binds.iter()))?;
                Ok(QueryResult {
                    records,
                    ..QueryResult::default()
                })
            }
            CrudOperation::Create(_) => {
                let rows_affected = stmt.execute(params_from_iter(binds.iter()))?;
                Ok(QueryResult {
                    records: Vec::new(),
                    rows_affected,
                    last_insert_id: Some(self.conn.last_insert_rowid()),
                })
            }
            CrudOperation::Update(_) | CrudOperation::Delete(_) => {
                let rows_affected = stmt.execute(params_from_iter(binds.iter()))?;
                Ok(QueryResult {
                    rows_affected,
                    ..QueryResult::default()
                })
            }
        }
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn log(&self, sql: &str, binds: &[Value]) {
        if self.echo {
            tracing::info!(target: "rust_sqlite_orm::sql", ?binds, "{sql}");
        } else {
            tracing::debug!(target: "rust_sqlite_orm::sql", ?binds, "{sql}");
        }
    }
}

fn collect_records<P: rusqlite::Params>(stmt: &mut Statement<'_>, params: P) -> Result<Vec<Record>> {
    let names = record_keys(stmt.column_names());
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, name) in names.iter().enumerate() {
            record.insert(name.clone(), Value::from(row.get_ref(i)?));
        }
        records.push(record);
    }
    Ok(records)
}

/// Column names made unique for use as record keys: a repeated name gets a
/// `:n` suffix (`id`, `id:1`, ...), so `SELECT *` over a join keeps both ids.
fn record_keys(columns: Vec<&str>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        let mut key = name.to_string();
        let mut n = 0;
        while keys.contains(&key) {
            n += 1;
            key = format!("{name}:{n}");
        }
        keys.push(key);
    }
    keys
}

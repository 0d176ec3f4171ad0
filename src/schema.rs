//! Declarative table definitions and the DDL they compile to.

use crate::error::{Result, StoreError};
use crate::sqlite::identifier;
use std::collections::HashSet;

/// Schema definition for the SQLite database
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }
    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Check identifiers, duplicates and foreign key targets. A foreign key
    /// may point at a table outside this schema when `existing` lists it.
    pub fn validate(&self, existing: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            identifier(&table.name)?;
            if !seen.insert(table.name.as_str()) {
                return Err(StoreError::schema(format!(
                    "table `{}` declared twice",
                    table.name
                )));
            }
            table.validate()?;
        }
        for table in &self.tables {
            for fk in &table.foreign_keys {
                match self.table(&fk.foreign_table) {
                    Some(target) if target.column(&fk.foreign_column).is_none() => {
                        return Err(StoreError::schema(format!(
                            "`{}.{}` references missing column `{}.{}`",
                            table.name, fk.column, fk.foreign_table, fk.foreign_column
                        )));
                    }
                    Some(_) => {}
                    None if existing.iter().any(|t| t == &fk.foreign_table) => {}
                    None => {
                        return Err(StoreError::schema(format!(
                            "`{}.{}` references unknown table `{}`",
                            table.name, fk.column, fk.foreign_table
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Every statement needed to create the schema, tables first.
    pub fn create_statements(&self) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for table in &self.tables {
            statements.push(table.create_sql()?);
            for index in &table.indexes {
                statements.push(index.create_sql(&table.name)?);
            }
        }
        Ok(statements)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }
    /// Composite primary key; single-column keys are usually declared with
    /// `ColumnConstraint::PrimaryKey` instead.
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(StoreError::schema(format!(
                "table `{}` has no columns",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            identifier(&column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(StoreError::schema(format!(
                    "column `{}.{}` declared twice",
                    self.name, column.name
                )));
            }
            if let Some(DefaultValue::Real(f)) = column.default_value {
                if !f.is_finite() {
                    return Err(StoreError::schema(format!(
                        "column `{}.{}` has a non-finite default {f}",
                        self.name, column.name
                    )));
                }
            }
        }
        let inline_pk = self
            .columns
            .iter()
            .filter(|c| c.constraints.contains(&ColumnConstraint::PrimaryKey))
            .count();
        if inline_pk > 1 || (inline_pk == 1 && !self.primary_key.is_empty()) {
            return Err(StoreError::schema(format!(
                "table `{}` declares more than one primary key",
                self.name
            )));
        }
        let local = self
            .primary_key
            .iter()
            .chain(self.foreign_keys.iter().map(|fk| &fk.column))
            .chain(self.indexes.iter().flat_map(|i| i.columns.iter()));
        for name in local {
            if self.column(name).is_none() {
                return Err(StoreError::schema(format!(
                    "table `{}` has no column `{}`",
                    self.name, name
                )));
            }
        }
        Ok(())
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_sql(&self) -> Result<String> {
        let mut parts = self
            .columns
            .iter()
            .map(ColumnDefinition::sql)
            .collect::<Result<Vec<_>>>()?;
        if !self.primary_key.is_empty() {
            let cols = self
                .primary_key
                .iter()
                .map(|c| identifier(c))
                .collect::<Result<Vec<_>>>()?;
            parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
        }
        for fk in &self.foreign_keys {
            parts.push(fk.sql()?);
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            identifier(&self.name)?,
            parts.join(", ")
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
    pub default_value: Option<DefaultValue>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
            default_value: None,
        }
    }
    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }
    pub fn primary_key(self) -> Self {
        self.with_constraint(ColumnConstraint::PrimaryKey)
    }
    pub fn not_null(self) -> Self {
        self.with_constraint(ColumnConstraint::NotNull)
    }
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default_value = Some(default);
        self
    }

    fn sql(&self) -> Result<String> {
        let mut sql = format!("{} {}", identifier(&self.name)?, self.data_type.sql());
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.sql());
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.sql());
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl DataType {
    fn sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
}

impl ColumnConstraint {
    fn sql(self) -> &'static str {
        match self {
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::NotNull => "NOT NULL",
            ColumnConstraint::Unique => "UNIQUE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

impl DefaultValue {
    fn sql(&self) -> String {
        match self {
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Real(f) => format!("{f:?}"),
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new(column: &str, foreign_table: &str, foreign_column: &str) -> Self {
        Self {
            column: column.to_string(),
            foreign_table: foreign_table.to_string(),
            foreign_column: foreign_column.to_string(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    fn sql(&self) -> Result<String> {
        Ok(format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            identifier(&self.column)?,
            identifier(&self.foreign_table)?,
            identifier(&self.foreign_column)?,
            self.on_delete.sql(),
            self.on_update.sql()
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    fn sql(self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn create_sql(&self, table: &str) -> Result<String> {
        let cols = self
            .columns
            .iter()
            .map(|c| identifier(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            identifier(&self.name)?,
            identifier(table)?,
            cols.join(", ")
        ))
    }
}

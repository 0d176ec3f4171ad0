//! Mapped models and a unit-of-work session over [`SqliteStore`].
//!
//! Objects are staged with [`Session::add`] and written in one transaction by
//! [`Session::commit`]. Reads go straight to the store.

mod models;

pub use models::{Person, Thing};

use crate::error::{Result, StoreError};
use crate::schema::{Schema, TableDefinition};
use crate::sqlite::{
    CreateOperation, CrudOperation, DeleteOperation, Query, QueryOperator, ReadOperation, Record,
    UpdateOperation, Value,
};
use crate::store::{Executor, SqliteStore};

/// A struct mapped onto one table with an integer `id` primary key.
pub trait Model: Sized {
    const TABLE: &'static str;

    fn table() -> TableDefinition;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Column values to write, without `id`.
    fn values(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self>;
}

/// Schema holding every mapped table, parents first.
pub fn schema() -> Schema {
    Schema::new()
        .add_table(Person::table())
        .add_table(Thing::table())
}

/// An object staged in a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum Staged {
    Person(Person),
    Thing(Thing),
}

impl From<Person> for Staged {
    fn from(p: Person) -> Self {
        Staged::Person(p)
    }
}

impl From<Thing> for Staged {
    fn from(t: Thing) -> Self {
        Staged::Thing(t)
    }
}

pub struct Session<'s> {
    store: &'s SqliteStore,
    pending: Vec<Staged>,
}

impl<'s> Session<'s> {
    pub fn new(store: &'s SqliteStore) -> Self {
        Self {
            store,
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, object: impl Into<Staged>) {
        self.pending.push(object.into());
    }

    pub fn add_all<I, T>(&mut self, objects: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Staged>,
    {
        self.pending.extend(objects.into_iter().map(Into::into));
    }

    pub fn pending(&self) -> &[Staged] {
        &self.pending
    }

    /// Drop everything staged since the last commit.
    pub fn rollback(&mut self) {
        tracing::debug!(discarded = self.pending.len(), "session rollback");
        self.pending.clear();
    }

    /// Flush staged objects in one transaction and return them with ids
    /// assigned. On error nothing is written and the staged objects are
    /// left as they were.
    pub fn commit(&mut self) -> Result<Vec<Staged>> {
        let mut flushed = self.pending.clone();
        self.store.transaction(|tx| {
            for staged in flushed.iter_mut() {
                match staged {
                    Staged::Person(person) => flush_person(tx, person)?,
                    Staged::Thing(thing) => save(tx, thing)?,
                }
            }
            Ok(())
        })?;
        tracing::info!(objects = flushed.len(), "session committed");
        self.pending.clear();
        Ok(flushed)
    }

    pub fn get<M: Model>(&self, id: i64) -> Result<Option<M>> {
        let query = Query::new().with_condition("id", QueryOperator::Equal(id.into()));
        Ok(self.query::<M>(query)?.into_iter().next())
    }

    /// Rows of `M` matching `query`, ordered by id.
    pub fn query<M: Model>(&self, query: Query) -> Result<Vec<M>> {
        let op = ReadOperation::new(M::TABLE)
            .with_query(query)
            .with_order("id", true);
        self.store
            .execute_crud(&CrudOperation::Read(op))?
            .records
            .iter()
            .map(M::from_record)
            .collect()
    }

    /// Delete the row with `id`; false when there was none.
    pub fn delete<M: Model>(&self, id: i64) -> Result<bool> {
        let op = DeleteOperation::new(
            M::TABLE,
            Query::new().with_condition("id", QueryOperator::Equal(id.into())),
        );
        Ok(self.store.execute_crud(&CrudOperation::Delete(op))?.rows_affected > 0)
    }

    /// Things owned by a persisted person.
    pub fn things_of(&self, person: &Person) -> Result<Vec<Thing>> {
        match person.id {
            Some(id) => self.query::<Thing>(
                Query::new().with_condition("owner", QueryOperator::Equal(id.into())),
            ),
            None => Ok(Vec::new()),
        }
    }

    pub fn owner_of(&self, thing: &Thing) -> Result<Option<Person>> {
        match thing.owner {
            Some(owner) => self.get::<Person>(owner),
            None => Ok(None),
        }
    }

    /// A person with `things` loaded.
    pub fn load_person(&self, id: i64) -> Result<Option<Person>> {
        let Some(mut person) = self.get::<Person>(id)? else {
            return Ok(None);
        };
        person.things = self.things_of(&person)?;
        Ok(Some(person))
    }
}

/// Save the person, then every thing hanging off it with `owner` pointing
/// back at the person.
fn flush_person(tx: &Executor<'_>, person: &mut Person) -> Result<()> {
    save(tx, person)?;
    let Some(owner) = person.id else {
        return Ok(());
    };
    for thing in person.things.iter_mut() {
        thing.owner = Some(owner);
        save(tx, thing)?;
    }
    Ok(())
}

/// Insert when the model has no id yet, update otherwise.
fn save<M: Model>(tx: &Executor<'_>, model: &mut M) -> Result<()> {
    match model.id() {
        None => {
            let op = CreateOperation {
                table: M::TABLE.to_string(),
                data: model.values(),
            };
            let result = tx.execute_crud(&CrudOperation::Create(op))?;
            if let Some(id) = result.last_insert_id {
                model.set_id(id);
            }
        }
        Some(id) => {
            let op = UpdateOperation {
                table: M::TABLE.to_string(),
                query: Query::new().with_condition("id", QueryOperator::Equal(id.into())),
                updates: model.values(),
            };
            tx.execute_crud(&CrudOperation::Update(op))?;
        }
    }
    Ok(())
}

fn column<'r>(record: &'r Record, table: &str, name: &str) -> Result<&'r Value> {
    record.get(name).ok_or_else(|| StoreError::MissingColumn {
        table: table.to_string(),
        column: name.to_string(),
    })
}

fn mismatch(table: &str, column: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        table: table.to_string(),
        column: column.to_string(),
        expected,
    }
}

pub(crate) fn required_text(record: &Record, table: &str, name: &str) -> Result<String> {
    column(record, table, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(table, name, "text"))
}

pub(crate) fn optional_integer(record: &Record, table: &str, name: &str) -> Result<Option<i64>> {
    let value = column(record, table, name)?;
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_i64()
        .map(Some)
        .ok_or_else(|| mismatch(table, name, "integer"))
}

pub(crate) fn optional_real(record: &Record, table: &str, name: &str) -> Result<Option<f64>> {
    let value = column(record, table, name)?;
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| mismatch(table, name, "real"))
}

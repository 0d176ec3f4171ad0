use super::{optional_integer, optional_real, required_text, Model};
use crate::error::Result;
use crate::schema::{ColumnDefinition, DataType, ForeignKey, TableDefinition};
use crate::sqlite::{Record, Value};
use serde::Serialize;

/// A row of `people`. `things` is the one-to-many side of the relationship:
/// staged things are written with `owner` set to this person's id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub things: Vec<Thing>,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            age: None,
            things: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn add_thing(&mut self, mut thing: Thing) {
        thing.owner = self.id;
        self.things.push(thing);
    }

    pub fn with_thing(mut self, thing: Thing) -> Self {
        self.add_thing(thing);
        self
    }
}

impl Model for Person {
    const TABLE: &'static str = "people";

    fn table() -> TableDefinition {
        TableDefinition::new(Self::TABLE)
            .with_column(ColumnDefinition::new("id", DataType::Integer).primary_key())
            .with_column(ColumnDefinition::new("name", DataType::Text).not_null())
            .with_column(ColumnDefinition::new("age", DataType::Integer))
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Record {
        Record::from([
            ("name".to_string(), Value::from(self.name.as_str())),
            ("age".to_string(), Value::from(self.age)),
        ])
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: optional_integer(record, Self::TABLE, "id")?,
            name: required_text(record, Self::TABLE, "name")?,
            age: optional_integer(record, Self::TABLE, "age")?,
            things: Vec::new(),
        })
    }
}

/// A row of `things`, owned through `owner -> people.id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thing {
    pub id: Option<i64>,
    pub description: String,
    pub value: Option<f64>,
    pub owner: Option<i64>,
}

impl Thing {
    pub fn new(description: &str) -> Self {
        Self {
            id: None,
            description: description.to_string(),
            value: None,
            owner: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Point `owner` at a persisted person. A person without an id leaves
    /// the thing unowned; stage it through [`Person::add_thing`] instead.
    pub fn owned_by(mut self, person: &Person) -> Self {
        self.owner = person.id;
        self
    }
}

impl Model for Thing {
    const TABLE: &'static str = "things";

    fn table() -> TableDefinition {
        TableDefinition::new(Self::TABLE)
            .with_column(ColumnDefinition::new("id", DataType::Integer).primary_key())
            .with_column(ColumnDefinition::new("description", DataType::Text).not_null())
            .with_column(ColumnDefinition::new("value", DataType::Real))
            .with_column(ColumnDefinition::new("owner", DataType::Integer))
            .with_foreign_key(ForeignKey::new("owner", Person::TABLE, "id"))
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Record {
        Record::from([
            ("description".to_string(), Value::from(self.description.as_str())),
            ("value".to_string(), Value::from(self.value)),
            ("owner".to_string(), Value::from(self.owner)),
        ])
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: optional_integer(record, Self::TABLE, "id")?,
            description: required_text(record, Self::TABLE, "description")?,
            value: optional_real(record, Self::TABLE, "value")?,
            owner: optional_integer(record, Self::TABLE, "owner")?,
        })
    }
}

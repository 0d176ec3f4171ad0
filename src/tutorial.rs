//! Walkthroughs of the toolkit: raw SQL, the table/CRUD layer and the ORM.
//!
//! Each one works against whatever store it is handed and returns a report
//! that the CLI prints as JSON.

use crate::error::Result;
use crate::orm::{self, Model, Person, Session, Thing};
use crate::schema::Schema;
use crate::sqlite::{
    Aggregate, AggregateFunction, AggregateOperation, CreateOperation, CrudOperation,
    DeleteOperation, JoinOperation, Params, Query, QueryOperator, ReadOperation, Record, SqlQuery,
    UpdateOperation, Value,
};
use crate::store::SqliteStore;
use serde::Serialize;

pub const RAW_SQL_DATABASE: &str = "mydatabase.db";
pub const CORE_DATABASE: &str = "mySec_database.db";
pub const ORM_DATABASE: &str = "myOtherdatabase.db";

/// Owners whose things are worth more than this show up in the totals.
pub const TOTAL_VALUE_THRESHOLD: f64 = 2000.0;

const SEED_PEOPLE: [(&str, i64); 6] = [
    ("xim", 33),
    ("jeren", 33),
    ("gatx", 41),
    ("siney", 35),
    ("mami", 61),
    ("personaQueMeCaeMal", 42168),
];

/// (index into `SEED_PEOPLE`, description, value)
const SEED_THINGS: [(usize, &str, f64); 7] = [
    (0, "MacBook Pro", 1999.99),
    (0, "Epiphone Sheraton II", 299.99),
    (1, "PC", 699.99),
    (2, "Guitarra", 299.99),
    (3, "Sartenes", 599.99),
    (4, "Batería", 1499.99),
    (5, "Casa", 199999.99),
];

/// The untyped `people (name, age)` table, created with plain SQL.
pub fn create_people_text_table(store: &SqliteStore) -> Result<()> {
    store.execute_sql(&SqlQuery::new(
        "CREATE TABLE IF NOT EXISTS people (name TEXT, age INTEGER)",
    ))?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RawSqlReport {
    pub people: Vec<Record>,
}

/// Create `people` and insert one row using SQL text only.
pub fn raw_sql(store: &SqliteStore) -> Result<RawSqlReport> {
    create_people_text_table(store)?;
    store.transaction(|tx| {
        tx.execute_sql(
            &SqlQuery::new("INSERT INTO people (name, age) VALUES (:name, :age)")
                .with_params(Params::new().with_value("name", "Gabz").with_value("age", 31)),
        )
    })?;
    let people = store
        .execute_sql(&SqlQuery::new("SELECT name, age FROM people"))?
        .records;
    tracing::info!(rows = people.len(), "raw sql walkthrough done");
    Ok(RawSqlReport { people })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ownership {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerTotal {
    pub owner: i64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoreReport {
    pub inserted_ids: Vec<i64>,
    pub older_than_30: Vec<Record>,
    pub updated: usize,
    pub deleted: usize,
    /// A thing pointing at a person that does not exist was refused.
    pub orphan_rejected: bool,
    pub ownership: Vec<Ownership>,
    pub totals: Vec<OwnerTotal>,
}

/// Tables, CRUD, a foreign key, a join and a grouped aggregate.
pub fn core(store: &SqliteStore) -> Result<CoreReport> {
    store.create_all(&Schema::new().add_table(Person::table()))?;

    let mut inserted_ids = Vec::new();
    for (name, age) in [("univerze", 420420420), ("earthh", 6969)] {
        let op = CreateOperation::new(Person::TABLE)
            .with_value("name", name)
            .with_value("age", age);
        let result = store.execute_crud(&CrudOperation::Create(op))?;
        inserted_ids.extend(result.last_insert_id);
    }

    let older_than_30 = store
        .execute_crud(&CrudOperation::Read(
            ReadOperation::new(Person::TABLE)
                .with_query(Query::new().with_condition("age", QueryOperator::GreaterThan(30.into())))
                .with_order("id", true),
        ))?
        .records;

    let updated = store
        .execute_crud(&CrudOperation::Update(
            UpdateOperation::new(
                Person::TABLE,
                Query::new().with_condition("name", QueryOperator::Equal("gabz".into())),
            )
            .with_value("age", 69),
        ))?
        .rows_affected;

    let doomed = ["gandalf", "earthh", "univerze", "nice bro"]
        .into_iter()
        .map(Value::from)
        .collect();
    let deleted = store
        .execute_crud(&CrudOperation::Delete(DeleteOperation::new(
            Person::TABLE,
            Query::new().with_condition("name", QueryOperator::In(doomed)),
        )))?
        .rows_affected;
    tracing::info!(updated, deleted, "people table exercised");

    store.create_all(&Schema::new().add_table(Thing::table()))?;
    let owner_ids = seed(store)?;
    let orphan_rejected = insert_orphan(store, &owner_ids)?;

    let ownership = store
        .execute_crud(&CrudOperation::Join(
            JoinOperation::new(Person::TABLE, Thing::TABLE, "id", "owner")
                .with_column(Person::TABLE, "name")
                .with_column(Thing::TABLE, "description")
                .with_order(Thing::TABLE, "id", true),
        ))?
        .records
        .iter()
        .map(|r| Ownership {
            name: text(r, "people.name"),
            description: text(r, "things.description"),
        })
        .collect();

    let sum = Aggregate::new(AggregateFunction::Sum, "value");
    let sum_key = sum.key();
    let totals = store
        .execute_crud(&CrudOperation::Aggregate(
            AggregateOperation::new(Thing::TABLE)
                .group_by("owner")
                .with_aggregate(sum.clone())
                .having(sum, QueryOperator::GreaterThan(TOTAL_VALUE_THRESHOLD.into())),
        ))?
        .records
        .iter()
        .filter_map(|r| {
            Some(OwnerTotal {
                owner: r.get("owner")?.as_i64()?,
                total: r.get(&sum_key)?.as_f64()?,
            })
        })
        .collect();

    Ok(CoreReport {
        inserted_ids,
        older_than_30,
        updated,
        deleted,
        orphan_rejected,
        ownership,
        totals,
    })
}

/// Insert the sample people and their things in one transaction; returns
/// the people ids in `SEED_PEOPLE` order.
fn seed(store: &SqliteStore) -> Result<Vec<i64>> {
    store.transaction(|tx| {
        let mut ids = Vec::with_capacity(SEED_PEOPLE.len());
        for (name, age) in SEED_PEOPLE {
            let op = CreateOperation::new(Person::TABLE)
                .with_value("name", name)
                .with_value("age", age);
            ids.extend(tx.execute_crud(&CrudOperation::Create(op))?.last_insert_id);
        }
        for (owner, description, value) in SEED_THINGS {
            let op = CreateOperation::new(Thing::TABLE)
                .with_value("owner", ids.get(owner).copied())
                .with_value("description", description)
                .with_value("value", value);
            tx.execute_crud(&CrudOperation::Create(op))?;
        }
        tracing::info!(
            people = ids.len(),
            things = SEED_THINGS.len(),
            "sample data seeded"
        );
        Ok(ids)
    })
}

/// Try to give a thing to a person who does not exist.
fn insert_orphan(store: &SqliteStore, owner_ids: &[i64]) -> Result<bool> {
    let missing = owner_ids.iter().copied().max().unwrap_or(0) + 1_000;
    let op = CreateOperation::new(Thing::TABLE)
        .with_value("owner", missing)
        .with_value("description", "CR-V")
        .with_value("value", 39999.99);
    match store.execute_crud(&CrudOperation::Create(op)) {
        Ok(_) => Ok(false),
        Err(e) if e.is_constraint_violation() => {
            tracing::info!(owner = missing, "thing without an owner rejected");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

fn text(record: &Record, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct OrmReport {
    pub committed: usize,
    pub people: Vec<Person>,
}

/// Mapped classes, a session and the people/things relationship.
pub fn orm(store: &SqliteStore) -> Result<OrmReport> {
    store.create_all(&orm::schema())?;

    let mut session = Session::new(store);
    session.add_all([
        Person::new("Sam")
            .with_age(80)
            .with_thing(Thing::new("MacBook Pro").with_value(1999.99)),
        Person::new("Sonny")
            .with_age(70)
            .with_thing(Thing::new("Guitarra").with_value(299.99)),
    ]);
    let committed = session.commit()?;

    let mut people = Vec::new();
    for staged in &committed {
        if let orm::Staged::Person(Person { id: Some(id), .. }) = staged {
            people.extend(session.load_person(*id)?);
        }
    }
    tracing::info!(people = people.len(), "orm walkthrough done");
    Ok(OrmReport {
        committed: committed.len(),
        people,
    })
}

use rust_sqlite_orm::orm::{self, Model, Person, Thing};
use rust_sqlite_orm::sqlite::{
    Aggregate, AggregateFunction, AggregateOperation, CreateOperation, CrudOperation,
    DeleteOperation, JoinOperation, Params, Query, QueryOperator, ReadOperation, SqlQuery,
    UpdateOperation, Value,
};
use rust_sqlite_orm::{Result, SqliteConfig, SqliteStore, StoreError};
use tempfile::NamedTempFile;

// Helper function to create an in-memory database for testing
fn create_test_db() -> Result<SqliteStore> {
    SqliteStore::in_memory(orm::schema())
}

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(SqliteStore, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let store = SqliteStore::open(SqliteConfig::new(path, orm::schema()))?;
    Ok((store, temp_file))
}

fn insert_person(store: &SqliteStore, name: &str, age: i64) -> Result<i64> {
    let op = CreateOperation::new(Person::TABLE)
        .with_value("name", name)
        .with_value("age", age);
    Ok(store
        .execute_crud(&CrudOperation::Create(op))?
        .last_insert_id
        .unwrap())
}

fn insert_thing(store: &SqliteStore, owner: i64, description: &str, value: f64) -> Result<i64> {
    let op = CreateOperation::new(Thing::TABLE)
        .with_value("owner", owner)
        .with_value("description", description)
        .with_value("value", value);
    Ok(store
        .execute_crud(&CrudOperation::Create(op))?
        .last_insert_id
        .unwrap())
}

fn by_id(id: i64) -> Query {
    Query::new().with_condition("id", QueryOperator::Equal(id.into()))
}

#[tokio::test]
async fn test_basic_operations() {
    test_basic_operations_impl().unwrap();
}

fn test_basic_operations_impl() -> Result<()> {
    let store = create_test_db()?;

    // Insert a new person
    let id = insert_person(&store, "John Doe", 30)?;
    assert_eq!(id, 1);

    // Query the person
    let read = CrudOperation::Read(ReadOperation::new(Person::TABLE).with_query(by_id(id)));
    let person = Person::from_record(&store.execute_crud(&read)?.records[0])?;
    assert_eq!(person.name, "John Doe");
    assert_eq!(person.age, Some(30));

    // Update the person
    let update = UpdateOperation::new(Person::TABLE, by_id(id)).with_value("age", 31);
    assert_eq!(store.execute_crud(&CrudOperation::Update(update))?.rows_affected, 1);
    let records = store.execute_crud(&read)?.records;
    assert_eq!(records[0]["age"], Value::Integer(31));

    // Delete the person
    let delete = DeleteOperation::new(Person::TABLE, by_id(id));
    assert_eq!(store.execute_crud(&CrudOperation::Delete(delete))?.rows_affected, 1);
    assert!(store.execute_crud(&read)?.records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_file_database_persists() {
    test_file_database_persists_impl().unwrap();
}

fn test_file_database_persists_impl() -> Result<()> {
    let (store, temp_file) = create_temp_db()?;
    insert_person(&store, "Gabz", 31)?;
    drop(store);

    let path = temp_file.path().to_str().unwrap().to_string();
    let reopened = SqliteStore::open(SqliteConfig::new(path, orm::schema()))?;
    let records = reopened
        .execute_crud(&CrudOperation::Read(ReadOperation::new(Person::TABLE)))?
        .records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], Value::Text("Gabz".into()));
    assert_eq!(reopened.table_names()?, vec!["people", "things"]);
    Ok(())
}

#[test]
fn not_null_is_enforced() {
    let store = create_test_db().unwrap();
    let op = CreateOperation::new(Person::TABLE).with_value("age", 3);
    let err = store.execute_crud(&CrudOperation::Create(op)).unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn foreign_key_is_enforced() {
    let store = create_test_db().unwrap();
    let err = insert_thing(&store, 42, "CR-V", 39999.99).unwrap_err();
    assert!(err.is_constraint_violation());

    let owner = insert_person(&store, "gatx", 41).unwrap();
    insert_thing(&store, owner, "Guitarra", 299.99).unwrap();
    // the owner is still referenced
    let delete = DeleteOperation::new(Person::TABLE, by_id(owner));
    let err = store.execute_crud(&CrudOperation::Delete(delete)).unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn select_where_in_and_paging() {
    let store = create_test_db().unwrap();
    for (name, age) in [("xim", 33), ("jeren", 33), ("gatx", 41), ("mami", 61)] {
        insert_person(&store, name, age).unwrap();
    }

    let older = ReadOperation::new(Person::TABLE)
        .with_query(Query::new().with_condition("age", QueryOperator::GreaterThan(35.into())))
        .with_fields(&["name"])
        .with_order("age", false);
    let records = store.execute_crud(&CrudOperation::Read(older)).unwrap().records;
    let names: Vec<_> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["mami", "gatx"]);
    assert_eq!(records[0].len(), 1);

    let page = ReadOperation::new(Person::TABLE)
        .with_order("id", true)
        .with_limit(2)
        .with_offset(1);
    let records = store.execute_crud(&CrudOperation::Read(page)).unwrap().records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], Value::Text("jeren".into()));

    let doomed = vec![Value::from("xim"), Value::from("nobody")];
    let delete = DeleteOperation::new(
        Person::TABLE,
        Query::new().with_condition("name", QueryOperator::In(doomed)),
    );
    assert_eq!(
        store.execute_crud(&CrudOperation::Delete(delete)).unwrap().rows_affected,
        1
    );
}

#[test]
fn join_and_outer_join() {
    let store = create_test_db().unwrap();
    let xim = insert_person(&store, "xim", 33).unwrap();
    insert_person(&store, "siney", 35).unwrap();
    insert_thing(&store, xim, "MacBook Pro", 1999.99).unwrap();
    insert_thing(&store, xim, "Epiphone Sheraton II", 299.99).unwrap();

    let join = JoinOperation::new(Person::TABLE, Thing::TABLE, "id", "owner")
        .with_column(Person::TABLE, "name")
        .with_column(Thing::TABLE, "description")
        .with_order(Thing::TABLE, "id", true);
    let records = store
        .execute_crud(&CrudOperation::Join(join.clone()))
        .unwrap()
        .records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["people.name"], Value::Text("xim".into()));
    assert_eq!(records[1]["things.description"], Value::Text("Epiphone Sheraton II".into()));

    let outer = join.outer().with_order(Person::TABLE, "id", true);
    let records = store.execute_crud(&CrudOperation::Join(outer)).unwrap().records;
    assert_eq!(records.len(), 3);
    let siney = records
        .iter()
        .find(|r| r["people.name"] == Value::Text("siney".into()))
        .unwrap();
    assert!(siney["things.description"].is_null());
}

#[test]
fn sum_per_owner_having() {
    let store = create_test_db().unwrap();
    let xim = insert_person(&store, "xim", 33).unwrap();
    let jeren = insert_person(&store, "jeren", 33).unwrap();
    insert_thing(&store, xim, "MacBook Pro", 1999.99).unwrap();
    insert_thing(&store, xim, "Epiphone Sheraton II", 299.99).unwrap();
    insert_thing(&store, jeren, "PC", 699.99).unwrap();

    let sum = Aggregate::new(AggregateFunction::Sum, "value");
    let op = AggregateOperation::new(Thing::TABLE)
        .group_by("owner")
        .with_aggregate(sum.clone())
        .with_aggregate(Aggregate::count_all())
        .having(sum, QueryOperator::GreaterThan(2000.0.into()));
    let records = store.execute_crud(&CrudOperation::Aggregate(op)).unwrap().records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["owner"], Value::Integer(xim));
    assert_eq!(records[0]["count(*)"], Value::Integer(2));
    let total = records[0]["sum(value)"].as_f64().unwrap();
    assert!((total - 2299.98).abs() < 1e-6);
}

#[test]
fn raw_sql_with_named_params() {
    let store = SqliteStore::in_memory(Default::default()).unwrap();
    let created = store
        .execute_sql(&SqlQuery::new(
            "CREATE TABLE IF NOT EXISTS people (name TEXT, age INTEGER)",
        ))
        .unwrap();
    assert!(created.records.is_empty());

    let insert = SqlQuery::new("INSERT INTO people (name, age) VALUES (:name, :age)")
        .with_params(Params::new().with_value("name", "Gabz").with_value("age", 31));
    assert_eq!(store.execute_sql(&insert).unwrap().rows_affected, 1);

    let select = SqlQuery::new("SELECT name, age FROM people WHERE age > :min")
        .with_params(Params::new().with_value("min", 30));
    let records = store.execute_sql(&select).unwrap().records;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], Value::Text("Gabz".into()));
    assert_eq!(records[0]["age"], Value::Integer(31));
}

#[test]
fn transaction_rolls_back_on_error() {
    let store = create_test_db().unwrap();
    let result: Result<()> = store.transaction(|tx| {
        let op = CreateOperation::new(Person::TABLE).with_value("name", "ghost");
        tx.execute_crud(&CrudOperation::Create(op))?;
        Err(StoreError::LockPoisoned)
    });
    assert!(result.is_err());
    let records = store
        .execute_crud(&CrudOperation::Read(ReadOperation::new(Person::TABLE)))
        .unwrap()
        .records;
    assert!(records.is_empty());
}

#[test]
fn create_all_is_idempotent() {
    let store = create_test_db().unwrap();
    store.create_all(&orm::schema()).unwrap();
    store.create_all(&orm::schema()).unwrap();
    assert_eq!(store.table_names().unwrap(), vec!["people", "things"]);
}

#[test]
fn invalid_identifier_never_reaches_sqlite() {
    let store = create_test_db().unwrap();
    let op = ReadOperation::new("people WHERE 1=1; --");
    let err = store.execute_crud(&CrudOperation::Read(op)).unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
}

#[test]
fn select_star_over_join_keeps_every_column() {
    let store = create_test_db().unwrap();
    let owner = insert_person(&store, "xim", 33).unwrap();
    let thing = insert_thing(&store, owner, "MacBook Pro", 1999.99).unwrap();

    let records = store
        .execute_sql(&SqlQuery::new(
            "SELECT * FROM people JOIN things ON people.id = things.owner",
        ))
        .unwrap()
        .records;
    assert_eq!(records.len(), 1);
    let keys: Vec<_> = records[0].keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["age", "description", "id", "id:1", "name", "owner", "value"]
    );
    assert_eq!(records[0]["id"], Value::Integer(owner));
    assert_eq!(records[0]["id:1"], Value::Integer(thing));
}

#[test]
fn update_and_delete_without_conditions_touch_every_row() {
    let store = create_test_db().unwrap();
    for (name, age) in [("xim", 33), ("jeren", 33), ("gatx", 41)] {
        insert_person(&store, name, age).unwrap();
    }

    let update = UpdateOperation::new(Person::TABLE, Query::new()).with_value("age", 69);
    assert_eq!(
        store.execute_crud(&CrudOperation::Update(update)).unwrap().rows_affected,
        3
    );
    let records = store
        .execute_crud(&CrudOperation::Read(ReadOperation::new(Person::TABLE)))
        .unwrap()
        .records;
    assert!(records.iter().all(|r| r["age"] == Value::Integer(69)));

    let delete = DeleteOperation::new(Person::TABLE, Query::new());
    assert_eq!(
        store.execute_crud(&CrudOperation::Delete(delete)).unwrap().rows_affected,
        3
    );
    let records = store
        .execute_crud(&CrudOperation::Read(ReadOperation::new(Person::TABLE)))
        .unwrap()
        .records;
    assert!(records.is_empty());
}

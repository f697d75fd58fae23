//! End-to-end exercises of `Datastore` against an in-memory `DataTable`:
//! single-flight referencing, the find-one cache-hit/fetch split, and a
//! save/fetch round trip.

use std::sync::Arc;

use indexmap::IndexMap;

use dialog_store::{
    CodecContext, CodecRegistry, DataCodec, DataItem, Datastore, DecodeInput, Document, DialogStoreError,
    EncodeOutput, MemoryDataTable, Outcome, Query,
};

#[derive(Clone, Debug, PartialEq)]
struct Person {
    id: i64,
    name: String,
}

struct PersonCodec;

impl PersonCodec {
    fn new() -> Self {
        Self
    }
}

impl DataCodec<i64, Person> for PersonCodec {
    fn primary_key_field_name(&self) -> &'static str {
        "id"
    }

    fn construct(&self, _ctx: &mut CodecContext, _input: &DecodeInput) -> Result<Person, DialogStoreError> {
        Ok(Person { id: 0, name: String::new() })
    }

    fn decode(
        &self,
        _ctx: &mut CodecContext,
        value: &mut Person,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError> {
        value.id = input.field_i64("id").unwrap_or(0);
        value.name = input.field_str("name").unwrap_or_default().to_string();
        Ok(())
    }

    fn encode(
        &self,
        _ctx: &mut CodecContext,
        value: &Person,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError> {
        output.write("name", Document::String(value.name.clone()));
        Ok(())
    }

    fn create_default(&self, key: &i64) -> Person {
        Person { id: *key, name: String::new() }
    }

    fn query_predicate(&self, query: &Query<i64>) -> Box<dyn Fn(&Person) -> bool + Send + Sync> {
        let expected_name = query
            .constraints()
            .iter()
            .find(|constraint| constraint.field == "name")
            .and_then(|constraint| match &constraint.expected {
                Document::String(name) => Some(name.clone()),
                _ => None,
            });
        Box::new(move |person| match &expected_name {
            Some(name) => &person.name == name,
            None => true,
        })
    }
}

type TestDatastore = Datastore<i64, Person, MemoryDataTable<i64>, PersonCodec>;

fn seeded_document(id: i64, name: &str) -> Document {
    let mut fields = IndexMap::new();
    fields.insert("id".to_string(), Document::Int(id));
    fields.insert("name".to_string(), Document::String(name.to_string()));
    Document::Map(fields)
}

fn make_datastore() -> TestDatastore {
    Datastore::new(MemoryDataTable::new(), PersonCodec::new(), CodecRegistry::new())
}

#[test]
fn it_references_the_same_item_for_repeated_lookups_of_the_same_key() {
    let datastore = make_datastore();

    let first = datastore.get_or_reference(&1);
    let second = datastore.get_or_reference(&1);

    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn it_resolves_find_one_from_the_cache_without_a_remote_round_trip() {
    let datastore = make_datastore();
    let item = datastore.get_or_create(&1).unwrap();
    item.decode(&seeded_document(1, "alice")).unwrap();

    let status = datastore.find_one(Query::by_key(1));
    let outcome = status.wait().await;

    assert!(outcome.is_cached());
    let found = outcome.into_value().unwrap();
    assert_eq!(found.get().unwrap().name, "alice");
}

#[tokio::test]
async fn it_fetches_from_the_remote_table_on_a_cache_miss() {
    let datastore = make_datastore();
    let table_handle: MemoryDataTable<i64> = MemoryDataTable::new();
    table_handle.seed(2, seeded_document(2, "bob")).await;
    let datastore = Datastore::new(table_handle, PersonCodec::new(), CodecRegistry::new());

    let status = datastore.find_one(Query::by_key(2));
    let outcome = status.wait().await;

    match outcome {
        Outcome::Fetched(item) => assert_eq!(item.get().unwrap().name, "bob"),
        other => panic!("expected Fetched, got {other:?}"),
    }
}

#[tokio::test]
async fn it_reports_absent_when_the_remote_table_has_no_match() {
    let datastore = make_datastore();

    let status = datastore.find_one(Query::by_key(99));
    let outcome = status.wait().await;

    assert!(matches!(outcome, Outcome::Absent));
}

#[tokio::test]
async fn it_round_trips_a_save_and_fetch() {
    let table: MemoryDataTable<i64> = MemoryDataTable::new();
    let writer = Datastore::new(table.clone(), PersonCodec::new(), CodecRegistry::new());
    let item = writer.get_or_create(&3).unwrap();
    item.decode(&seeded_document(3, "carol")).unwrap();
    item.save_async().await.unwrap();

    // A second, independent datastore over the same table sees what the
    // first one saved.
    let reader = Datastore::new(table, PersonCodec::new(), CodecRegistry::new());
    let reloaded: Arc<DataItem<i64, Person, MemoryDataTable<i64>, PersonCodec>> =
        reader.get_or_reference(&3);
    reloaded.fetch_async().await.unwrap();

    assert_eq!(reloaded.get().unwrap().name, "carol");
}

#[tokio::test]
async fn it_accepts_a_bare_key_wherever_a_query_is_expected() {
    let datastore = make_datastore();
    let item = datastore.get_or_create(&1).unwrap();
    item.decode(&seeded_document(1, "alice")).unwrap();

    let outcome = datastore.find_one(1).wait().await;

    assert!(outcome.is_cached());
}

#[test]
fn it_reads_a_value_through_get_optional_without_creating_on_a_miss() {
    let datastore = make_datastore();

    assert_eq!(datastore.get_optional(&1), None);
    assert!(datastore.get_or_null(&1).is_none());

    let item = datastore.get_or_create(&1).unwrap();
    item.decode(&seeded_document(1, "alice")).unwrap();

    assert_eq!(datastore.get_optional(&1).unwrap().name, "alice");
    assert!(datastore.get_or_null(&1).is_some());
}

#[tokio::test]
async fn it_finds_all_matching_a_field_constraint_remotely() {
    let table: MemoryDataTable<i64> = MemoryDataTable::new();
    table.seed(1, seeded_document(1, "alice")).await;
    table.seed(2, seeded_document(2, "bob")).await;
    table.seed(3, seeded_document(3, "alice")).await;
    let datastore = Datastore::new(table, PersonCodec::new(), CodecRegistry::new());

    let query: Query<i64> = Query::new().with_field("name", "alice");
    let status = datastore.find_all(query);
    let outcome = status.wait().await;

    let items = outcome.into_value().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.get().unwrap().name == "alice"));
}

//! Query Tests
//!
//! Tests for the query builder, descriptor evaluation and page merging.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tablekv::entity::Entity;
use tablekv::query::{ContinuationToken, KeyBound, KeyRange, Page, QueryDescriptor, QuerySource, TableQuery};
use tablekv::{Config, ETag, MemoryStorage, Session};

// =============================================================================
// Helpers
// =============================================================================

/// A source that produces an endless ascending sequence, one page at a time
struct EndlessSource {
    page_size: usize,
    pages_served: AtomicUsize,
}

impl EndlessSource {
    fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages_served: AtomicUsize::new(0),
        }
    }
}

impl QuerySource for EndlessSource {
    fn fetch_page(
        &self,
        _table: &str,
        _descriptor: &QueryDescriptor,
        continuation: Option<&ContinuationToken>,
    ) -> tablekv::Result<Page> {
        self.pages_served.fetch_add(1, Ordering::SeqCst);
        let start: usize = continuation.map_or(0, |t| t.next_row_key.parse().unwrap());
        let entities = (start..start + self.page_size)
            .map(|i| Entity::new("p", format!("{:010}", i)).etag_from(Some(ETag::new(format!("e{}", i)))))
            .collect();
        Ok(Page {
            entities,
            continuation: Some(ContinuationToken {
                next_partition_key: "p".to_string(),
                next_row_key: format!("{:010}", start + self.page_size),
            }),
        })
    }
}

fn setup_session(page_size: usize) -> Session<MemoryStorage> {
    let config = Config::builder().page_size(page_size).build();
    Session::new(MemoryStorage::shared(&config))
}

fn keys(entities: &[Entity]) -> Vec<(String, String)> {
    entities
        .iter()
        .map(|e| (e.partition_key().to_string(), e.row_key().to_string()))
        .collect()
}

fn seed(session: &mut Session<MemoryStorage>, partitions: &[&str], rows: &[&str]) {
    for pk in partitions {
        for rk in rows {
            session.upsert("t", Entity::new(*pk, *rk).property("v", 1i64)).unwrap();
        }
    }
    session.commit(tablekv::Execute::Individually).unwrap();
}

// =============================================================================
// Descriptor Tests
// =============================================================================

#[test]
fn test_builder_records_bounds() {
    let session = setup_session(10);
    let query = session
        .query("t", false)
        .partition_key_from("a")
        .inclusive()
        .partition_key_to("m")
        .exclusive()
        .row_key_equals("r1")
        .top(5);

    let d = query.descriptor();
    assert_eq!(d.partition_key_range.lower, Some(KeyBound::inclusive("a")));
    assert_eq!(d.partition_key_range.upper, Some(KeyBound::exclusive("m")));
    assert_eq!(d.row_key_range, KeyRange::exact("r1"));
    assert_eq!(d.top_count, Some(5));
}

#[test]
fn test_builder_does_not_mutate_receiver() {
    let session = setup_session(10);
    let base = session.query("t", false).partition_key_equals("p");
    let _narrow = base.row_key_equals("r");
    assert!(base.descriptor().row_key_range.is_unbounded());
}

#[test]
fn test_range_contains_respects_inclusivity() {
    let range = KeyRange {
        lower: Some(KeyBound::inclusive("b")),
        upper: Some(KeyBound::exclusive("d")),
    };
    assert!(!range.contains("a"));
    assert!(range.contains("b"));
    assert!(range.contains("c"));
    assert!(!range.contains("d"));
}

#[test]
fn test_empty_ranges() {
    let inverted = KeyRange {
        lower: Some(KeyBound::inclusive("z")),
        upper: Some(KeyBound::inclusive("a")),
    };
    assert!(inverted.is_empty());

    let point_exclusive = KeyRange {
        lower: Some(KeyBound::exclusive("m")),
        upper: Some(KeyBound::inclusive("m")),
    };
    assert!(point_exclusive.is_empty());
    assert!(!KeyRange::exact("m").is_empty());
}

#[test]
fn test_evaluate_filters_and_caps() {
    let entities: Vec<Entity> = ["a", "b", "c", "d"]
        .iter()
        .flat_map(|pk| ["1", "2"].iter().map(move |rk| Entity::new(*pk, *rk)))
        .collect();

    let descriptor = QueryDescriptor {
        partition_key_range: KeyRange {
            lower: Some(KeyBound::exclusive("a")),
            upper: Some(KeyBound::inclusive("c")),
        },
        row_key_range: KeyRange::exact("2"),
        top_count: Some(1),
    };

    let found: Vec<Entity> = descriptor.evaluate(entities).collect();
    assert_eq!(keys(&found), vec![("b".to_string(), "2".to_string())]);
}

// =============================================================================
// Execution Tests
// =============================================================================

#[test]
fn test_partition_range_half_open() {
    let mut session = setup_session(1000);
    seed(&mut session, &["a", "f", "l", "m", "z"], &["r"]);

    let found = session
        .query("t", false)
        .partition_key_from("a")
        .inclusive()
        .partition_key_to("m")
        .exclusive()
        .execute()
        .unwrap();

    let pks: Vec<&str> = found.iter().map(|e| e.partition_key()).collect();
    assert_eq!(pks, vec!["a", "f", "l"]);
}

#[test]
fn test_row_filter_without_partition_filter() {
    let mut session = setup_session(1000);
    seed(&mut session, &["p1", "p2"], &["a", "b", "c"]);

    let found = session.query("t", false).row_key_equals("b").execute().unwrap();
    assert_eq!(
        keys(&found),
        vec![("p1".to_string(), "b".to_string()), ("p2".to_string(), "b".to_string())]
    );
}

#[test]
fn test_results_are_key_ordered() {
    let mut session = setup_session(1000);
    seed(&mut session, &["b", "a"], &["2", "1"]);

    let found = session.query("t", false).execute().unwrap();
    assert_eq!(
        keys(&found),
        vec![
            ("a".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]
    );
}

#[test]
fn test_query_empty_store() {
    let session = setup_session(1000);
    assert!(session.query("missing", false).execute().unwrap().is_empty());

    let first = session.query("missing", false).first_page().unwrap();
    assert!(first.entities().is_empty());
    assert!(!first.has_more_results());
}

#[test]
fn test_pages_merge_across_page_boundaries() {
    let mut session = setup_session(2);
    seed(&mut session, &["p1", "p2"], &["a", "b", "c"]);

    let query = session.query("t", false);
    let mut iter = query.iter();
    let all: Vec<Entity> = iter.by_ref().collect::<tablekv::Result<_>>().unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(iter.pages_fetched(), 3);
}

#[test]
fn test_first_page_then_next_page() {
    let mut session = setup_session(2);
    seed(&mut session, &["p"], &["a", "b", "c"]);

    let first = session.query("t", false).first_page().unwrap();
    assert_eq!(first.entities().len(), 2);
    assert!(first.has_more_results());

    let second = first.next_page().unwrap().unwrap();
    assert_eq!(keys(second.entities()), vec![("p".to_string(), "c".to_string())]);
    assert!(!second.has_more_results());
    assert!(second.next_page().unwrap().is_none());
}

#[test]
fn test_flatten_collects_remaining_pages() {
    let mut session = setup_session(2);
    seed(&mut session, &["p"], &["a", "b", "c", "d", "e"]);

    let merged = session.query("t", false).first_page().unwrap().flatten().unwrap();
    assert_eq!(merged.len(), 5);
}

#[test]
fn test_top_over_endless_source_stops_fetching() {
    let source = Arc::new(EndlessSource::new(4));
    let query = TableQuery::new(source.clone(), "t", false).top(10);

    let results = query.execute().unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results[9].row_key(), "0000000009");
    assert_eq!(source.pages_served.load(Ordering::SeqCst), 3);
}

#[test]
fn test_top_zero_fetches_nothing() {
    let source = Arc::new(EndlessSource::new(4));
    let query = TableQuery::new(source.clone(), "t", false).top(0);

    assert!(query.execute().unwrap().is_empty());
    assert_eq!(source.pages_served.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lazy_iteration_fetches_on_demand() {
    let source = Arc::new(EndlessSource::new(4));
    let query = TableQuery::new(source.clone(), "t", false);

    let first_five: Vec<Entity> = query.iter().take(5).collect::<tablekv::Result<_>>().unwrap();
    assert_eq!(first_five.len(), 5);
    assert_eq!(source.pages_served.load(Ordering::SeqCst), 2);
}

#[test]
fn test_etags_stripped_unless_requested() {
    let mut session = setup_session(1000);
    seed(&mut session, &["p"], &["r"]);

    let without = session.query("t", false).execute().unwrap();
    assert!(without[0].etag().is_none());

    let with = session.query("t", true).execute().unwrap();
    assert!(with[0].etag().is_some());
}

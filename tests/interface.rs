use std::sync::Arc;

use subclad::SubgroupError;
use subclad::interface::{CancelToken, SearchInterface};
use subclad::record::{Field, Kind, Record, RecordSet, Schema, Value};
use subclad::search::{MeasuredPair, Search, SearchConfig, StopReason};

fn setup() -> Arc<RecordSet> {
    let schema = Schema::new(vec![
        Field::new("Type", Kind::Text),
        Field::new("Region", Kind::Text),
        Field::new("Rooms", Kind::Integer),
        Field::new("Area", Kind::Float),
        Field::new("Price", Kind::Float),
    ]);
    let records = (0..200i64)
        .map(|i| {
            let kind = ["h", "u", "t"][(i % 3) as usize];
            let region = ["north", "south"][((i / 3) % 2) as usize];
            let area = 30.0 + ((i * 53) % 97) as f64;
            let price = if kind == "u" { 5000.0 - 11.0 * area } else { 800.0 + 13.0 * area } + ((i * 31) % 41) as f64;
            Record::new(vec![
                Value::from(kind),
                Value::from(region),
                Value::from(1 + (i * 5) % 7),
                Value::from(area),
                Value::from(price),
            ])
        })
        .collect();
    Arc::new(RecordSet::new(schema, records).unwrap())
}

fn config() -> SearchConfig {
    SearchConfig {
        categorical_attributes: vec!["Type".into(), "Region".into()],
        numeric_attributes: vec!["Rooms".into()],
        measured_pair: MeasuredPair::new("Area", "Price"),
        max_depth: 3,
        min_support: 0.05,
        top_k: 15,
        worker_count: 2,
        ..SearchConfig::default()
    }
}

#[test]
fn background_search_matches_synchronous_run() {
    let iface = SearchInterface::new(setup());
    let handle = iface.start_search(config()).unwrap();
    while !handle.is_finished() {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert!(handle.elapsed() > std::time::Duration::ZERO);
    let background = handle.join().unwrap();
    let direct = iface.run_sync(config()).unwrap();
    let a: Vec<&str> = background.results.iter().map(|s| s.description.as_str()).collect();
    let b: Vec<&str> = direct.results.iter().map(|s| s.description.as_str()).collect();
    assert_eq!(a, b);
    assert_eq!(background.stop, StopReason::MaxDepth);
    assert_eq!(iface.active(), 0);
}

#[test]
fn invalid_configuration_is_rejected_before_spawning() {
    let iface = SearchInterface::new(setup());
    let mut bad = config();
    bad.top_k = 0;
    assert!(matches!(iface.start_search(bad), Err(SubgroupError::Config(_))));
    assert_eq!(iface.active(), 0);
    // name resolution happens on the search thread
    let mut unknown = config();
    unknown.numeric_attributes = vec!["Floors".into()];
    let handle = iface.start_search(unknown).unwrap();
    assert!(matches!(handle.join(), Err(SubgroupError::UnknownAttribute(_))));
}

#[test]
fn cancelled_before_the_first_level_returns_nothing() {
    let records = setup();
    let search = Search::new(&records, config()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = search.run_until(&cancel).unwrap();
    assert_eq!(outcome.stop, StopReason::Cancelled);
    assert!(outcome.levels.is_empty());
    assert!(outcome.results.is_empty());
    assert!(outcome.population.correlation.is_some());
}

#[test]
fn spent_time_budget_stops_before_dispatching() {
    let records = setup();
    let mut c = config();
    c.time_budget_ms = Some(0);
    let outcome = Search::new(&records, c).unwrap().run().unwrap();
    assert_eq!(outcome.stop, StopReason::Deadline);
    assert!(outcome.results.is_empty());
}

#[test]
fn cancellation_by_id_keeps_completed_levels() {
    let iface = SearchInterface::new(setup());
    let mut c = config();
    c.max_depth = 50;
    let handle = iface.start_search(c).unwrap();
    let id = handle.id;
    // the search may already be done, in which case the id is gone
    let cancelled = iface.cancel(id);
    let outcome = handle.join().unwrap();
    if cancelled && outcome.stop == StopReason::Cancelled {
        assert!(outcome.levels.len() < 50);
    } else {
        assert_eq!(outcome.stop, StopReason::Exhausted);
    }
    // every reported level ran to completion
    for (depth, level) in outcome.levels.iter().enumerate() {
        assert_eq!(level.depth, depth + 1);
    }
    assert!(!iface.cancel(id));
}

#[test]
fn handle_cancel_is_cooperative() {
    let iface = SearchInterface::new(setup());
    let handle = iface.start_search(config()).unwrap();
    handle.cancel();
    let outcome = handle.join().unwrap();
    assert!(matches!(outcome.stop, StopReason::Cancelled | StopReason::MaxDepth));
    assert!(outcome.results.len() <= 15);
}

use std::collections::HashSet;

use subclad::quality::{Baseline, Support};
use subclad::record::{Field, Kind, Record, RecordSet, Schema, Value};
use subclad::search::{MeasuredPair, SearchConfig, SearchOutcome, search};

struct Lcg(u64);
impl Lcg {
    fn step(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
    fn below(&mut self, n: u64) -> u64 {
        self.step() % n
    }
}

const TOTAL: usize = 300;

fn setup() -> RecordSet {
    let schema = Schema::new(vec![
        Field::new("Type", Kind::Text),
        Field::new("Region", Kind::Text),
        Field::new("Rooms", Kind::Integer),
        Field::new("Area", Kind::Float),
        Field::new("Price", Kind::Integer),
    ]);
    let types = ["h", "u", "t"];
    let regions = ["north", "south", "east", "west"];
    let mut rng = Lcg(42);
    let records = (0..TOTAL)
        .map(|_| {
            let kind = types[rng.below(3) as usize];
            let region = regions[rng.below(4) as usize];
            let rooms = 1 + rng.below(6) as i64;
            let area = 40.0 + rng.below(200) as f64;
            let noise = rng.below(5000) as i64;
            // units get cheaper with size, houses dearer
            let price = match kind {
                "u" => 9000 - 20 * area as i64 + noise,
                _ => 1000 + 30 * area as i64 + 100 * rooms + noise,
            };
            Record::new(vec![
                Value::from(kind),
                Value::from(region),
                Value::from(rooms),
                Value::from(area),
                Value::from(price),
            ])
        })
        .collect();
    RecordSet::new(schema, records).unwrap()
}

fn config() -> SearchConfig {
    SearchConfig {
        categorical_attributes: vec!["Type".into(), "Region".into()],
        numeric_attributes: vec!["Rooms".into()],
        measured_pair: MeasuredPair::new("Area", "Price"),
        max_depth: 3,
        min_support: 0.05,
        top_k: 20,
        worker_count: 4,
        ..SearchConfig::default()
    }
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let cov: f64 = pairs.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    let vx: f64 = pairs.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let vy: f64 = pairs.iter().map(|p| (p.1 - my).powi(2)).sum();
    cov / (vx * vy).sqrt()
}

fn summary(outcome: &SearchOutcome) -> Vec<(String, usize, u64)> {
    outcome
        .results
        .iter()
        .map(|s| (s.description.clone(), s.count, s.score.to_bits()))
        .collect()
}

#[test]
fn every_result_clears_min_support() {
    let records = setup();
    let outcome = search(&records, config()).unwrap();
    assert!(!outcome.results.is_empty());
    let support = Support::new(TOTAL, 0.05);
    for s in &outcome.results {
        assert!(support.admits(s.count), "{} has {} records", s.description, s.count);
        assert!(s.support > 0.05);
        // the reported count is the true number of matching records
        let matching = records
            .iter()
            .filter(|r| s.conditions.iter().all(|c| c.matches(r)))
            .count();
        assert_eq!(matching, s.count, "{}", s.description);
    }
}

#[test]
fn results_are_bounded_sorted_and_unique() {
    let records = setup();
    let outcome = search(&records, config()).unwrap();
    assert!(outcome.results.len() <= 20);
    assert!(outcome.results.windows(2).all(|w| w[0].score >= w[1].score));
    let mut seen = HashSet::new();
    for s in &outcome.results {
        assert!(s.depth() >= 1 && s.depth() <= 3);
        assert!(seen.insert(s.description.clone()), "{} reported twice", s.description);
        assert!((s.score - (s.correlation - s.baseline).abs()).abs() < 1e-12);
        assert!(s.correlation >= -1.0 - 1e-9 && s.correlation <= 1.0 + 1e-9);
    }
}

#[test]
fn population_baseline_matches_direct_computation() {
    let records = setup();
    let outcome = search(&records, config()).unwrap();
    let pairs: Vec<(f64, f64)> = records
        .iter()
        .map(|r| match (&r.values()[3], &r.values()[4]) {
            (Value::Float(x), Value::Integer(y)) => (*x, *y as f64),
            other => panic!("unexpected values {other:?}"),
        })
        .collect();
    let expected = pearson(&pairs);
    let population = outcome.population.correlation.unwrap();
    assert!((population - expected).abs() < 1e-9, "{population} vs {expected}");
    assert_eq!(outcome.population.count, TOTAL);
    assert_eq!(outcome.baseline, Baseline::Population);
    assert!(outcome.results.iter().all(|s| s.baseline == population));
}

#[test]
fn subgroup_correlation_matches_direct_computation() {
    let records = setup();
    let outcome = search(&records, config()).unwrap();
    let best = &outcome.results[0];
    let pairs: Vec<(f64, f64)> = records
        .iter()
        .filter(|r| best.conditions.iter().all(|c| c.matches(r)))
        .map(|r| match (&r.values()[3], &r.values()[4]) {
            (Value::Float(x), Value::Integer(y)) => (*x, *y as f64),
            other => panic!("unexpected values {other:?}"),
        })
        .collect();
    assert!((best.correlation - pearson(&pairs)).abs() < 1e-9);
}

#[test]
fn repeated_runs_agree_regardless_of_workers() {
    let records = setup();
    let first = search(&records, config()).unwrap();
    let second = search(&records, config()).unwrap();
    let mut single = config();
    single.worker_count = 1;
    let single = search(&records, single).unwrap();
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(summary(&first), summary(&single));
    assert_eq!(first.levels, single.levels);
}

#[test]
fn smaller_top_k_is_a_prefix_of_larger() {
    let records = setup();
    let mut small = config();
    small.top_k = 5;
    let mut large = config();
    large.top_k = 50;
    let small = search(&records, small).unwrap();
    let large = search(&records, large).unwrap();
    assert_eq!(small.results.len(), 5);
    assert_eq!(summary(&small)[..], summary(&large)[..5]);
}

#[test]
fn duplicate_paths_are_collapsed() {
    let records = setup();
    let outcome = search(&records, config()).unwrap();
    assert_eq!(outcome.levels[0].depth, 1);
    assert_eq!(outcome.levels[0].duplicates, 0);
    // (Type = h)(Rooms <= v) is reached from both of its conditions
    assert!(outcome.levels[1].duplicates > 0);
    let retained = outcome.levels[0].retained;
    assert_eq!(outcome.levels[1].frontier, retained);
    assert_eq!(outcome.stop, subclad::search::StopReason::MaxDepth);
}
